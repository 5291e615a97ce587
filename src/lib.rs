pub mod config;
pub mod error;
pub mod evidence;
pub mod frames;
pub mod ingestion;
pub mod provenance;
pub mod query;
pub mod schema;
pub mod stats;
pub mod store;

pub use config::EngineConfig;
pub use error::{QaError, Result};
pub use evidence::{
    generate_policy_argument, normalize_evidence, normalize_evidence_at, parse_evidence, Argument,
    EvidenceItem, Stance,
};
pub use provenance::{distinct_source_count, provenance_score, ProvenanceScore};
pub use query::{Provenance, QueryEngine, QueryOutcome, QueryRequest, QueryResponse};
pub use schema::{
    map_schema, normalize_production, normalize_rainfall, normalize_rainfall_with,
    CanonicalRecord, CanonicalTable, MappedRecord, ProductionRecord, RainfallRecord,
};
pub use store::{DataStore, TableSource};
