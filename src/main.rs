use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use samarth_qa::ingestion::read_csv;
use samarth_qa::query::{
    DEFAULT_COMPARE_YEARS, DEFAULT_POLICY_YEARS, DEFAULT_TOP_M, DEFAULT_TREND_YEARS,
};
use samarth_qa::schema::keywords::{normalize_crop, normalize_state};
use samarth_qa::store::{extract_provenance_rows, FilterValue};
use samarth_qa::{
    generate_policy_argument, map_schema, normalize_evidence, normalize_production,
    normalize_rainfall_with, parse_evidence, provenance_score, EngineConfig, QueryEngine,
    TableSource,
};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "samarth")]
#[command(about = "Offline Q&A over agricultural production and rainfall data")]
#[command(version)]
struct Args {
    /// Directory holding the local CSV files (or set SAMARTH_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Production file name inside the data directory
    #[arg(long, global = true)]
    production_file: Option<String>,

    /// Rainfall file name inside the data directory
    #[arg(long, global = true)]
    rainfall_file: Option<String>,

    /// Station-to-state mapping file name inside the data directory
    #[arg(long, global = true)]
    station_map_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Average rainfall and top crops for two states
    Compare {
        #[arg(long)]
        state_x: String,
        #[arg(long)]
        state_y: String,
        #[arg(long, default_value_t = DEFAULT_COMPARE_YEARS)]
        years: usize,
        #[arg(long, default_value_t = DEFAULT_TOP_M)]
        top_m: usize,
    },

    /// Highest-producing district in one state, lowest in another
    Extreme {
        #[arg(long)]
        state_x: String,
        #[arg(long)]
        state_y: String,
        #[arg(long)]
        crop: String,
    },

    /// Production trend and rainfall correlation for a crop
    Trend {
        #[arg(long)]
        region: String,
        #[arg(long)]
        crop: String,
        #[arg(long, default_value_t = DEFAULT_TREND_YEARS)]
        years: usize,
    },

    /// Scored arguments for promoting crop A over crop B
    Policy {
        #[arg(long)]
        region: String,
        #[arg(long)]
        crop_a: String,
        #[arg(long)]
        crop_b: String,
        #[arg(long, default_value_t = DEFAULT_POLICY_YEARS)]
        years: usize,
    },

    /// Dataset-cited arguments for crop A over crop B
    DatasetArgs {
        #[arg(long)]
        region: Option<String>,
        #[arg(long)]
        crop_a: String,
        #[arg(long)]
        crop_b: String,
        #[arg(long, default_value_t = DEFAULT_POLICY_YEARS)]
        years: usize,
    },

    /// Route a free-text question to one of the fixed queries
    Ask {
        question: String,
        #[arg(long, default_value = "Tamil Nadu")]
        state_x: String,
        #[arg(long, default_value = "Karnataka")]
        state_y: String,
        #[arg(long, default_value = "Rice")]
        crop: String,
        #[arg(long, default_value = "Wheat")]
        crop_b: String,
        #[arg(long)]
        years: Option<usize>,
    },

    /// Rank evidence and generate pro/con arguments
    Evidence {
        /// JSON array of evidence records
        #[arg(long, default_value = "data/sample_evidence.json")]
        file: PathBuf,
        #[arg(long, default_value = "Should we expand subsidized irrigation programs in region X?")]
        question: String,
        #[arg(long, default_value_t = 3)]
        top_k: usize,
    },

    /// Alias-map an arbitrary CSV onto the canonical fields
    MapSchema {
        csv: PathBuf,
        /// Write the mapped table (with row ids) here
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Normalize a raw production or rainfall CSV
    Normalize {
        #[arg(value_enum)]
        domain: Domain,
        csv: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Production rows backing an answer, with permalinks
    Rows {
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        crop: Option<String>,
        /// Repeat to match any of several years
        #[arg(long)]
        year: Vec<i32>,
        #[arg(long, default_value_t = 10)]
        max_rows: usize,
    },

    /// Run a JSON array of queries in parallel over one snapshot
    Batch {
        file: PathBuf,
        /// Worker threads (0 = one per core)
        #[arg(long, default_value_t = 0)]
        workers: usize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Domain {
    Production,
    Rainfall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intent {
    Compare,
    Extreme,
    Trend,
    Policy,
}

/// Keyword dispatcher for free-text questions; not a parser.
fn route_intent(text: &str) -> Option<Intent> {
    let t = text.to_lowercase();
    if t.contains("compare") && t.contains("rain") {
        Some(Intent::Compare)
    } else if t.contains("district") && t.contains("highest") {
        Some(Intent::Extreme)
    } else if t.contains("trend") || t.contains("correl") {
        Some(Intent::Trend)
    } else if t.contains("promote") || t.contains("promoting") {
        Some(Intent::Policy)
    } else {
        None
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn build_config(args: &Args) -> EngineConfig {
    let mut config = EngineConfig::from_env();
    if let Some(dir) = &args.data_dir {
        config = config.with_data_dir(dir);
    }
    if let Some(file) = &args.production_file {
        config.production_file = file.clone();
    }
    if let Some(file) = &args.rainfall_file {
        config.rainfall_file = file.clone();
    }
    if let Some(file) = &args.station_map_file {
        config.station_map_file = file.clone();
    }
    config
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = build_config(&args);
    info!("Using data directory {}", config.data_dir.display());
    let engine = QueryEngine::from_config(config);

    match args.command {
        Commands::Compare { state_x, state_y, years, top_m } => print_json(
            &engine.compare_avg_rainfall_and_top_crops(
                &state_x,
                &state_y,
                years,
                top_m,
                TableSource::Default,
                TableSource::Default,
            ),
        ),
        Commands::Extreme { state_x, state_y, crop } => print_json(
            &engine.find_district_extreme(&state_x, &state_y, &crop, TableSource::Default),
        ),
        Commands::Trend { region, crop, years } => print_json(&engine.trend_and_correlation(
            &region,
            &crop,
            years,
            TableSource::Default,
            TableSource::Default,
        )),
        Commands::Policy { region, crop_a, crop_b, years } => {
            print_json(&engine.policy_arguments_for_crop_promotion(
                &region,
                &crop_a,
                &crop_b,
                years,
                TableSource::Default,
                TableSource::Default,
            ))
        }
        Commands::DatasetArgs { region, crop_a, crop_b, years } => {
            print_json(&engine.dataset_policy_arguments(
                region.as_deref(),
                &crop_a,
                &crop_b,
                years,
                TableSource::Default,
                TableSource::Default,
            ))
        }
        Commands::Ask { question, state_x, state_y, crop, crop_b, years } => {
            run_ask(&engine, &question, &state_x, &state_y, &crop, &crop_b, years)
        }
        Commands::Evidence { file, question, top_k } => run_evidence(&file, &question, top_k),
        Commands::MapSchema { csv, out } => run_map_schema(&csv, out.as_deref()),
        Commands::Normalize { domain, csv, out } => {
            run_normalize(&engine, domain, &csv, out.as_deref())
        }
        Commands::Rows { state, crop, year, max_rows } => {
            run_rows(&engine, state, crop, &year, max_rows)
        }
        Commands::Batch { file, workers } => run_batch(&engine, &file, workers),
    }
}

fn run_ask(
    engine: &QueryEngine,
    question: &str,
    state_x: &str,
    state_y: &str,
    crop: &str,
    crop_b: &str,
    years: Option<usize>,
) -> Result<()> {
    let Some(intent) = route_intent(question) else {
        return print_json(&json!({ "error": "Could not detect a supported question type" }));
    };
    info!("Detected intent: {:?}", intent);

    match intent {
        Intent::Compare => print_json(&engine.compare_avg_rainfall_and_top_crops(
            state_x,
            state_y,
            years.unwrap_or(DEFAULT_COMPARE_YEARS),
            DEFAULT_TOP_M,
            TableSource::Default,
            TableSource::Default,
        )),
        Intent::Extreme => print_json(&engine.find_district_extreme(
            state_x,
            state_y,
            crop,
            TableSource::Default,
        )),
        Intent::Trend => print_json(&engine.trend_and_correlation(
            state_x,
            crop,
            years.unwrap_or(DEFAULT_TREND_YEARS),
            TableSource::Default,
            TableSource::Default,
        )),
        Intent::Policy => print_json(&engine.policy_arguments_for_crop_promotion(
            state_x,
            crop,
            crop_b,
            years.unwrap_or(DEFAULT_POLICY_YEARS),
            TableSource::Default,
            TableSource::Default,
        )),
    }
}

fn run_evidence(file: &Path, question: &str, top_k: usize) -> Result<()> {
    let raw = match std::fs::read_to_string(file) {
        Ok(text) => parse_evidence(&text)
            .with_context(|| format!("Failed to parse evidence file {}", file.display()))?,
        Err(e) => {
            warn!("Evidence file {} unavailable ({}); using built-in sample", file.display(), e);
            vec![json!({
                "id": "local-1",
                "title": "Local irrigation study",
                "text": "Irrigation coverage increased yields by 12% in pilot regions.",
                "source": "local://sample"
            })]
        }
    };

    let evidence = normalize_evidence(&raw);
    let arguments = generate_policy_argument(question, &evidence, top_k);
    let score = provenance_score(&arguments);
    print_json(&json!({
        "arguments": arguments,
        "aggregate_provenance": score,
    }))
}

fn run_map_schema(csv: &Path, out: Option<&Path>) -> Result<()> {
    let (raw, report) = read_csv(csv).with_context(|| format!("Failed to read {}", csv.display()))?;
    info!("Read {} rows ({} skipped)", report.rows_loaded, report.rows_skipped);

    let (table, mapping) = map_schema(&raw);
    if let Some(out) = out {
        table
            .write_csv(out)
            .with_context(|| format!("Failed to write {}", out.display()))?;
        info!("Wrote mapped table to {}", out.display());
    }
    let sample: Vec<_> = table
        .records
        .iter()
        .zip(table.row_ids())
        .take(5)
        .map(|(record, row_id)| json!({ "row_id": row_id, "values": record }))
        .collect();
    print_json(&json!({
        "mapping": mapping,
        "rows": table.len(),
        "sample": sample,
    }))
}

fn run_normalize(
    engine: &QueryEngine,
    domain: Domain,
    csv: &Path,
    out: Option<&Path>,
) -> Result<()> {
    let (raw, report) = read_csv(csv).with_context(|| format!("Failed to read {}", csv.display()))?;
    info!("Read {} rows ({} skipped)", report.rows_loaded, report.rows_skipped);

    let summary = match domain {
        Domain::Production => {
            let table = normalize_production(&raw);
            if let Some(out) = out {
                table.write_csv(out)?;
            }
            json!({ "rows": table.len(), "mapping": &table.mapping, "columns": table.columns() })
        }
        Domain::Rainfall => {
            let table = normalize_rainfall_with(&raw, &engine.store().station_map());
            if let Some(out) = out {
                table.write_csv(out)?;
            }
            json!({ "rows": table.len(), "mapping": &table.mapping, "columns": table.columns() })
        }
    };
    print_json(&summary)
}

fn run_rows(
    engine: &QueryEngine,
    state: Option<String>,
    crop: Option<String>,
    years: &[i32],
    max_rows: usize,
) -> Result<()> {
    let production = engine.store().load_production();

    let mut filters = BTreeMap::new();
    if let Some(state) = state {
        filters.insert(
            "state".to_string(),
            FilterValue::One(normalize_state(Some(state.as_str()))),
        );
    }
    if let Some(crop) = crop {
        filters.insert("crop".to_string(), FilterValue::One(normalize_crop(Some(crop.as_str()))));
    }
    if !years.is_empty() {
        filters.insert(
            "year".to_string(),
            FilterValue::AnyOf(years.iter().map(|y| y.to_string()).collect()),
        );
    }

    let rows = extract_provenance_rows(
        &production,
        &filters,
        max_rows,
        Some(production.source.as_str()),
    );
    print_json(&json!({ "source": &production.source, "rows": rows }))
}

fn run_batch(engine: &QueryEngine, file: &Path, workers: usize) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read batch file {}", file.display()))?;
    let requests = samarth_qa::query::parse_requests(&text)?;

    let production = engine.store().load_production();
    let rainfall = engine.store().load_rainfall();
    let responses = engine.run_batch(&requests, &production, &rainfall, workers);

    let failed = responses.iter().filter(|r| r.is_error()).count();
    if failed > 0 {
        warn!("{} of {} queries returned an error outcome", failed, responses.len());
    }
    print_json(&responses)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_intent() {
        assert_eq!(
            route_intent("Compare rainfall in Maharashtra and Karnataka and list top crops"),
            Some(Intent::Compare)
        );
        assert_eq!(
            route_intent("Which district has the HIGHEST rice output?"),
            Some(Intent::Extreme)
        );
        assert_eq!(route_intent("Correlation of wheat with monsoon"), Some(Intent::Trend));
        assert_eq!(route_intent("Arguments for promoting millets"), Some(Intent::Policy));
        assert_eq!(route_intent("hello"), None);
    }
}
