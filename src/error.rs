use thiserror::Error;

#[derive(Error, Debug)]
pub enum QaError {
    #[error("Load error: {0}")]
    Load(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Evidence error: {0}")]
    Evidence(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Polars error: {0}")]
    Polars(String),
}

impl From<polars::prelude::PolarsError> for QaError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        QaError::Polars(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, QaError>;
