use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Unknown cohort: {0}")]
    UnknownCohort(String),
    #[error("Calendar feed unavailable: {0}")]
    FeedUnavailable(String),
    #[error("Calendar feed unparseable: {0}")]
    FeedUnparseable(String),
}
