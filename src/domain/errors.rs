use thiserror::Error;

/// Errors reported to readers of the indicator series
#[derive(Debug, Clone, Error, PartialEq)]
pub enum QueryError {
    #[error("Invalid EMA type: {0}. Must be 'short' or 'long'")]
    InvalidEmaType(String),

    #[error("Invalid window parameter: {0}")]
    InvalidWindow(String),
}

/// Errors building the indicator engine
#[derive(Debug, Clone, Error, PartialEq)]
pub enum IndicatorError {
    #[error("Invalid {stage} period: {minutes} minutes (must be at least 1)")]
    InvalidPeriod { stage: &'static str, minutes: i64 },
}

/// Errors related to decoding exchange feed frames
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Malformed feed message: {reason}")]
    Malformed { reason: String },

    #[error("Invalid number in field '{field}': {value}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("Exchange rejected request (code {code}): {msg}")]
    Rejected { code: String, msg: String },

    #[error("JSON decode failed: {0}")]
    Json(#[from] serde_json::Error),
}
