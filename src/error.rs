use thiserror::Error;

/// Errors surfaced by the guard to its callers.
///
/// Scoring and rewriting are total over a validated post, so the only
/// failure a caller sees during analysis is [`GuardError::Validation`].
/// The remaining variants come from the audit log and configuration loading.
#[derive(Error, Debug)]
pub enum GuardError {
    /// Malformed or missing post fields.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration file or values.
    #[error("config error: {0}")]
    Config(String),
}

pub type GuardResult<T> = Result<T, GuardError>;
