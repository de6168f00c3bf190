use thiserror::Error;

pub type Result<T> = std::result::Result<T, SirError>;

#[derive(Debug, Error)]
pub enum SirError {
    /// An input violates a documented domain constraint. Never corrected silently.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The solver could not reach the end of the horizon within its budget.
    #[error("integration failed at t = {time}: {reason}")]
    IntegrationFailure { time: f64, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl SirError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        SirError::InvalidParameter(message.into())
    }

    pub(crate) fn integration(time: f64, reason: impl Into<String>) -> Self {
        SirError::IntegrationFailure {
            time,
            reason: reason.into(),
        }
    }
}
