use thiserror::Error;

/// Core error types for alert model operations
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid severity: {0}")]
    InvalidSeverity(String),

    #[error("Invalid category: {0}")]
    InvalidCategory(String),

    #[error("Invalid alert: {message}")]
    InvalidAlert { message: String },

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Time parsing error: {0}")]
    TimeError(#[from] time::error::Parse),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl CoreError {
    pub fn invalid_alert(message: impl Into<String>) -> Self {
        Self::InvalidAlert {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
