use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Not found: {kind}/{id}")]
    NotFound { kind: String, id: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages() {
        let err = StorageError::not_found("Alert", "abc");
        assert_eq!(err.to_string(), "Not found: Alert/abc");

        let err = StorageError::backend("connection refused");
        assert_eq!(err.to_string(), "Backend error: connection refused");
    }
}
