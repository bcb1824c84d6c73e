use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Feed request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Feed response malformed: {0}")]
    Malformed(String),

    #[error("Adapter timed out after {0}s")]
    Timeout(u64),

    #[error("Storage error: {0}")]
    Storage(#[from] vigil_storage::StorageError),
}

impl SourceError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }
}
