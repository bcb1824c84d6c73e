use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Invalid sender configuration: {0}")]
    InvalidConfig(String),

    #[error("Provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Storage error: {0}")]
    Storage(#[from] vigil_storage::StorageError),
}

impl DispatchError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    pub fn send_failed(message: impl Into<String>) -> Self {
        Self::SendFailed(message.into())
    }
}
