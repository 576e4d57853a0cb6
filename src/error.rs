use thiserror::Error;

#[derive(Debug, Error)]
pub enum BedrockError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Provider error ({status_code}): {message}")]
    ProviderError { status_code: u16, message: String },
    #[error("Transient network error ({status_code}): {message}")]
    TransientNetworkError { status_code: u16, message: String },
    #[error("Response error: {0}")]
    ResponseError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Media error: {0}")]
    MediaError(String),
    #[error("Storage error: {0}")]
    StorageError(String),
}

impl BedrockError {
    pub fn is_transient(&self) -> bool {
        matches!(self, BedrockError::TransientNetworkError { .. })
    }
}

impl From<serde_json::Error> for BedrockError {
    fn from(e: serde_json::Error) -> Self {
        BedrockError::SerializationError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BedrockError>;
