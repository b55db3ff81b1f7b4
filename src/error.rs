use thiserror::Error;

/// Errors raised while turning a snapshot into an upload payload
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Snapshot has no pixels ({width}x{height})")]
    EmptySnapshot { width: usize, height: usize },

    #[error("Failed to encode snapshot: {0}")]
    Image(#[from] image::ImageError),
}

/// Errors raised by a generation service call
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Service call ended without a reply")]
    Disconnected,
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Anything that sends a pipeline invocation down the fallback path
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Malformed response: {0}")]
    MalformedResponse(#[from] serde_json::Error),
}

/// Errors from the session store and story archive
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to serialize record: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Display name must not be blank")]
    BlankName,

    #[error("No story record named {0}")]
    MissingStory(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Errors while loading the application configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_error_wraps_encode_error() {
        let err: PipelineError = EncodeError::EmptySnapshot { width: 0, height: 0 }.into();
        assert_eq!(err.to_string(), "Snapshot has no pixels (0x0)");
    }

    #[test]
    fn test_timeout_message_names_duration() {
        let err = ServiceError::Timeout(std::time::Duration::from_secs(2));
        assert!(err.to_string().contains("2s"));
    }
}
