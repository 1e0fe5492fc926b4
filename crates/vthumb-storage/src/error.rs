//! Storage error types.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors from the object store. Each carries the object key involved.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage not configured: {0}")]
    ConfigError(String),

    #[error("Failed to write {key}: {message}")]
    Write { key: String, message: String },

    #[error("Failed to read {key}: {message}")]
    Read { key: String, message: String },

    #[error("Failed to delete {key}: {message}")]
    Delete { key: String, message: String },

    #[error("Failed to presign {key}: {message}")]
    Presign { key: String, message: String },

    #[error("R2 request failed: {0}")]
    AwsSdk(String),
}

impl StorageError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn write(key: &str, err: impl ToString) -> Self {
        Self::Write {
            key: key.to_string(),
            message: err.to_string(),
        }
    }

    pub fn read(key: &str, err: impl ToString) -> Self {
        Self::Read {
            key: key.to_string(),
            message: err.to_string(),
        }
    }

    pub fn delete(key: &str, err: impl ToString) -> Self {
        Self::Delete {
            key: key.to_string(),
            message: err.to_string(),
        }
    }

    pub fn presign(key: &str, err: impl ToString) -> Self {
        Self::Presign {
            key: key.to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_key() {
        let err = StorageError::write("thumbnails/rec-1.jpg", "timeout");
        assert_eq!(
            err.to_string(),
            "Failed to write thumbnails/rec-1.jpg: timeout"
        );
        assert!(StorageError::config_error("R2_BUCKET_NAME not set")
            .to_string()
            .contains("R2_BUCKET_NAME"));
    }
}
