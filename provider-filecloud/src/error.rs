//! Error types for the file-cloud provider

use thiserror::Error;

/// File-cloud provider errors
#[derive(Error, Debug)]
pub enum FileCloudError {
    /// API request returned an error
    #[error("File-cloud API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Entry not found
    #[error("Entry not found: {path}")]
    EntryNotFound { path: String },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Network error
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Bridge error
    #[error(transparent)]
    BridgeError(#[from] bridge_traits::error::BridgeError),
}

/// Result type for file-cloud operations
pub type Result<T> = std::result::Result<T, FileCloudError>;

impl From<FileCloudError> for bridge_traits::error::BridgeError {
    fn from(error: FileCloudError) -> Self {
        match error {
            FileCloudError::ApiError {
                status_code,
                message,
            } => bridge_traits::error::BridgeError::Api {
                status: status_code,
                message,
            },
            FileCloudError::EntryNotFound { path } => {
                bridge_traits::error::BridgeError::NotFound(path)
            }
            FileCloudError::ParseError(msg) => bridge_traits::error::BridgeError::Parse(msg),
            FileCloudError::NetworkError(msg) => {
                bridge_traits::error::BridgeError::OperationFailed(format!(
                    "Network error: {}",
                    msg
                ))
            }
            FileCloudError::BridgeError(e) => e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = FileCloudError::ApiError {
            status_code: 403,
            message: "Forbidden".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "File-cloud API error (status 403): Forbidden"
        );
    }

    #[test]
    fn test_not_found_converts_to_bridge_not_found() {
        let error = FileCloudError::EntryNotFound {
            path: "/Shared/x".to_string(),
        };
        let bridge: bridge_traits::error::BridgeError = error.into();
        assert!(bridge.is_not_found());
    }
}
