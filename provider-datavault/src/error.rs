//! Error types for the data-vault provider

use thiserror::Error;

/// Data-vault provider errors
#[derive(Error, Debug)]
pub enum DataVaultError {
    /// API request returned an error
    #[error("Vault API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Protocol lookup by name did not resolve to exactly one protocol
    #[error("Protocol lookup for '{name}' matched {count} protocols, expected exactly 1")]
    AmbiguousProtocol { name: String, count: u64 },

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

/// Result type for data-vault operations
pub type Result<T> = std::result::Result<T, DataVaultError>;

impl From<DataVaultError> for bridge_traits::error::BridgeError {
    fn from(error: DataVaultError) -> Self {
        match error {
            DataVaultError::ApiError {
                status_code,
                message,
            } => bridge_traits::error::BridgeError::Api {
                status: status_code,
                message,
            },
            DataVaultError::AmbiguousProtocol { name, count } => {
                bridge_traits::error::BridgeError::OperationFailed(format!(
                    "Protocol lookup for '{}' matched {} protocols",
                    name, count
                ))
            }
            DataVaultError::ParseError(msg) => bridge_traits::error::BridgeError::Parse(msg),
            DataVaultError::NetworkError(msg) => {
                bridge_traits::error::BridgeError::OperationFailed(format!(
                    "Network error: {}",
                    msg
                ))
            }
            DataVaultError::BridgeError(e) => e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_protocol_display() {
        let error = DataVaultError::AmbiguousProtocol {
            name: "Kinase Panel".to_string(),
            count: 2,
        };
        assert_eq!(
            error.to_string(),
            "Protocol lookup for 'Kinase Panel' matched 2 protocols, expected exactly 1"
        );
    }
}
