use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Remote resource not found: {0}")]
    NotFound(String),

    #[error("Remote operation failed: {0}")]
    OperationFailed(String),

    #[error("Remote API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse remote response: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;

impl BridgeError {
    /// True when the error represents a missing resource rather than a
    /// transport or server failure. Callers at the folder-config and file
    /// layers treat absence as a skippable condition, not an error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, BridgeError::NotFound(_))
            || matches!(self, BridgeError::Api { status: 404, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_detection() {
        assert!(BridgeError::NotFound("/a/b".into()).is_not_found());
        assert!(BridgeError::Api {
            status: 404,
            message: "gone".into()
        }
        .is_not_found());
        assert!(!BridgeError::OperationFailed("boom".into()).is_not_found());
    }
}
