use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("No data sheet found in {file}; tried: {}", candidates.join(", "))]
    SheetNotFound {
        file: String,
        candidates: Vec<String>,
    },

    #[error("Failed to download {file}: {source}")]
    Download {
        file: String,
        #[source]
        source: bridge_traits::BridgeError,
    },

    #[error("Failed to parse {file}: {source}")]
    Parse {
        file: String,
        #[source]
        source: bridge_traits::BridgeError,
    },
}

pub type Result<T> = std::result::Result<T, IngestError>;
