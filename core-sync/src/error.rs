use bridge_traits::vault::SlurpState;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Bridge(#[from] bridge_traits::BridgeError),

    #[error(transparent)]
    Ingest(#[from] core_ingest::IngestError),

    #[error(transparent)]
    Validate(#[from] core_validate::ValidateError),

    #[error("Cursor error: {0}")]
    Cursor(String),

    #[error("Cursor cannot move backwards: committed {committed}, requested {requested}")]
    CursorRegression { committed: u64, requested: u64 },

    #[error("Slurp job {slurp_id} ended in state {state}")]
    JobFailed { slurp_id: u64, state: SlurpState },

    #[error("Sync cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, SyncError>;
