//! Change-event stream abstraction
//!
//! The remote file store exposes an ordered feed of filesystem events with
//! monotonically increasing ids. The sync engine resumes the feed from a
//! durable cursor; this trait is the seam it consumes the feed through.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Action recorded by the remote event stream.
///
/// Anything the pipeline does not act on is folded into `Other` so that new
/// remote action names never break deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventAction {
    Create,
    Move,
    Copy,
    #[serde(other)]
    Other,
}

impl EventAction {
    /// True for actions that can introduce a new file version worth
    /// ingesting.
    pub fn is_ingestible(&self) -> bool {
        matches!(self, EventAction::Create | EventAction::Move | EventAction::Copy)
    }
}

/// One event from the remote change feed. Immutable; consumed once per pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Monotonically increasing event id.
    pub id: u64,
    pub action: EventAction,
    /// Absolute path of the affected entry after the event.
    pub target_path: String,
    pub is_folder: bool,
}

/// Remote change-event feed.
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// List up to `count` events with id strictly greater than `since_id`,
    /// scoped to `folder`.
    async fn list_events(&self, folder: &str, since_id: u64, count: u32)
        -> Result<Vec<ChangeEvent>>;

    /// Newest event id currently known to the remote stream.
    async fn latest_event_id(&self, folder: &str) -> Result<u64>;

    /// Oldest event id still retained by the remote stream. Cursors older
    /// than this cannot be resumed without a gap.
    async fn oldest_event_id(&self, folder: &str) -> Result<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingestible_actions() {
        assert!(EventAction::Create.is_ingestible());
        assert!(EventAction::Move.is_ingestible());
        assert!(EventAction::Copy.is_ingestible());
        assert!(!EventAction::Other.is_ingestible());
    }

    #[test]
    fn test_unknown_action_deserializes_as_other() {
        let event: ChangeEvent = serde_json::from_str(
            r#"{"id": 7, "action": "delete", "target_path": "/x.xlsx", "is_folder": false}"#,
        )
        .unwrap();
        assert_eq!(event.action, EventAction::Other);
    }
}
