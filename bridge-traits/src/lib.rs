//! # Bridge Traits
//!
//! Collaborator interfaces and shared wire types for the sync pipeline.
//! Everything remote lives behind a trait here: the change-event feed and
//! file store of the storage system, the scientific-data vault, workbook
//! parsing, HTTP transport, and outbound notifications. Connector crates
//! implement these traits; the core crates depend only on this one.

pub mod error;
pub mod events;
pub mod http;
pub mod notify;
pub mod sheets;
pub mod storage;
pub mod vault;

pub use error::{BridgeError, Result};
pub use events::{ChangeEvent, ChangeFeed, EventAction};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use notify::{Notifier, NullNotifier};
pub use sheets::{CellValue, Sheet, WorkbookReader};
pub use storage::{CorrelatedFile, FileEntry, FileStore, MetadataStore};
pub use vault::{
    FieldDefinition, FieldKind, HeaderMapping, HeaderName, MappingTemplate, ProtocolDef,
    ProtocolRuns, ReadoutDefinition, SlurpJob, SlurpRequest, SlurpState, VaultGateway, VaultRun,
};
