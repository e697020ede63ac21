//! # Validation & Grouping
//!
//! Validates ingested spreadsheets against their vault mapping template and
//! derives the run key that groups files belonging to the same experimental
//! run.
//!
//! ## Components
//!
//! - **Run File** (`run_file`): an ingested cell array plus its validation
//!   outcome
//! - **Protocol** (`protocol`): parsed protocol with its condition ids
//! - **Run Validator** (`validator`): template checks, row-level checks,
//!   condition extraction and run-key derivation

pub mod error;
pub mod protocol;
pub mod run_file;
pub mod validator;

pub use error::{Result, ValidateError};
pub use protocol::Protocol;
pub use run_file::AssayRunFile;
pub use validator::RunValidator;
