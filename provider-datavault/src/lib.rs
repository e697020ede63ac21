//! # Data-Vault Provider
//!
//! REST connector for the scientific-data vault.
//!
//! ## Overview
//!
//! This module provides:
//! - Mapping-template and protocol lookup
//! - Slurp submission, status polling and cancellation
//! - Recent-run listing, run field updates and file attachments
//! - Token-header authentication and retry with exponential backoff

pub mod connector;
pub mod error;
pub mod types;

pub use connector::DataVaultConnector;
pub use error::{DataVaultError, Result};
