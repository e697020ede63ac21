//! # File-Cloud Provider
//!
//! REST connector for the remote file-storage system.
//!
//! ## Overview
//!
//! This module provides:
//! - Change-event feed access with cursor endpoints
//! - Entry metadata with namespaced custom-metadata sections
//! - Content download and correlation-id search
//! - Fixed request pacing plus retry with exponential backoff

pub mod connector;
pub mod error;
pub mod types;

pub use connector::FileCloudConnector;
pub use error::{FileCloudError, Result};
