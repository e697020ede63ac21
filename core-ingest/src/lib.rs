//! # Spreadsheet Ingestion
//!
//! Turns a remote file into rows of raw cell values. Format-specific parsing
//! sits behind the `WorkbookReader` seam from `bridge-traits`; this crate
//! ships the CSV reader and the sheet-locating ingestor.

pub mod csv_reader;
pub mod error;
pub mod ingestor;

pub use csv_reader::CsvWorkbookReader;
pub use error::{IngestError, Result};
pub use ingestor::{SpreadsheetIngestor, DEFAULT_SHEET_CANDIDATES};
