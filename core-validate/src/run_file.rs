//! One ingested assay file on its way through the pipeline.

use bridge_traits::sheets::CellValue;
use std::collections::{BTreeMap, BTreeSet};

/// An ingested spreadsheet plus the validation outcome attached to it.
///
/// Created unvalidated by the ingestor, mutated exactly once by the
/// validator, then never mutated after grouping. After upload only
/// `entry_id` and `group_id` are referenced for status write-back.
#[derive(Debug, Clone)]
pub struct AssayRunFile {
    /// Rows of raw cell values; row 0 is the header row.
    pub data_array: Vec<Vec<CellValue>>,
    pub source_name: String,
    pub entry_id: String,
    pub group_id: String,
    pub valid: bool,
    pub validation_message: Option<String>,
    /// Observed values per condition column, keyed by column display name.
    /// Ordered so the derived run key is deterministic.
    pub protocol_conditions: BTreeMap<String, BTreeSet<String>>,
    /// Grouping key derived from the condition columns; empty when the file
    /// has none ("ungrouped" bucket).
    pub run_key: String,
}

impl AssayRunFile {
    pub fn new(
        data_array: Vec<Vec<CellValue>>,
        source_name: impl Into<String>,
        entry_id: impl Into<String>,
        group_id: impl Into<String>,
    ) -> Self {
        Self {
            data_array,
            source_name: source_name.into(),
            entry_id: entry_id.into(),
            group_id: group_id.into(),
            valid: true,
            validation_message: None,
            protocol_conditions: BTreeMap::new(),
            run_key: String::new(),
        }
    }

    /// Data rows only (everything after the header row).
    pub fn data_rows(&self) -> &[Vec<CellValue>] {
        if self.data_array.len() > 1 {
            &self.data_array[1..]
        } else {
            &[]
        }
    }
}
