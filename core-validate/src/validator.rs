//! Mapping-template validation and run-key derivation
//!
//! Validates an ingested cell array against its mapping template, records
//! row-level problems into a single human-readable message, extracts the
//! observed values of every protocol-condition column, and derives the run
//! key the uploader groups files by.

use bridge_traits::sheets::CellValue;
use bridge_traits::vault::{FieldKind, MappingTemplate};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

use crate::error::{Result, ValidateError};
use crate::protocol::Protocol;
use crate::run_file::AssayRunFile;

/// Header names treated as the concentration column, lower-cased.
const CONCENTRATION_NAMES: &[&str] = &["concentration", "conc", "conc."];

/// Validates assay run files against mapping templates.
///
/// Carries the header typo-correction table; corrections are exact-match
/// substitutions applied to the header row before any lookup.
pub struct RunValidator {
    typo_map: HashMap<String, String>,
}

impl Default for RunValidator {
    fn default() -> Self {
        let mut typo_map = HashMap::new();
        typo_map.insert("Bacth".to_string(), "Batch".to_string());
        Self { typo_map }
    }
}

impl RunValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `file` in place against `template`.
    ///
    /// Sets `valid`, `validation_message`, `protocol_conditions` and
    /// `run_key`. A validation failure is recorded, not returned: the only
    /// error paths are ambiguous condition values (more than one distinct
    /// value for a condition column within one file) and a protocol the
    /// caller failed to resolve. The run key is computed even for invalid
    /// files so they still land in a deterministic group.
    pub fn validate(
        &self,
        file: &mut AssayRunFile,
        template: &MappingTemplate,
        protocols: &HashMap<String, Protocol>,
    ) -> Result<()> {
        if file.data_array.is_empty() {
            return Err(ValidateError::EmptyFile {
                file: file.source_name.clone(),
            });
        }

        self.fix_header_typos(&mut file.data_array[0]);

        // Name -> column index, trimmed. Later duplicates win, matching the
        // remote template convention.
        let columns: HashMap<String, usize> = file.data_array[0]
            .iter()
            .enumerate()
            .map(|(i, cell)| (cell.to_text().trim().to_string(), i))
            .collect();

        let mut missing_columns: Vec<String> = Vec::new();
        let mut compound_idx: Option<usize> = None;
        let mut batch_idx: Option<usize> = None;
        let mut well_idx: Option<usize> = None;
        let mut concentration_idx: Option<usize> = None;
        // Column index -> condition display name.
        let mut condition_columns: BTreeMap<usize, String> = BTreeMap::new();

        for mapping in &template.header_mappings {
            let header_name = mapping.header.name.as_str();
            let col_idx = columns.get(header_name.trim()).copied();

            if col_idx.is_none() {
                missing_columns.push(header_name.to_string());
            }

            match mapping.definition.kind {
                FieldKind::MoleculeSynonym => compound_idx = col_idx,
                FieldKind::BatchName => batch_idx = col_idx,
                FieldKind::WellLocation => well_idx = col_idx,
                FieldKind::Readout => {
                    if let Some(protocol_name) = mapping.definition.protocol_name.as_deref() {
                        let protocol = protocols.get(protocol_name).ok_or_else(|| {
                            ValidateError::UnknownProtocol {
                                name: protocol_name.to_string(),
                            }
                        })?;
                        if protocol.is_condition(mapping.definition.id) {
                            if let Some(idx) = col_idx {
                                condition_columns.insert(idx, mapping.definition.name.clone());
                            }
                        }
                    }
                }
                FieldKind::Other => {}
            }

            if CONCENTRATION_NAMES.contains(&header_name.to_lowercase().as_str()) {
                if let Some(idx) = col_idx {
                    concentration_idx = Some(idx);
                }
            }
        }

        if well_idx.is_some() {
            // Plate-layout files get their well-level checks downstream in
            // the vault; nothing to verify at this layer.
            debug!(file = %file.source_name, "well location column present");
        }

        let mut missing_batch: BTreeSet<String> = BTreeSet::new();
        let mut missing_compound: BTreeSet<usize> = BTreeSet::new();
        let mut conditions: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        if let (Some(compound_idx), Some(batch_idx)) = (compound_idx, batch_idx) {
            for (row_num, row) in file.data_array.iter().enumerate().skip(1) {
                let compound = cell_at(row, compound_idx);
                let batch = cell_at(row, batch_idx);
                let compound_present = compound.map(|c| !c.is_empty()).unwrap_or(false);
                let batch_present = batch.map(|c| !c.is_empty()).unwrap_or(false);

                if compound_present && !batch_present {
                    missing_batch.insert(compound.map(CellValue::to_text).unwrap_or_default());
                }
                if batch_present && !compound_present {
                    missing_compound.insert(row_num);
                }
                if let Some(conc_idx) = concentration_idx {
                    let conc_present =
                        cell_at(row, conc_idx).map(|c| !c.is_empty()).unwrap_or(false);
                    if conc_present && !compound_present {
                        missing_compound.insert(row_num);
                    }
                }

                if compound_present {
                    for (&idx, column_name) in &condition_columns {
                        let value =
                            cell_at(row, idx).map(CellValue::to_text).unwrap_or_default();
                        conditions
                            .entry(column_name.clone())
                            .or_default()
                            .insert(value);
                    }
                }
            }
        }

        if !missing_columns.is_empty() || !missing_batch.is_empty() || !missing_compound.is_empty()
        {
            let mut message = format!("File: {} ", file.source_name);
            if !missing_columns.is_empty() {
                message.push_str(&format!(" Columns Missing: {}", missing_columns.join(", ")));
            }
            if !missing_batch.is_empty() {
                message.push_str(&format!(
                    " \n Batch Numbers Missing for compounds: {}",
                    missing_batch.iter().cloned().collect::<Vec<_>>().join(", ")
                ));
            }
            if !missing_compound.is_empty() {
                message.push_str(&format!(
                    " \n Compound Identifier Missing on row: {}",
                    missing_compound
                        .iter()
                        .map(|n| n.to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                ));
            }
            file.valid = false;
            file.validation_message = Some(message);
        } else {
            file.valid = true;
            file.validation_message = None;
        }

        file.protocol_conditions = conditions;
        file.run_key = self.make_run_key(file)?;
        Ok(())
    }

    /// Derive the grouping key from the condition columns, sorted by column
    /// name. One distinct value per column is required; files with no
    /// condition columns get the empty key.
    fn make_run_key(&self, file: &AssayRunFile) -> Result<String> {
        let mut parts = Vec::with_capacity(file.protocol_conditions.len());
        for (column_name, values) in &file.protocol_conditions {
            if values.len() > 1 {
                return Err(ValidateError::AmbiguousConditions {
                    file: file.source_name.clone(),
                    column: column_name.clone(),
                    values: values.iter().cloned().collect(),
                });
            }
            let value = values.iter().next().cloned().unwrap_or_default();
            parts.push(format!("{}-{}", column_name, value));
        }
        Ok(parts.join("|"))
    }

    fn fix_header_typos(&self, header_row: &mut [CellValue]) {
        for cell in header_row.iter_mut() {
            if let CellValue::Text(name) = cell {
                if let Some(corrected) = self.typo_map.get(name.as_str()) {
                    *name = corrected.clone();
                }
            }
        }
    }
}

fn cell_at(row: &[CellValue], idx: usize) -> Option<&CellValue> {
    row.get(idx)
}
