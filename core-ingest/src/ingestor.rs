//! Spreadsheet ingestion
//!
//! Downloads a file, parses it through the injected workbook reader and
//! locates the designated data sheet by a fixed ordered list of candidate
//! names. The result is an unvalidated `AssayRunFile`.

use bridge_traits::sheets::WorkbookReader;
use bridge_traits::storage::{FileEntry, FileStore};
use core_validate::AssayRunFile;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::{IngestError, Result};

/// Default ordered list of sheet names tried when locating the data sheet.
pub const DEFAULT_SHEET_CANDIDATES: &[&str] = &["format_raw_data_vault", "raw_data"];

pub struct SpreadsheetIngestor {
    file_store: Arc<dyn FileStore>,
    reader: Arc<dyn WorkbookReader>,
    sheet_candidates: Vec<String>,
}

impl SpreadsheetIngestor {
    pub fn new(file_store: Arc<dyn FileStore>, reader: Arc<dyn WorkbookReader>) -> Self {
        Self::with_candidates(
            file_store,
            reader,
            DEFAULT_SHEET_CANDIDATES.iter().map(|s| s.to_string()).collect(),
        )
    }

    pub fn with_candidates(
        file_store: Arc<dyn FileStore>,
        reader: Arc<dyn WorkbookReader>,
        sheet_candidates: Vec<String>,
    ) -> Self {
        Self {
            file_store,
            reader,
            sheet_candidates,
        }
    }

    /// Download and convert `entry` into an unvalidated assay run file.
    #[instrument(skip(self), fields(path = %entry.path))]
    pub async fn ingest(&self, entry: &FileEntry) -> Result<AssayRunFile> {
        let content =
            self.file_store
                .download(&entry.path)
                .await
                .map_err(|source| IngestError::Download {
                    file: entry.name.clone(),
                    source,
                })?;

        let sheets = self
            .reader
            .read(&entry.name, &content)
            .await
            .map_err(|source| IngestError::Parse {
                file: entry.name.clone(),
                source,
            })?;

        let sheet = self
            .sheet_candidates
            .iter()
            .find_map(|candidate| sheets.iter().find(|s| &s.name == candidate))
            .ok_or_else(|| IngestError::SheetNotFound {
                file: entry.name.clone(),
                candidates: self.sheet_candidates.clone(),
            })?;

        debug!(
            sheet = %sheet.name,
            rows = sheet.rows.len(),
            "ingested data sheet"
        );

        Ok(AssayRunFile::new(
            sheet.rows.clone(),
            entry.name.clone(),
            entry.entry_id.clone(),
            entry.group_id.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::sheets::{CellValue, Sheet};
    use bridge_traits::storage::CorrelatedFile;
    use bytes::Bytes;
    use std::collections::HashMap;

    struct FixedFileStore {
        content: Bytes,
    }

    #[async_trait]
    impl FileStore for FixedFileStore {
        async fn download(&self, _path: &str) -> BridgeResult<Bytes> {
            Ok(self.content.clone())
        }

        async fn find_by_correlation(
            &self,
            _correlation_id: &str,
        ) -> BridgeResult<Vec<CorrelatedFile>> {
            Ok(Vec::new())
        }
    }

    struct FixedReader {
        sheets: Vec<Sheet>,
    }

    #[async_trait]
    impl WorkbookReader for FixedReader {
        async fn read(&self, _file_name: &str, _content: &Bytes) -> BridgeResult<Vec<Sheet>> {
            if self.sheets.is_empty() {
                return Err(BridgeError::Parse("empty workbook".into()));
            }
            Ok(self.sheets.clone())
        }
    }

    fn entry() -> FileEntry {
        FileEntry {
            path: "/Shared/assays/plate1.xlsx".into(),
            name: "plate1.xlsx".into(),
            entry_id: "e-1".into(),
            group_id: "g-1".into(),
            is_folder: false,
            custom_metadata: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_ingest_picks_first_matching_candidate() {
        let sheets = vec![
            Sheet {
                name: "notes".into(),
                rows: vec![],
            },
            Sheet {
                name: "format_raw_data_vault".into(),
                rows: vec![vec![CellValue::from("CompoundID")]],
            },
        ];
        let ingestor = SpreadsheetIngestor::new(
            Arc::new(FixedFileStore {
                content: Bytes::new(),
            }),
            Arc::new(FixedReader { sheets }),
        );

        let file = ingestor.ingest(&entry()).await.unwrap();
        assert_eq!(file.source_name, "plate1.xlsx");
        assert_eq!(file.entry_id, "e-1");
        assert_eq!(file.data_array.len(), 1);
        assert!(file.valid, "freshly ingested files start unvalidated");
    }

    #[tokio::test]
    async fn test_sheet_not_found() {
        let sheets = vec![Sheet {
            name: "summary".into(),
            rows: vec![],
        }];
        let ingestor = SpreadsheetIngestor::new(
            Arc::new(FixedFileStore {
                content: Bytes::new(),
            }),
            Arc::new(FixedReader { sheets }),
        );

        let err = ingestor.ingest(&entry()).await.unwrap_err();
        assert!(matches!(err, IngestError::SheetNotFound { .. }));
    }
}
