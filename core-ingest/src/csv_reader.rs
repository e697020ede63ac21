//! CSV-backed workbook reader
//!
//! CSV files carry a single sheet. The reader presents it under the primary
//! data-sheet name so the ingestor's candidate lookup works unchanged across
//! formats.

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::sheets::{CellValue, Sheet, WorkbookReader};
use bytes::Bytes;

pub struct CsvWorkbookReader {
    sheet_name: String,
}

impl CsvWorkbookReader {
    pub fn new(sheet_name: impl Into<String>) -> Self {
        Self {
            sheet_name: sheet_name.into(),
        }
    }
}

#[async_trait]
impl WorkbookReader for CsvWorkbookReader {
    async fn read(&self, file_name: &str, content: &Bytes) -> Result<Vec<Sheet>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(content.as_ref());

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| {
                BridgeError::Parse(format!("CSV parse error in {}: {}", file_name, e))
            })?;
            rows.push(record.iter().map(CellValue::from).collect());
        }

        Ok(vec![Sheet {
            name: self.sheet_name.clone(),
            rows,
        }])
    }
}
