//! Workbook parsing seam
//!
//! Cell-level spreadsheet parsing is an external concern; the pipeline only
//! needs each sheet as rows of raw cell values. Readers for concrete formats
//! implement `WorkbookReader`.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// A raw cell value. No type coercion happens at this layer; validation
/// decides what emptiness and text mean per column.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Render the cell for header lookup and payload output.
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            CellValue::Bool(b) => format!("{}", b),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        if s.trim().is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s.to_string())
        }
    }
}

/// One parsed sheet: a name and a rectangular array of cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<CellValue>>,
}

/// Parses downloaded bytes into sheets of raw cell values.
#[async_trait]
pub trait WorkbookReader: Send + Sync {
    async fn read(&self, file_name: &str, content: &Bytes) -> Result<Vec<Sheet>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_emptiness() {
        assert!(CellValue::Empty.is_empty());
        assert!(CellValue::Text("   ".into()).is_empty());
        assert!(!CellValue::Text("C1".into()).is_empty());
        assert!(!CellValue::Number(0.0).is_empty());
    }

    #[test]
    fn test_whole_numbers_render_without_fraction() {
        assert_eq!(CellValue::Number(10.0).to_text(), "10");
        assert_eq!(CellValue::Number(0.5).to_text(), "0.5");
    }

    #[test]
    fn test_from_str_blank_is_empty() {
        assert_eq!(CellValue::from(""), CellValue::Empty);
        assert_eq!(CellValue::from("P1"), CellValue::Text("P1".into()));
    }
}
