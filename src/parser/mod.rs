//! Source readers for the supported tabular formats

mod csv;
mod excel;
mod json;
mod xml;

use std::path::Path;

use anyhow::{bail, Result};

use crate::model::Table;

pub use self::csv::{read_csv, CsvReader};
pub use self::excel::ExcelReader;
pub use self::json::{read_json, JsonReader};
pub use self::xml::{read_xml, XmlReader};

/// Options shared by all readers
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Field delimiter for CSV sources
    pub csv_delimiter: u8,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            csv_delimiter: b';',
        }
    }
}

/// Trait for reading one source file into an untyped table
pub trait SourceReader: Send + Sync {
    /// Read a file and return a Table
    fn read(&self, path: &Path, options: &ReadOptions) -> Result<Table>;

    /// Check if this reader can handle the given file extension
    fn supports_extension(&self, ext: &str) -> bool;
}

/// Factory selecting a reader by file extension
pub struct ReaderFactory {
    readers: Vec<Box<dyn SourceReader>>,
}

impl Default for ReaderFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ReaderFactory {
    /// Create a factory with all supported readers, in processing order
    pub fn new() -> Self {
        Self {
            readers: vec![
                Box::new(CsvReader),
                Box::new(XmlReader),
                Box::new(JsonReader),
                Box::new(ExcelReader),
            ],
        }
    }

    /// Position of the reader for `path`; sources are processed in this order
    pub fn rank(&self, path: &Path) -> Option<usize> {
        let ext = extension(path);
        self.readers.iter().position(|r| r.supports_extension(&ext))
    }

    /// Get a reader for the given file path
    pub fn get_reader(&self, path: &Path) -> Result<&dyn SourceReader> {
        match self.rank(path) {
            Some(i) => Ok(self.readers[i].as_ref()),
            None => bail!(
                "Unsupported file format: {}",
                path.extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("unknown")
            ),
        }
    }

    /// Read a file using the appropriate reader
    pub fn read(&self, path: &Path, options: &ReadOptions) -> Result<Table> {
        let reader = self.get_reader(path)?;
        reader.read(path, options)
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Raw text cell: blank and null markers become null, anything else is kept as read
pub(crate) fn text_cell(s: &str) -> crate::model::CellValue {
    if s.is_empty() || s.eq_ignore_ascii_case("null") || s == "NA" {
        return crate::model::CellValue::Null;
    }
    crate::model::CellValue::text(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CellValue;

    #[test]
    fn test_rank_orders_formats() {
        let factory = ReaderFactory::new();
        assert_eq!(factory.rank(Path::new("a.CSV")), Some(0));
        assert_eq!(factory.rank(Path::new("a.xml")), Some(1));
        assert_eq!(factory.rank(Path::new("a.json")), Some(2));
        assert_eq!(factory.rank(Path::new("a.xlsx")), Some(3));
        assert_eq!(factory.rank(Path::new("notes.txt")), None);
        assert!(factory.get_reader(Path::new("a.parquet")).is_err());
    }

    #[test]
    fn test_text_cell() {
        assert_eq!(text_cell(""), CellValue::Null);
        assert_eq!(text_cell("null"), CellValue::Null);
        assert_eq!(text_cell("NA"), CellValue::Null);
        assert_eq!(text_cell(" 42 "), CellValue::from(" 42 "));
        assert_eq!(text_cell("  "), CellValue::from("  "));
    }
}
