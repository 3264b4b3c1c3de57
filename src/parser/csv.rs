//! CSV file reader

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};

use crate::model::{CellValue, Table};

use super::{text_cell, ReadOptions, SourceReader};

/// Reader for delimiter-separated files with a header row
pub struct CsvReader;

impl SourceReader for CsvReader {
    fn read(&self, path: &Path, options: &ReadOptions) -> Result<Table> {
        let file =
            File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
        read_csv(BufReader::new(file), options.csv_delimiter)
    }

    fn supports_extension(&self, ext: &str) -> bool {
        matches!(ext.to_lowercase().as_str(), "csv")
    }
}

/// Read CSV data; every cell stays text until it is coerced
pub fn read_csv<R: Read>(reader: R, delimiter: u8) -> Result<Table> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .context("Failed to read CSV headers")?
        .clone();
    let mut table = Table::with_column_names(headers.iter().map(|h| h.trim().to_string()));

    for (line_num, result) in csv_reader.records().enumerate() {
        // +2 for 1-indexing and header
        let record = result.with_context(|| format!("Failed to read CSV row {}", line_num + 2))?;
        let cells: Vec<CellValue> = record
            .iter()
            .take(table.column_count())
            .map(text_cell)
            .collect();
        table.add_row(cells);
    }

    Ok(table)
}
