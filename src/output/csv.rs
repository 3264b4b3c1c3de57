//! Delimiter-separated output

use std::io::Write;

use anyhow::Result;

use crate::model::Table;

use super::StreamWriter;

/// CSV writer, `;`-separated by default
pub struct CsvWriter {
    delimiter: u8,
}

impl CsvWriter {
    pub fn new() -> Self {
        Self { delimiter: b';' }
    }
}

impl Default for CsvWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamWriter for CsvWriter {
    fn render(&self, table: &Table, writer: &mut dyn Write) -> Result<()> {
        let mut csv_writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(writer);

        csv_writer.write_record(table.column_names())?;
        for row in &table.rows {
            csv_writer.write_record(row.cells.iter().map(|c| c.to_field().into_owned()))?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}
