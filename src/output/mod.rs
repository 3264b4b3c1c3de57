//! Sink writers for transformed tables

mod csv;
mod json;
mod sqlite;
mod xml;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::config::OutputFormat;
use crate::model::{Table, TargetSchema};

pub use self::csv::CsvWriter;
pub use self::json::JsonWriter;
pub use self::sqlite::SqliteWriter;
pub use self::xml::XmlWriter;

/// Trait for table writers
pub trait TableWriter {
    /// Write the table to `destination`, returning the file size in bytes
    fn write(&self, table: &Table, destination: &Path) -> Result<u64>;
}

/// Writers that serialize a table to a byte stream
pub trait StreamWriter {
    /// Render the table to a writer
    fn render(&self, table: &Table, writer: &mut dyn Write) -> Result<()>;
}

impl<W: StreamWriter> TableWriter for W {
    fn write(&self, table: &Table, destination: &Path) -> Result<u64> {
        let file = File::create(destination)
            .with_context(|| format!("Failed to create file: {}", destination.display()))?;
        let mut writer = BufWriter::new(file);
        self.render(table, &mut writer)?;
        writer.flush()?;
        drop(writer);

        let size = std::fs::metadata(destination)
            .with_context(|| format!("Failed to stat file: {}", destination.display()))?
            .len();
        Ok(size)
    }
}

/// Factory for creating writers based on output format
pub struct WriterFactory;

impl WriterFactory {
    /// Create a writer; the SQLite writer takes column types and the table name
    pub fn create(
        format: OutputFormat,
        schema: &TargetSchema,
        table_name: &str,
    ) -> Box<dyn TableWriter> {
        match format {
            OutputFormat::Csv => Box::new(CsvWriter::new()),
            OutputFormat::Json => Box::new(JsonWriter::new()),
            OutputFormat::Xml => Box::new(XmlWriter::new()),
            OutputFormat::Sqlite => Box::new(SqliteWriter::new(table_name, schema)),
        }
    }
}
