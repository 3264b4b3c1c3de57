//! JSON output format

use std::io::Write;

use anyhow::Result;
use serde_json::{Map, Value};

use crate::model::{CellValue, Table};

use super::StreamWriter;

/// JSON writer producing an array of row objects
pub struct JsonWriter {
    pretty: bool,
}

impl JsonWriter {
    pub fn new() -> Self {
        Self { pretty: true }
    }

    pub fn compact() -> Self {
        Self { pretty: false }
    }
}

impl Default for JsonWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn cell_value_to_json(value: &CellValue) -> Value {
    match value {
        CellValue::Null => Value::Null,
        CellValue::Bool(b) => Value::Bool(*b),
        CellValue::Int(i) => serde_json::json!(*i),
        CellValue::Float(f) => serde_json::json!(*f),
        CellValue::String(s) => Value::String(s.to_string()),
        CellValue::Date(_) => Value::String(value.display().into_owned()),
    }
}

impl StreamWriter for JsonWriter {
    fn render(&self, table: &Table, writer: &mut dyn Write) -> Result<()> {
        let records: Vec<Value> = table
            .rows
            .iter()
            .map(|row| {
                let object: Map<String, Value> = table
                    .column_names()
                    .zip(&row.cells)
                    .map(|(name, cell)| (name.to_string(), cell_value_to_json(cell)))
                    .collect();
                Value::Object(object)
            })
            .collect();

        if self.pretty {
            serde_json::to_writer_pretty(&mut *writer, &records)?;
        } else {
            serde_json::to_writer(&mut *writer, &records)?;
        }
        writeln!(writer)?;

        Ok(())
    }
}
