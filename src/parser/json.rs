//! JSON array reader

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{bail, Context, Result};
use indexmap::IndexSet;
use serde_json::Value;

use crate::model::{CellValue, Table};

use super::{ReadOptions, SourceReader};

/// Reader for JSON arrays of records
pub struct JsonReader;

impl SourceReader for JsonReader {
    fn read(&self, path: &Path, _options: &ReadOptions) -> Result<Table> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open JSON file: {}", path.display()))?;
        read_json(BufReader::new(file))
    }

    fn supports_extension(&self, ext: &str) -> bool {
        matches!(ext.to_lowercase().as_str(), "json")
    }
}

/// Read a JSON array of objects (or a single object) into a table
pub fn read_json<R: Read>(reader: R) -> Result<Table> {
    let value: Value = serde_json::from_reader(reader).context("Failed to parse JSON file")?;

    // Handle both arrays and single objects
    let array = match value {
        Value::Array(arr) => arr,
        Value::Object(_) => vec![value],
        _ => bail!("JSON must be an array or object"),
    };

    // Collect all unique keys across all objects to build column list
    let mut column_names: IndexSet<String> = IndexSet::new();
    for item in &array {
        match item {
            Value::Object(obj) => column_names.extend(obj.keys().cloned()),
            other => bail!("JSON records must be objects, found: {}", other),
        }
    }

    let mut table = Table::with_column_names(column_names.iter().cloned());
    for item in &array {
        if let Value::Object(obj) = item {
            let cells = column_names
                .iter()
                .map(|key| json_value_to_cell(obj.get(key)))
                .collect();
            table.add_row(cells);
        }
    }

    Ok(table)
}

fn json_value_to_cell(value: Option<&Value>) -> CellValue {
    match value {
        None | Some(Value::Null) => CellValue::Null,
        Some(Value::Bool(b)) => CellValue::Bool(*b),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                CellValue::Int(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::text(n.to_string())
            }
        }
        Some(Value::String(s)) => CellValue::text(s.clone()),
        // Nested structures are kept as their JSON text
        Some(nested) => CellValue::text(nested.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_union_keys() {
        let data = r#"[
            {"id": 1, "name": "Leon", "active": true},
            {"id": 2, "mail": "mia@example.com", "score": 1.5, "tags": ["a"]}
        ]"#;
        let table = read_json(data.as_bytes()).unwrap();

        let names: Vec<_> = table.column_names().collect();
        assert_eq!(names, vec!["id", "name", "active", "mail", "score", "tags"]);
        assert_eq!(table.value(0, "id"), Some(&CellValue::Int(1)));
        assert_eq!(table.value(0, "active"), Some(&CellValue::Bool(true)));
        assert_eq!(table.value(1, "name"), Some(&CellValue::Null));
        assert_eq!(table.value(1, "score"), Some(&CellValue::Float(1.5)));
        assert_eq!(table.value(1, "tags"), Some(&CellValue::from(r#"["a"]"#)));
    }

    #[test]
    fn test_scalar_root_is_rejected() {
        assert!(read_json("42".as_bytes()).is_err());
        assert!(read_json("[1, 2]".as_bytes()).is_err());
    }

    #[test]
    fn test_empty_array_gives_empty_table() {
        let table = read_json("[]".as_bytes()).unwrap();
        assert_eq!(table.row_count(), 0);
    }
}
