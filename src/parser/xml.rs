//! XML reader: children of the root element are rows, their children are fields

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use indexmap::{IndexMap, IndexSet};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::model::{CellValue, Table};

use super::{text_cell, ReadOptions, SourceReader};

type Record = IndexMap<String, CellValue>;

/// Reader for record-per-element XML documents
pub struct XmlReader;

impl SourceReader for XmlReader {
    fn read(&self, path: &Path, _options: &ReadOptions) -> Result<Table> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to open XML file: {}", path.display()))?;
        read_xml(&content)
    }

    fn supports_extension(&self, ext: &str) -> bool {
        matches!(ext.to_lowercase().as_str(), "xml")
    }
}

/// Read an XML document shaped like `<data><row><col>v</col></row></data>`.
///
/// Attributes of a row element become columns too.
pub fn read_xml(content: &str) -> Result<Table> {
    let mut reader = Reader::from_str(content);

    let mut depth = 0usize;
    let mut records: Vec<Record> = Vec::new();
    let mut current: Option<Record> = None;
    let mut field: Option<(String, String)> = None;

    loop {
        match reader.read_event().context("Failed to parse XML")? {
            Event::Start(e) => {
                depth += 1;
                match depth {
                    2 => current = Some(attributes(&e, &reader)?),
                    3 => field = Some((element_name(&e), String::new())),
                    _ => {}
                }
            }
            Event::Empty(e) => match depth + 1 {
                2 => records.push(attributes(&e, &reader)?),
                3 => {
                    if let Some(record) = current.as_mut() {
                        record.insert(element_name(&e), CellValue::Null);
                    }
                }
                _ => {}
            },
            Event::Text(t) => {
                if let (3, Some((_, text))) = (depth, field.as_mut()) {
                    text.push_str(&t.unescape().context("Invalid XML text")?);
                }
            }
            Event::CData(c) => {
                if let (3, Some((_, text))) = (depth, field.as_mut()) {
                    text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::End(_) => {
                match depth {
                    3 => {
                        if let (Some((name, text)), Some(record)) = (field.take(), current.as_mut())
                        {
                            record.insert(name, text_cell(&text));
                        }
                    }
                    2 => {
                        if let Some(record) = current.take() {
                            records.push(record);
                        }
                    }
                    _ => {}
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let mut column_names: IndexSet<String> = IndexSet::new();
    for record in &records {
        column_names.extend(record.keys().cloned());
    }

    let mut table = Table::with_column_names(column_names.iter().cloned());
    for mut record in records {
        let cells = column_names
            .iter()
            .map(|name| record.swap_remove(name).unwrap_or(CellValue::Null))
            .collect();
        table.add_row(cells);
    }

    Ok(table)
}

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn attributes<R>(e: &BytesStart<'_>, reader: &Reader<R>) -> Result<Record> {
    let mut record = Record::new();
    for attr in e.attributes() {
        let attr = attr.context("Invalid XML attribute")?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr
            .decode_and_unescape_value(reader)
            .context("Invalid XML attribute value")?;
        record.insert(key, text_cell(&value));
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_and_fields() {
        let data = r#"<?xml version="1.0" encoding="UTF-8"?>
<data>
  <row id="1">
    <name>Leon &amp; Co</name>
    <mail>leon@example.com</mail>
  </row>
  <row id="2">
    <name><![CDATA[Mia]]></name>
    <mail/>
    <phone>123</phone>
  </row>
  <row id="3"/>
</data>"#;
        let table = read_xml(data).unwrap();

        let names: Vec<_> = table.column_names().collect();
        assert_eq!(names, vec!["id", "name", "mail", "phone"]);
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.value(0, "name"), Some(&CellValue::from("Leon & Co")));
        assert_eq!(table.value(1, "name"), Some(&CellValue::from("Mia")));
        assert_eq!(table.value(1, "mail"), Some(&CellValue::Null));
        assert_eq!(table.value(0, "phone"), Some(&CellValue::Null));
        assert_eq!(table.value(2, "id"), Some(&CellValue::from("3")));
    }

    #[test]
    fn test_attribute_entities_and_raw_text() {
        let table =
            read_xml(r#"<data><row note="a &lt; b"><name> Leon </name></row></data>"#).unwrap();
        assert_eq!(table.value(0, "note"), Some(&CellValue::from("a < b")));
        assert_eq!(table.value(0, "name"), Some(&CellValue::from(" Leon ")));
    }

    #[test]
    fn test_malformed_xml_fails() {
        assert!(read_xml("<data><row><a>1</b></row></data>").is_err());
    }
}
