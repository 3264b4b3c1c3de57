//! XML output format

use std::io::Write;

use anyhow::Result;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::model::Table;

use super::StreamWriter;

/// XML writer: `<data><row><column>value</column>...</row></data>`
pub struct XmlWriter {
    root: String,
    row: String,
}

impl XmlWriter {
    pub fn new() -> Self {
        Self {
            root: "data".to_string(),
            row: "row".to_string(),
        }
    }
}

impl Default for XmlWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Column names are not always valid element names
fn element_name(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if !out.starts_with(|c: char| c.is_alphabetic() || c == '_') {
        out.insert(0, '_');
    }
    out
}

impl StreamWriter for XmlWriter {
    fn render(&self, table: &Table, writer: &mut dyn Write) -> Result<()> {
        let names: Vec<String> = table.column_names().map(element_name).collect();
        let mut xml = Writer::new_with_indent(writer, b' ', 2);

        xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        xml.write_event(Event::Start(BytesStart::new(self.root.as_str())))?;

        for row in &table.rows {
            xml.write_event(Event::Start(BytesStart::new(self.row.as_str())))?;
            for (name, cell) in names.iter().zip(&row.cells) {
                if cell.is_null() {
                    xml.write_event(Event::Empty(BytesStart::new(name.as_str())))?;
                    continue;
                }
                xml.write_event(Event::Start(BytesStart::new(name.as_str())))?;
                xml.write_event(Event::Text(BytesText::new(&cell.display())))?;
                xml.write_event(Event::End(BytesEnd::new(name.as_str())))?;
            }
            xml.write_event(Event::End(BytesEnd::new(self.row.as_str())))?;
        }

        xml.write_event(Event::End(BytesEnd::new(self.root.as_str())))?;
        writeln!(xml.get_mut())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CellValue;
    use crate::parser::read_xml;

    #[test]
    fn test_render_escapes_and_nulls() {
        let mut table = Table::with_column_names(["name", "e mail"]);
        table.add_row(vec!["Leon & Co".into(), CellValue::Null]);

        let mut out = Vec::new();
        XmlWriter::new().render(&table, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(text.contains("<name>Leon &amp; Co</name>"));
        assert!(text.contains("<e_mail/>"));
    }

    #[test]
    fn test_output_reads_back() {
        let mut table = Table::with_column_names(["id", "name"]);
        table.add_row(vec!["1".into(), "Mia".into()]);
        table.add_row(vec!["2".into(), CellValue::Null]);

        let mut out = Vec::new();
        XmlWriter::new().render(&table, &mut out).unwrap();
        let back = read_xml(&String::from_utf8(out).unwrap()).unwrap();

        assert_eq!(back.rows, table.rows);
    }
}
