//! Excel file reader (xlsx, xls, ods)

use std::path::Path;

use anyhow::{bail, Context, Result};
use calamine::{open_workbook_auto, Data, Range, Reader};

use crate::model::{CellValue, Table};

use super::{text_cell, ReadOptions, SourceReader};

/// Reader for spreadsheet workbooks; the first row is the header
pub struct ExcelReader;

impl SourceReader for ExcelReader {
    fn read(&self, path: &Path, _options: &ReadOptions) -> Result<Table> {
        let mut workbook = open_workbook_auto(path)
            .with_context(|| format!("Failed to open Excel file: {}", path.display()))?;

        // Only the first sheet holds records
        let sheet_name = match workbook.sheet_names().first() {
            Some(first) => first.clone(),
            None => bail!("No sheets found in workbook"),
        };

        let range: Range<Data> = workbook
            .worksheet_range(&sheet_name)
            .with_context(|| format!("Failed to read sheet: {}", sheet_name))?;

        range_to_table(&range)
    }

    fn supports_extension(&self, ext: &str) -> bool {
        matches!(ext.to_lowercase().as_str(), "xlsx" | "xls" | "ods" | "xlsm")
    }
}

fn range_to_table(range: &Range<Data>) -> Result<Table> {
    let mut rows = range.rows();
    let header_row = rows.next().context("No header row found")?;

    let names = header_row.iter().enumerate().map(|(i, cell)| {
        let name = cell.to_string();
        if name.trim().is_empty() {
            format!("Column{}", i + 1)
        } else {
            name.trim().to_string()
        }
    });
    let mut table = Table::with_column_names(names);

    for row in rows {
        let cells = row
            .iter()
            .take(table.column_count())
            .map(convert_cell)
            .collect();
        table.add_row(cells);
    }

    Ok(table)
}

fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Null,
        Data::String(s) => text_cell(s),
        Data::Float(f) => {
            // Check if it's actually an integer
            if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                CellValue::Int(*f as i64)
            } else {
                CellValue::Float(*f)
            }
        }
        Data::Int(i) => CellValue::Int(*i),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) if dt.is_duration() => CellValue::Float(dt.as_f64()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(datetime) => CellValue::Date(datetime.date()),
            None => CellValue::Float(dt.as_f64()),
        },
        Data::DateTimeIso(s) => parse_date_prefix(s).unwrap_or_else(|| text_cell(s)),
        Data::DurationIso(s) => text_cell(s),
        Data::Error(e) => CellValue::text(format!("#{:?}", e)),
    }
}

/// Date part of an ISO-like `YYYY-MM-DD[ T]...` string
fn parse_date_prefix(s: &str) -> Option<CellValue> {
    let date = s.get(..10)?;
    chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .map(CellValue::Date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{ExcelDateTime, ExcelDateTimeType};

    #[test]
    fn test_convert_cell() {
        assert_eq!(convert_cell(&Data::Float(3.0)), CellValue::Int(3));
        assert_eq!(convert_cell(&Data::Float(2.5)), CellValue::Float(2.5));
        assert_eq!(convert_cell(&Data::String("".into())), CellValue::Null);
        assert_eq!(convert_cell(&Data::String(" x ".into())), CellValue::from(" x "));
        assert_eq!(
            convert_cell(&Data::DateTimeIso("2020-01-31T00:00:00".into())),
            CellValue::Date(chrono::NaiveDate::from_ymd_opt(2020, 1, 31).unwrap())
        );
    }

    #[test]
    fn test_serial_date_cell() {
        let serial = ExcelDateTime::new(45000.0, ExcelDateTimeType::DateTime, false);
        assert_eq!(
            convert_cell(&Data::DateTime(serial)),
            CellValue::Date(chrono::NaiveDate::from_ymd_opt(2023, 3, 15).unwrap())
        );

        let duration = ExcelDateTime::new(1.5, ExcelDateTimeType::TimeDelta, false);
        assert_eq!(convert_cell(&Data::DateTime(duration)), CellValue::Float(1.5));
    }

    #[test]
    fn test_range_to_table() {
        let mut range: Range<Data> = Range::new((0, 0), (2, 1));
        range.set_value((0, 0), Data::String("id".into()));
        range.set_value((0, 1), Data::Empty);
        range.set_value((1, 0), Data::Float(1.0));
        range.set_value((1, 1), Data::String("Leon".into()));
        range.set_value((2, 0), Data::Float(2.0));

        let table = range_to_table(&range).unwrap();
        let names: Vec<_> = table.column_names().collect();
        assert_eq!(names, vec!["id", "Column2"]);
        assert_eq!(table.value(0, "Column2"), Some(&CellValue::from("Leon")));
        assert_eq!(table.value(1, "Column2"), Some(&CellValue::Null));
    }
}
