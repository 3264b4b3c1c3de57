//! Run statistics

use std::io::Write;

use anyhow::Result;
use serde::Serialize;
use tabled::builder::Builder;
use tabled::settings::Style;

/// Row and byte counts before and after a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Rows read from all sources, before coercion
    pub source_rows: usize,
    /// Size of all sources that could be read
    pub source_bytes: u64,
    pub target_rows: usize,
    /// Size of the written output
    pub target_bytes: u64,
}

impl RunStats {
    /// Percentage of source rows that did not reach the target
    pub fn row_reduction(&self) -> f64 {
        reduction(self.source_rows as f64, self.target_rows as f64)
    }

    /// Percentage by which the output is smaller than the sources
    pub fn size_reduction(&self) -> f64 {
        reduction(self.source_bytes as f64, self.target_bytes as f64)
    }

    /// Statistics as a bordered table
    pub fn to_table(&self) -> String {
        let mut builder = Builder::default();
        builder.push_record(["Statistic".to_string(), "Value".to_string()]);
        builder.push_record(["Source data rows".to_string(), self.source_rows.to_string()]);
        builder.push_record(["Source data bytes".to_string(), format_bytes(self.source_bytes)]);
        builder.push_record(["Target data rows".to_string(), self.target_rows.to_string()]);
        builder.push_record(["Target data bytes".to_string(), format_bytes(self.target_bytes)]);
        builder.push_record([
            "Data row reduction".to_string(),
            format!("{:.2}%", self.row_reduction()),
        ]);
        builder.push_record([
            "Data size reduction".to_string(),
            format!("{:.2}%", self.size_reduction()),
        ]);

        let mut table = builder.build();
        table.with(Style::modern());
        table.to_string()
    }

    pub fn render(&self, writer: &mut dyn Write) -> Result<()> {
        writeln!(writer, "Statistics:")?;
        writeln!(writer, "{}", self.to_table())?;
        Ok(())
    }
}

fn reduction(before: f64, after: f64) -> f64 {
    if before == 0.0 {
        return 0.0;
    }
    (before - after) / before * 100.0
}

const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

/// Human-readable byte count: two decimals at most, trailing zeros stripped
pub fn format_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let formatted = format!("{:.2}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    format!("{}{}", trimmed, UNITS[unit])
}
