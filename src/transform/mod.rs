//! Re-projection of a validated table into the target schema
//!
//! - `directive`: parsing of mapping directives into a [`MappingPlan`]
//! - `calc`: derived-value functions for `§CALC`
//! - `postprocess`: normalization by target type
//!
//! ## Flow per cell
//!
//! ```text
//! null? skip -> date reformat (datetime_* sources) -> directive -> postprocess -> write
//! ```

pub mod calc;
pub mod directive;
pub mod postprocess;

use std::borrow::Cow;

use indexmap::IndexMap;

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::model::{
    CellValue, Row, Table, TargetSchema, TypeDeclaration, CANONICAL_DATE_FORMAT,
};

pub use calc::{CalcFunction, CalcLibrary};
pub use directive::{Directive, MappingPlan};
pub use postprocess::postprocess;

/// Builds target-shaped tables from source tables
pub struct TransformEngine<'a> {
    schema: &'a TargetSchema,
    plan: &'a MappingPlan,
    source_types: &'a TypeDeclaration,
    calc: &'a CalcLibrary,
}

impl<'a> TransformEngine<'a> {
    pub fn new(
        schema: &'a TargetSchema,
        plan: &'a MappingPlan,
        source_types: &'a TypeDeclaration,
        calc: &'a CalcLibrary,
    ) -> Self {
        Self {
            schema,
            plan,
            source_types,
            calc,
        }
    }

    /// Transform every mapped cell of `source`.
    ///
    /// Output columns are the schema's columns in schema order. Each output row
    /// carries the index of the source row it came from; a source row that
    /// writes nothing produces no output row.
    pub fn transform(&self, source: &Table, sink: &mut dyn DiagnosticSink) -> Table {
        tracing::info!(
            rows = source.row_count(),
            mapped_columns = self.plan.len(),
            "Transforming data into target format"
        );

        // Mapped source columns present in this table, in table order
        let mapped: Vec<(usize, &str, &Directive)> = source
            .columns
            .iter()
            .enumerate()
            .filter_map(|(i, c)| self.plan.get(&c.name).map(|d| (i, c.name.as_str(), d)))
            .collect();

        let mut output = TargetRows::new(self.schema.len());

        for row in &source.rows {
            for &(col_idx, column, directive) in &mapped {
                let Some(value) = row.get(col_idx) else {
                    continue;
                };
                if value.is_null() {
                    continue;
                }

                let Some(value) = self.preprocess(value, column, row.index, sink) else {
                    continue;
                };

                self.apply(directive, &value, column, row.index, &mut output, sink);
            }
        }

        let mut table = Table::with_column_names(self.schema.column_names());
        for (index, cells) in output.rows {
            table.push_row(Row::new(cells, index));
        }

        tracing::info!(rows = table.row_count(), "Data transformed");
        table
    }

    /// Bring dates from a `datetime_*` source column into `DD-MM-YYYY` text
    fn preprocess<'v>(
        &self,
        value: &'v CellValue,
        column: &str,
        row: usize,
        sink: &mut dyn DiagnosticSink,
    ) -> Option<Cow<'v, CellValue>> {
        let Some(pattern) = self.source_types.get(column).and_then(|t| t.date_pattern()) else {
            return Some(Cow::Borrowed(value));
        };

        let date = match value {
            CellValue::Date(d) => Some(*d),
            CellValue::String(s) => pattern.parse(s),
            _ => None,
        };

        match date {
            Some(d) => Some(Cow::Owned(CellValue::text(
                d.format(CANONICAL_DATE_FORMAT).to_string(),
            ))),
            None => {
                sink.record(Diagnostic::DateReformatFailed {
                    column: column.to_string(),
                    row,
                    value: value.display().into_owned(),
                    pattern: pattern.to_string(),
                });
                None
            }
        }
    }

    fn apply(
        &self,
        directive: &Directive,
        value: &CellValue,
        column: &str,
        row: usize,
        output: &mut TargetRows,
        sink: &mut dyn DiagnosticSink,
    ) {
        match directive {
            Directive::Discard => {
                sink.record(Diagnostic::ValueDiscarded {
                    column: column.to_string(),
                    row,
                });
            }
            Directive::Calc { calc, target } => {
                tracing::trace!(calc = %calc, column, row, "Calculating value");
                let computed = self
                    .calc
                    .compute(calc, value, sink)
                    .unwrap_or(CellValue::Null);
                self.write(target, &computed, row, output, sink);
            }
            Directive::Split { separator, targets } => {
                let text = value.display();
                for (fragment, target) in text.split(separator.as_str()).zip(targets) {
                    self.write(target, &CellValue::from(fragment), row, output, sink);
                }
            }
            Directive::Move(target) => {
                self.write(target, value, row, output, sink);
            }
        }
    }

    /// Postprocess against the target's type and store at (row, target)
    fn write(
        &self,
        target: &str,
        value: &CellValue,
        row: usize,
        output: &mut TargetRows,
        sink: &mut dyn DiagnosticSink,
    ) {
        // Targets were checked against the schema when the plan was compiled
        let (Some(position), Some(target_type)) =
            (self.schema.position(target), self.schema.get(target))
        else {
            return;
        };

        let processed = postprocess(value, target_type);
        if processed.is_none() && !value.is_null() {
            sink.record(Diagnostic::PostprocessRejected {
                column: target.to_string(),
                row,
                value: value.display().into_owned(),
                rule: postprocess::rule_name(target_type).to_string(),
            });
        }

        output.set(row, position, processed.unwrap_or(CellValue::Null));
    }
}

/// Output rows keyed by source row index, created on first write
struct TargetRows {
    width: usize,
    rows: IndexMap<usize, Vec<CellValue>>,
}

impl TargetRows {
    fn new(width: usize) -> Self {
        Self {
            width,
            rows: IndexMap::new(),
        }
    }

    fn set(&mut self, row: usize, position: usize, value: CellValue) {
        let width = self.width;
        let cells = self
            .rows
            .entry(row)
            .or_insert_with(|| vec![CellValue::Null; width]);
        cells[position] = value;
    }
}
