//! Concatenation of validated source tables

use std::hash::{Hash, Hasher};

use indexmap::IndexSet;
use rustc_hash::{FxHashSet, FxHasher};

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::error::PipelineError;
use crate::model::{CellValue, Row, Table};

/// Merge behavior
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeOptions {
    /// Remove fully identical rows, keeping the first occurrence
    pub drop_duplicates: bool,
}

/// Concatenate tables in the order given.
///
/// Columns are the union of all source columns in order of first appearance;
/// cells a source does not have are null. Rows are renumbered from zero.
pub fn merge_tables(
    tables: Vec<Table>,
    options: MergeOptions,
    sink: &mut dyn DiagnosticSink,
) -> Result<Table, PipelineError> {
    if tables.is_empty() {
        return Err(PipelineError::EmptySource(
            "no data could be combined".to_string(),
        ));
    }

    let names: IndexSet<String> = tables
        .iter()
        .flat_map(|t| t.column_names().map(str::to_string))
        .collect();
    let mut merged = Table::with_column_names(names.iter().cloned());

    for table in tables {
        // Position of each source column in the merged layout
        let positions: Vec<usize> = table
            .columns
            .iter()
            .filter_map(|c| names.get_index_of(&c.name))
            .collect();

        for row in table.rows {
            let mut cells = vec![CellValue::Null; merged.column_count()];
            for (value, &pos) in row.cells.into_iter().zip(&positions) {
                cells[pos] = value;
            }
            merged.add_row(cells);
        }
    }

    if options.drop_duplicates {
        let dropped = drop_duplicates(&mut merged);
        if dropped > 0 {
            sink.record(Diagnostic::DuplicatesDropped { count: dropped });
        }
    }

    Ok(merged)
}

/// Remove rows whose cells equal an earlier row's; returns how many were removed
pub fn drop_duplicates(table: &mut Table) -> usize {
    let before = table.row_count();
    let mut seen: FxHashSet<u64> = FxHashSet::default();
    let mut kept: Vec<Row> = Vec::with_capacity(before);

    for row in table.rows.drain(..) {
        let hash = hash_cells(&row.cells);
        if seen.insert(hash) || !kept.iter().any(|k| k.cells == row.cells) {
            kept.push(row);
        }
    }

    table.rows = kept;
    before - table.row_count()
}

fn hash_cells(cells: &[CellValue]) -> u64 {
    let mut hasher = FxHasher::default();
    cells.hash(&mut hasher);
    hasher.finish()
}
