//! Validation and coercion of source columns against declared types
//!
//! Every non-null cell of every declared column is converted to its declared
//! type. A cell that does not convert is handed to a [`RepairPolicy`], which
//! either removes the row, supplies a replacement (retried against the same
//! rule) or empties the cell.

pub mod repair;

use rustc_hash::FxHashSet;

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::error::PipelineError;
use crate::model::{CellValue, ColumnType, Table, TypeDeclaration};

pub use repair::{
    AutoNull, AutoSkip, ConsoleChannel, FailFast, InteractiveRepair, OperatorChannel,
    RepairContext, RepairDecision, RepairPolicy, ScriptedChannel,
};

/// Checks a table against a type declaration
pub struct TypeCoercer<'a> {
    policy: &'a mut dyn RepairPolicy,
}

impl<'a> TypeCoercer<'a> {
    pub fn new(policy: &'a mut dyn RepairPolicy) -> Self {
        Self { policy }
    }

    /// Coerce every declared column of `table`.
    ///
    /// Returns the table with converted cells and without the rows the policy
    /// removed. Only fails when the policy gives up (fail-fast, closed channel).
    pub fn coerce(
        &mut self,
        mut table: Table,
        file: &str,
        declaration: &TypeDeclaration,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<Table, PipelineError> {
        let mut removed: FxHashSet<usize> = FxHashSet::default();

        for (column, column_type) in declaration.iter() {
            let Some(col_idx) = table.column_index(column) else {
                continue;
            };

            if let ColumnType::Unknown(tag) = column_type {
                sink.record(Diagnostic::UnknownType {
                    file: file.to_string(),
                    column: column.clone(),
                    declared: tag.clone(),
                });
                continue;
            }

            let expected = column_type.to_string();

            for row in table.rows.iter_mut() {
                let index = row.index;
                if removed.contains(&index) {
                    continue;
                }
                let Some(cell) = row.cells.get_mut(col_idx) else {
                    continue;
                };
                if cell.is_null() {
                    continue;
                }

                let mut candidate = cell.clone();
                loop {
                    if let Some(converted) = convert(&candidate, column_type) {
                        *cell = converted;
                        break;
                    }

                    let raw = candidate.display().into_owned();
                    sink.record(Diagnostic::CellMismatch {
                        file: file.to_string(),
                        column: column.clone(),
                        row: index,
                        value: raw.clone(),
                        expected: expected.clone(),
                    });

                    let ctx = RepairContext {
                        file,
                        column,
                        row: index,
                        value: &raw,
                        expected: &expected,
                    };
                    match self.policy.decide(&ctx)? {
                        RepairDecision::RemoveRow => {
                            removed.insert(index);
                            sink.record(Diagnostic::RowRemoved {
                                file: file.to_string(),
                                row: index,
                            });
                            break;
                        }
                        RepairDecision::Replace(value) => {
                            sink.record(Diagnostic::ValueReplaced {
                                file: file.to_string(),
                                column: column.clone(),
                                row: index,
                                value: value.clone(),
                            });
                            candidate = CellValue::text(value);
                        }
                        RepairDecision::SetNull => {
                            *cell = CellValue::Null;
                            sink.record(Diagnostic::ValueNulled {
                                file: file.to_string(),
                                column: column.clone(),
                                row: index,
                            });
                            break;
                        }
                    }
                }
            }
        }

        if !removed.is_empty() {
            table.retain_rows(|row| !removed.contains(&row.index));
        }
        Ok(table)
    }
}

/// Convert one value to a declared type, `None` when it does not fit
pub fn convert(value: &CellValue, column_type: &ColumnType) -> Option<CellValue> {
    match column_type {
        ColumnType::Int => to_int(value),
        ColumnType::Float => to_float(value),
        ColumnType::Str => match value {
            CellValue::String(_) => Some(value.clone()),
            other => Some(CellValue::text(other.display().into_owned())),
        },
        ColumnType::Bool => to_bool(value),
        ColumnType::Date(pattern) => match value {
            CellValue::Date(_) => Some(value.clone()),
            CellValue::String(s) => pattern.parse(s).map(CellValue::Date),
            _ => None,
        },
        ColumnType::Unknown(_) => Some(value.clone()),
    }
}

fn to_int(value: &CellValue) -> Option<CellValue> {
    match value {
        CellValue::Int(_) => Some(value.clone()),
        // out-of-range floats would saturate; leave them to the repair policy
        CellValue::Float(f)
            if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 =>
        {
            Some(CellValue::Int(*f as i64))
        }
        CellValue::String(s) => s.trim().parse::<i64>().ok().map(CellValue::Int),
        _ => None,
    }
}

fn to_float(value: &CellValue) -> Option<CellValue> {
    match value {
        CellValue::Float(_) => Some(value.clone()),
        CellValue::Int(i) => Some(CellValue::Float(*i as f64)),
        CellValue::String(s) => s.trim().parse::<f64>().ok().map(CellValue::Float),
        _ => None,
    }
}

fn to_bool(value: &CellValue) -> Option<CellValue> {
    match value {
        CellValue::Bool(_) => Some(value.clone()),
        CellValue::Int(0) => Some(CellValue::Bool(false)),
        CellValue::Int(1) => Some(CellValue::Bool(true)),
        CellValue::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "y" => Some(CellValue::Bool(true)),
            "false" | "0" | "no" | "n" => Some(CellValue::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}
