//! Diagnostic records for recoverable pipeline events
//!
//! Every stage reports what it did through a [`DiagnosticSink`] owned by the
//! pipeline invocation. [`TracingSink`] forwards events to `tracing`;
//! [`DiagnosticLog`] keeps them in memory.

use std::fmt;

use serde::Serialize;

/// A recoverable event with enough context to reproduce the decision
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Diagnostic {
    SourceLoaded {
        file: String,
        rows: usize,
        bytes: u64,
    },
    SourceUnavailable {
        file: String,
        reason: String,
    },
    UnknownType {
        file: String,
        column: String,
        declared: String,
    },
    CellMismatch {
        file: String,
        column: String,
        row: usize,
        value: String,
        expected: String,
    },
    RowRemoved {
        file: String,
        row: usize,
    },
    ValueReplaced {
        file: String,
        column: String,
        row: usize,
        value: String,
    },
    ValueNulled {
        file: String,
        column: String,
        row: usize,
    },
    DuplicatesDropped {
        count: usize,
    },
    DateReformatFailed {
        column: String,
        row: usize,
        value: String,
        pattern: String,
    },
    CalcFailed {
        calc: String,
        value: String,
        reason: String,
    },
    PostprocessRejected {
        column: String,
        row: usize,
        value: String,
        rule: String,
    },
    ValueDiscarded {
        column: String,
        row: usize,
    },
}

impl Diagnostic {
    /// True for events an operator should see, not just the log
    pub fn is_notable(&self) -> bool {
        !matches!(
            self,
            Diagnostic::ValueDiscarded { .. } | Diagnostic::SourceLoaded { .. }
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::SourceLoaded { file, rows, bytes } => {
                write!(f, "Read file {} ({} rows, {} bytes)", file, rows, bytes)
            }
            Diagnostic::SourceUnavailable { file, reason } => {
                write!(f, "Could not read file {}: {}", file, reason)
            }
            Diagnostic::UnknownType {
                file,
                column,
                declared,
            } => write!(
                f,
                "Unknown data type '{}' for column {} in file {}",
                declared, column, file
            ),
            Diagnostic::CellMismatch {
                file,
                column,
                row,
                value,
                expected,
            } => write!(
                f,
                "Value '{}' in column {} at row {} in file {} does not match expected type {}",
                value, column, row, file, expected
            ),
            Diagnostic::RowRemoved { file, row } => {
                write!(f, "Row {} in file {} removed", row, file)
            }
            Diagnostic::ValueReplaced {
                file,
                column,
                row,
                value,
            } => write!(
                f,
                "Value '{}' inserted into column {} at row {} in file {}",
                value, column, row, file
            ),
            Diagnostic::ValueNulled { file, column, row } => write!(
                f,
                "Value in column {} at row {} in file {} set to null",
                column, row, file
            ),
            Diagnostic::DuplicatesDropped { count } => {
                write!(f, "Dropped {} duplicate rows", count)
            }
            Diagnostic::DateReformatFailed {
                column,
                row,
                value,
                pattern,
            } => write!(
                f,
                "Error formatting date '{}' in column {} at row {} with source format {}",
                value, column, row, pattern
            ),
            Diagnostic::CalcFailed {
                calc,
                value,
                reason,
            } => write!(f, "Error calculating {} for value '{}': {}", calc, value, reason),
            Diagnostic::PostprocessRejected {
                column,
                row,
                value,
                rule,
            } => write!(
                f,
                "Value '{}' rejected by {} rule for column {} at row {}",
                value, rule, column, row
            ),
            Diagnostic::ValueDiscarded { column, row } => {
                write!(f, "Discarded value in column {} at row {}", column, row)
            }
        }
    }
}

/// Receiver of diagnostic records
pub trait DiagnosticSink {
    fn record(&mut self, event: Diagnostic);
}

/// Forwards diagnostics to `tracing`
#[derive(Debug, Default)]
pub struct TracingSink;

impl TracingSink {
    pub fn new() -> Self {
        Self
    }
}

impl DiagnosticSink for TracingSink {
    fn record(&mut self, event: Diagnostic) {
        match &event {
            Diagnostic::SourceLoaded { .. } | Diagnostic::DuplicatesDropped { .. } => {
                tracing::info!("{}", event)
            }
            Diagnostic::ValueDiscarded { .. } | Diagnostic::ValueReplaced { .. } => {
                tracing::debug!("{}", event)
            }
            Diagnostic::SourceUnavailable { .. } => tracing::error!("{}", event),
            _ => tracing::warn!("{}", event),
        }
    }
}

/// Collects diagnostics in memory
#[derive(Debug, Default, Clone)]
pub struct DiagnosticLog {
    pub events: Vec<Diagnostic>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.events.iter()
    }
}

impl DiagnosticSink for DiagnosticLog {
    fn record(&mut self, event: Diagnostic) {
        self.events.push(event);
    }
}

/// Forwards to `tracing` and keeps a copy, for runs that want both
#[derive(Debug, Default)]
pub struct RecordingSink {
    tracing: TracingSink,
    pub log: DiagnosticLog,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DiagnosticSink for RecordingSink {
    fn record(&mut self, event: Diagnostic) {
        self.tracing.record(event.clone());
        self.log.record(event);
    }
}
