//! Error types for the recast pipeline.
//!
//! - [`ConfigError`] - problems in the configuration document, fatal before processing
//! - [`PipelineError`] - failures that abort a run
//!
//! Recoverable events (a bad cell, an unreadable source, a rejected e-mail) are not
//! errors; they are reported as [`crate::diagnostics::Diagnostic`] records.

use std::path::PathBuf;

use thiserror::Error;

/// Errors in the configuration document or the mapping directives.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Could not read the configuration file.
    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration document is not valid JSON or misses a required key.
    #[error("Invalid configuration document: {0}")]
    Invalid(#[from] serde_json::Error),

    /// A directive string does not follow the directive grammar.
    #[error("Malformed directive '{directive}' for column '{column}': {reason}")]
    MalformedDirective {
        column: String,
        directive: String,
        reason: String,
    },

    /// A directive routes into a column the target schema does not declare.
    #[error("Directive for column '{column}' targets '{target}', which is not a target column")]
    UndeclaredTarget { column: String, target: String },

    /// The target schema has no columns.
    #[error("Target schema declares no columns")]
    EmptyTargetSchema,

    /// CSV delimiters must be a single ASCII character.
    #[error("CSV delimiter '{0}' is not a single-byte character")]
    InvalidDelimiter(char),

    #[error("Unknown output format: {0}")]
    UnknownOutputFormat(String),

    /// Neither the command line nor the document names an output file.
    #[error("No output path given")]
    MissingOutputPath,
}

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The source directory is missing or unreadable.
    #[error("Cannot read source directory {path}: {source}")]
    SourceDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No source produced a table.
    #[error("No source data: {0}")]
    EmptySource(String),

    /// A cell failed its declared type and the repair policy refused to resolve it.
    #[error(
        "Value '{value}' in column '{column}' at row {row} in file '{file}' does not match expected type {expected}"
    )]
    CellTypeMismatch {
        file: String,
        column: String,
        row: usize,
        value: String,
        expected: String,
    },

    /// The operator channel closed while a repair was pending.
    #[error("Operator channel closed: {0}")]
    Operator(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
