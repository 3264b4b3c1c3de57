//! recast - reshape heterogeneous tabular files into one target schema
//!
//! Reads every CSV, XML, JSON and Excel file in a folder, checks cells against
//! declared types (asking an operator, or a policy, how to repair bad ones),
//! merges the tables and re-projects them with per-column mapping directives.

pub mod coerce;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod logging;
pub mod merge;
pub mod model;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod stats;
pub mod transform;

pub use config::{FormatConfig, OutputConfig, OutputFormat, PolicyKind};
pub use error::{ConfigError, PipelineError};
pub use model::Table;
pub use pipeline::{Pipeline, PipelineOutput};
