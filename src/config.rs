//! Configuration handling for recast
//!
//! The format document is JSON; command-line flags override it.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::coerce::repair::{
    AutoNull, AutoSkip, ConsoleChannel, FailFast, InteractiveRepair, RepairPolicy,
};
use crate::error::ConfigError;
use crate::model::{TargetSchema, TypeDeclaration};
use crate::transform::MappingPlan;

/// Output format for the transformed table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
    Xml,
    /// Table inside a SQLite database file
    #[serde(alias = "sql")]
    Sqlite,
}

impl OutputFormat {
    /// Format implied by a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        ext.parse().ok()
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
            OutputFormat::Xml => "xml",
            OutputFormat::Sqlite => "db",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            "xml" => Ok(OutputFormat::Xml),
            "sqlite" | "sqlite3" | "db" | "sql" => Ok(OutputFormat::Sqlite),
            _ => Err(ConfigError::UnknownOutputFormat(s.to_string())),
        }
    }
}

/// How cells that fail their declared type are resolved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PolicyKind {
    /// Ask the operator on the console
    #[default]
    Interactive,
    /// Remove the offending row
    Skip,
    /// Set the offending cell to null
    Null,
    /// Abort the run
    Fail,
}

impl PolicyKind {
    /// Build the repair policy; interactive repair talks to stdin/stdout
    pub fn build(self) -> Box<dyn RepairPolicy> {
        match self {
            PolicyKind::Interactive => Box::new(InteractiveRepair::new(ConsoleChannel::new())),
            PolicyKind::Skip => Box::new(AutoSkip),
            PolicyKind::Null => Box::new(AutoNull),
            PolicyKind::Fail => Box::new(FailFast),
        }
    }
}

impl std::str::FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "interactive" => Ok(PolicyKind::Interactive),
            "skip" => Ok(PolicyKind::Skip),
            "null" => Ok(PolicyKind::Null),
            "fail" => Ok(PolicyKind::Fail),
            _ => Err(format!("Unknown repair policy: {}", s)),
        }
    }
}

/// `output` section of the format document; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSection {
    #[serde(default)]
    pub format: Option<OutputFormat>,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub table_name: Option<String>,
}

/// Resolved sink settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub path: PathBuf,
    /// Table name for SQL output
    pub table_name: String,
}

impl OutputConfig {
    pub const DEFAULT_TABLE_NAME: &'static str = "records";

    /// Create an output config; the format follows the path's extension, CSV otherwise
    pub fn new(path: PathBuf) -> Self {
        let format = OutputFormat::from_path(&path).unwrap_or_default();
        Self {
            format,
            path,
            table_name: Self::DEFAULT_TABLE_NAME.to_string(),
        }
    }

    /// Set the output format explicitly
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the SQL table name
    pub fn with_table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = name.into();
        self
    }

    /// Combine command-line values with the document's `output` section.
    ///
    /// Flags win over the document; the format falls back to the path's extension.
    pub fn resolve(
        path: Option<PathBuf>,
        format: Option<OutputFormat>,
        table_name: Option<String>,
        section: Option<&OutputSection>,
    ) -> Result<Self, ConfigError> {
        let section = section.cloned().unwrap_or_default();
        let path = path
            .or(section.path)
            .ok_or(ConfigError::MissingOutputPath)?;

        let mut config = OutputConfig::new(path);
        if let Some(format) = format.or(section.format) {
            config = config.with_format(format);
        }
        if let Some(name) = table_name.or(section.table_name) {
            config = config.with_table_name(name);
        }
        Ok(config)
    }
}

fn default_delimiter() -> char {
    ';'
}

/// The format document: source types, mapping directives and the target schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatConfig {
    /// Declared type tag per source column
    pub column_types: IndexMap<String, String>,
    /// Directive per source column
    pub column_mapping: IndexMap<String, String>,
    /// Target column name to target type tag, in output order
    pub target_frame_columns: IndexMap<String, String>,
    /// Remove identical rows after merging
    #[serde(default)]
    pub drop_duplicates: bool,
    #[serde(default = "default_delimiter")]
    pub csv_delimiter: char,
    #[serde(default)]
    pub output: Option<OutputSection>,
}

/// Typed view of a [`FormatConfig`], validated before any source is read
#[derive(Debug, Clone)]
pub struct CompiledConfig {
    pub types: TypeDeclaration,
    pub schema: TargetSchema,
    pub plan: MappingPlan,
}

impl FormatConfig {
    /// Read and parse a format document
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Enable duplicate removal after merging
    pub fn with_drop_duplicates(mut self, drop: bool) -> Self {
        self.drop_duplicates = drop;
        self
    }

    /// Set the CSV field delimiter
    pub fn with_csv_delimiter(mut self, delimiter: char) -> Self {
        self.csv_delimiter = delimiter;
        self
    }

    /// The delimiter as the single byte the CSV reader needs
    pub fn delimiter_byte(&self) -> Result<u8, ConfigError> {
        u8::try_from(self.csv_delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or(ConfigError::InvalidDelimiter(self.csv_delimiter))
    }

    /// Parse type tags and directives.
    ///
    /// Fails on an empty target schema, a malformed directive or a directive
    /// routing into a column the target schema does not declare.
    pub fn compile(&self) -> Result<CompiledConfig, ConfigError> {
        let schema = TargetSchema::from_tags(&self.target_frame_columns);
        if schema.is_empty() {
            return Err(ConfigError::EmptyTargetSchema);
        }

        let types = TypeDeclaration::from_tags(&self.column_types);
        let plan = MappingPlan::compile(&self.column_mapping, &schema)?;

        Ok(CompiledConfig {
            types,
            schema,
            plan,
        })
    }
}
