//! recast - reshape tabular files into a target schema

use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use recast::config::{FormatConfig, OutputConfig, OutputFormat, PolicyKind};
use recast::diagnostics::TracingSink;
use recast::logging::{init_logging, LogConfig};
use recast::merge::MergeOptions;
use recast::output::WriterFactory;
use recast::parser::ReadOptions;
use recast::pipeline::Pipeline;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliOutputFormat {
    Csv,
    Json,
    Xml,
    /// SQLite database file
    #[value(alias = "sql")]
    Sqlite,
}

impl From<CliOutputFormat> for OutputFormat {
    fn from(f: CliOutputFormat) -> Self {
        match f {
            CliOutputFormat::Csv => OutputFormat::Csv,
            CliOutputFormat::Json => OutputFormat::Json,
            CliOutputFormat::Xml => OutputFormat::Xml,
            CliOutputFormat::Sqlite => OutputFormat::Sqlite,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliPolicy {
    /// Ask on the console for every bad cell
    Interactive,
    /// Remove rows with bad cells
    Skip,
    /// Set bad cells to null
    Null,
    /// Stop at the first bad cell
    Fail,
}

impl From<CliPolicy> for PolicyKind {
    fn from(p: CliPolicy) -> Self {
        match p {
            CliPolicy::Interactive => PolicyKind::Interactive,
            CliPolicy::Skip => PolicyKind::Skip,
            CliPolicy::Null => PolicyKind::Null,
            CliPolicy::Fail => PolicyKind::Fail,
        }
    }
}

/// Reshape CSV, XML, JSON and Excel files into one target table
#[derive(Parser, Debug)]
#[command(name = "recast")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Folder containing the source files
    source_dir: PathBuf,

    /// Format document (column types, mapping directives, target columns)
    #[arg(short, long)]
    config: PathBuf,

    /// Output file (overrides the document)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format; defaults to the output file's extension
    #[arg(short, long, value_enum)]
    format: Option<CliOutputFormat>,

    /// Table name for SQLite output
    #[arg(long)]
    table_name: Option<String>,

    /// How to resolve cells that fail their declared type
    #[arg(long, value_enum, default_value = "interactive")]
    policy: CliPolicy,

    /// Remove identical rows after merging
    #[arg(long)]
    dedupe: bool,

    /// CSV field delimiter for source files
    #[arg(long)]
    delimiter: Option<char>,

    /// Also write the statistics table to this file
    #[arg(long)]
    stats_file: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Append the full log to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let log_config = LogConfig::from_verbosity(cli.verbose).with_log_file(cli.log_file.clone());
    init_logging(&log_config).context("Failed to open log file")?;

    let mut format_config = FormatConfig::load(&cli.config)?;
    if cli.dedupe {
        format_config = format_config.with_drop_duplicates(true);
    }
    if let Some(delimiter) = cli.delimiter {
        format_config = format_config.with_csv_delimiter(delimiter);
    }

    // Everything that can be wrong with the configuration fails here
    let compiled = format_config.compile()?;
    let output_config = OutputConfig::resolve(
        cli.output,
        cli.format.map(Into::into),
        cli.table_name,
        format_config.output.as_ref(),
    )?;
    let read_options = ReadOptions {
        csv_delimiter: format_config.delimiter_byte()?,
        ..Default::default()
    };

    let pipeline = Pipeline::new(&compiled)
        .with_read_options(read_options)
        .with_merge_options(MergeOptions {
            drop_duplicates: format_config.drop_duplicates,
        });

    let mut policy = PolicyKind::from(cli.policy).build();
    let mut sink = TracingSink::new();
    let mut output = pipeline.run(&cli.source_dir, policy.as_mut(), &mut sink)?;

    let writer = WriterFactory::create(
        output_config.format,
        &compiled.schema,
        &output_config.table_name,
    );
    output.stats.target_bytes = writer
        .write(&output.table, &output_config.path)
        .with_context(|| format!("Failed to save data to {}", output_config.path.display()))?;
    tracing::info!(
        path = %output_config.path.display(),
        rows = output.stats.target_rows,
        "Data saved"
    );

    output.stats.render(&mut io::stdout().lock())?;

    if let Some(path) = cli.stats_file {
        fs::write(&path, output.stats.to_table())
            .with_context(|| format!("Failed to write statistics to {}", path.display()))?;
    }

    Ok(())
}
