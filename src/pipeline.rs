//! Extract, coerce, merge and transform, in that order
//!
//! ```text
//! discover_sources -> read -> TypeCoercer -> merge_tables -> TransformEngine
//! ```
//!
//! A source that cannot be read is reported and skipped. The run only fails
//! when nothing could be read or the repair policy gives up.

use std::fs;
use std::path::{Path, PathBuf};

use crate::coerce::{RepairPolicy, TypeCoercer};
use crate::config::CompiledConfig;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::error::{PipelineError, Result};
use crate::merge::{merge_tables, MergeOptions};
use crate::model::Table;
use crate::parser::{ReadOptions, ReaderFactory};
use crate::stats::RunStats;
use crate::transform::{CalcLibrary, TransformEngine};

/// Supported files directly inside `dir`: CSV first, then XML, JSON and
/// spreadsheets, each group sorted by file name
pub fn discover_sources(dir: &Path, readers: &ReaderFactory) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|source| PipelineError::SourceDirectory {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut sources: Vec<(usize, PathBuf)> = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|source| PipelineError::SourceDirectory {
                path: dir.to_path_buf(),
                source,
            })?
            .path();
        if !path.is_file() {
            continue;
        }
        if let Some(rank) = readers.rank(&path) {
            sources.push((rank, path));
        }
    }

    if sources.is_empty() {
        return Err(PipelineError::EmptySource(format!(
            "no CSV, XML, JSON or Excel file in {}",
            dir.display()
        )));
    }

    sources.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.file_name().cmp(&b.1.file_name())));
    Ok(sources.into_iter().map(|(_, path)| path).collect())
}

/// Result of a run: the target table and the counts gathered on the way
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub table: Table,
    /// `target_bytes` stays zero until the table is written
    pub stats: RunStats,
}

/// One configured ETL run
pub struct Pipeline<'a> {
    config: &'a CompiledConfig,
    readers: ReaderFactory,
    read_options: ReadOptions,
    merge_options: MergeOptions,
    calc: CalcLibrary,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a CompiledConfig) -> Self {
        Self {
            config,
            readers: ReaderFactory::new(),
            read_options: ReadOptions::default(),
            merge_options: MergeOptions::default(),
            calc: CalcLibrary::new(),
        }
    }

    pub fn with_read_options(mut self, options: ReadOptions) -> Self {
        self.read_options = options;
        self
    }

    pub fn with_merge_options(mut self, options: MergeOptions) -> Self {
        self.merge_options = options;
        self
    }

    /// Replace the calculation library, e.g. to pin the reference date
    pub fn with_calc_library(mut self, calc: CalcLibrary) -> Self {
        self.calc = calc;
        self
    }

    /// Process every supported file in `dir`
    pub fn run(
        &self,
        dir: &Path,
        policy: &mut dyn RepairPolicy,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<PipelineOutput> {
        let sources = discover_sources(dir, &self.readers)?;
        self.run_sources(&sources, policy, sink)
    }

    /// Process the given files in order
    pub fn run_sources(
        &self,
        sources: &[PathBuf],
        policy: &mut dyn RepairPolicy,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<PipelineOutput> {
        let mut stats = RunStats::default();
        let mut tables = Vec::with_capacity(sources.len());

        for path in sources {
            let file = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            tracing::info!(file = %file, "Reading file");

            let bytes = match fs::metadata(path) {
                Ok(metadata) => metadata.len(),
                Err(e) => {
                    sink.record(Diagnostic::SourceUnavailable {
                        file,
                        reason: format!("cannot determine file size: {}", e),
                    });
                    continue;
                }
            };

            let table = match self.readers.read(path, &self.read_options) {
                Ok(table) => table,
                Err(e) => {
                    sink.record(Diagnostic::SourceUnavailable {
                        file,
                        reason: format!("{:#}", e),
                    });
                    continue;
                }
            };

            stats.source_rows += table.row_count();
            stats.source_bytes += bytes;
            sink.record(Diagnostic::SourceLoaded {
                file: file.clone(),
                rows: table.row_count(),
                bytes,
            });

            let table =
                TypeCoercer::new(&mut *policy).coerce(table, &file, &self.config.types, sink)?;
            tables.push(table);
        }

        if tables.is_empty() {
            return Err(PipelineError::EmptySource(format!(
                "none of the {} source files could be read",
                sources.len()
            )));
        }

        let merged = merge_tables(tables, self.merge_options, sink)?;
        tracing::info!(rows = merged.row_count(), "Data combined");

        let engine = TransformEngine::new(
            &self.config.schema,
            &self.config.plan,
            &self.config.types,
            &self.calc,
        );
        let table = engine.transform(&merged, sink);
        stats.target_rows = table.row_count();

        Ok(PipelineOutput { table, stats })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coerce::{AutoNull, AutoSkip, FailFast};
    use crate::config::FormatConfig;
    use crate::diagnostics::DiagnosticLog;
    use crate::model::CellValue;
    use chrono::NaiveDate;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    const DOCUMENT: &str = r#"{
        "column_types": { "age": "int", "birthday": "datetime_DMY_." },
        "column_mapping": {
            "name": "§SPLIT§ §first_name§last_name",
            "birthday": "§CALC§AGE§age",
            "age": "§DISCARD",
            "mail": "mail"
        },
        "target_frame_columns": {
            "first_name": "str", "last_name": "str", "age": "int", "mail": "mail"
        }
    }"#;

    fn compiled() -> CompiledConfig {
        FormatConfig::parse(DOCUMENT).unwrap().compile().unwrap()
    }

    fn write_file(dir: &TempDir, name: &str, content: &str) {
        let mut file = File::create(dir.path().join(name)).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    fn source_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        write_file(
            &dir,
            "members.csv",
            "name;birthday;age;mail\n\
             Leon Becker;15.06.1990;34;leon@example.com\n\
             Anna Roth;01.01.2000;abc;not-a-mail\n",
        );
        write_file(
            &dir,
            "extra.json",
            r#"[{"name": "Mia Klein", "birthday": "20.02.1985", "age": 39, "mail": "mia@example.org"}]"#,
        );
        write_file(&dir, "notes.txt", "ignored");
        dir
    }

    fn pipeline(config: &CompiledConfig) -> Pipeline<'_> {
        Pipeline::new(config)
            .with_calc_library(CalcLibrary::with_today(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()))
    }

    #[test]
    fn test_discover_orders_by_format_then_name() {
        let dir = TempDir::new().unwrap();
        for name in ["b.json", "a.json", "z.csv", "m.xml", "readme.md"] {
            write_file(&dir, name, "");
        }
        fs::create_dir(dir.path().join("nested.csv")).unwrap();

        let found = discover_sources(dir.path(), &ReaderFactory::new()).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["z.csv", "m.xml", "a.json", "b.json"]);
    }

    #[test]
    fn test_discover_without_sources() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "readme.md", "");
        assert!(matches!(
            discover_sources(dir.path(), &ReaderFactory::new()),
            Err(PipelineError::EmptySource(_))
        ));
        assert!(matches!(
            discover_sources(&dir.path().join("missing"), &ReaderFactory::new()),
            Err(PipelineError::SourceDirectory { .. })
        ));
    }

    #[test]
    fn test_run_with_skip_policy() {
        let dir = source_dir();
        let config = compiled();
        let mut log = DiagnosticLog::new();

        let output = pipeline(&config)
            .run(dir.path(), &mut AutoSkip, &mut log)
            .unwrap();

        let table = &output.table;
        let names: Vec<_> = table.column_names().collect();
        assert_eq!(names, vec!["first_name", "last_name", "age", "mail"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.value(0, "first_name"), Some(&CellValue::from("Leon")));
        assert_eq!(table.value(0, "last_name"), Some(&CellValue::from("Becker")));
        assert_eq!(table.value(0, "age"), Some(&CellValue::Int(34)));
        assert_eq!(table.value(1, "first_name"), Some(&CellValue::from("Mia")));
        assert_eq!(table.value(1, "age"), Some(&CellValue::Int(39)));
        assert_eq!(
            table.value(1, "mail"),
            Some(&CellValue::from("mia@example.org"))
        );

        assert_eq!(output.stats.source_rows, 3);
        assert_eq!(output.stats.target_rows, 2);
        assert!(output.stats.source_bytes > 0);
        assert!(log
            .iter()
            .any(|d| matches!(d, Diagnostic::RowRemoved { row: 1, .. })));
    }

    #[test]
    fn test_run_with_null_policy_keeps_row() {
        let dir = source_dir();
        let config = compiled();
        let mut log = DiagnosticLog::new();

        let output = pipeline(&config)
            .run(dir.path(), &mut AutoNull, &mut log)
            .unwrap();

        assert_eq!(output.table.row_count(), 3);
        assert_eq!(output.table.value(1, "first_name"), Some(&CellValue::from("Anna")));
        // rejected by the mail rule
        assert_eq!(output.table.value(1, "mail"), Some(&CellValue::Null));
        assert!(log
            .iter()
            .any(|d| matches!(d, Diagnostic::PostprocessRejected { row: 1, .. })));
    }

    #[test]
    fn test_run_fail_fast_aborts() {
        let dir = source_dir();
        let config = compiled();
        let mut log = DiagnosticLog::new();

        let result = pipeline(&config).run(dir.path(), &mut FailFast, &mut log);
        assert!(matches!(
            result,
            Err(PipelineError::CellTypeMismatch { ref column, .. }) if column == "age"
        ));
    }

    #[test]
    fn test_unreadable_source_is_skipped() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "broken.json", "{ not json");
        write_file(&dir, "good.csv", "name;mail\nLeon Becker;leon@example.com\n");
        let config = compiled();
        let mut log = DiagnosticLog::new();

        let output = pipeline(&config)
            .run(dir.path(), &mut AutoSkip, &mut log)
            .unwrap();

        assert_eq!(output.table.row_count(), 1);
        assert!(log.iter().any(
            |d| matches!(d, Diagnostic::SourceUnavailable { file, .. } if file == "broken.json")
        ));
    }

    #[test]
    fn test_vanished_source_is_reported() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "good.csv", "name;mail\nLeon Becker;leon@example.com\n");
        let sources = vec![dir.path().join("gone.csv"), dir.path().join("good.csv")];
        let config = compiled();
        let mut log = DiagnosticLog::new();

        let output = pipeline(&config)
            .run_sources(&sources, &mut AutoSkip, &mut log)
            .unwrap();

        assert_eq!(output.stats.source_rows, 1);
        assert_eq!(
            output.stats.source_bytes,
            fs::metadata(dir.path().join("good.csv")).unwrap().len()
        );
        assert!(log.iter().any(|d| matches!(
            d,
            Diagnostic::SourceUnavailable { file, reason }
                if file == "gone.csv" && reason.contains("file size")
        )));
    }

    #[test]
    fn test_every_source_unreadable() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "broken.json", "{ not json");
        let config = compiled();
        let mut log = DiagnosticLog::new();

        let result = pipeline(&config).run(dir.path(), &mut AutoSkip, &mut log);
        assert!(matches!(result, Err(PipelineError::EmptySource(_))));
    }
}
