//! SQLite output: the target table is created, or replaced, inside a database file

use std::path::Path;

use anyhow::{Context, Result};
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteConnectOptions};
use sqlx::query::Query;
use sqlx::{Connection, SqliteConnection};

use crate::model::{CellValue, Table, TargetSchema};

use super::TableWriter;

/// Writes the table into a SQLite database, replacing a table of the same name
pub struct SqliteWriter {
    table_name: String,
    column_types: Vec<(String, &'static str)>,
}

impl SqliteWriter {
    pub fn new(table_name: &str, schema: &TargetSchema) -> Self {
        Self {
            table_name: table_name.to_string(),
            column_types: schema
                .iter()
                .map(|(name, target_type)| (name.clone(), target_type.sql_type()))
                .collect(),
        }
    }

    fn column_type(&self, name: &str) -> &'static str {
        self.column_types
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, sql_type)| *sql_type)
            .unwrap_or("TEXT")
    }

    fn create_statement(&self, table: &Table) -> String {
        let definitions: Vec<String> = table
            .column_names()
            .map(|name| format!("{} {}", quote_identifier(name), self.column_type(name)))
            .collect();
        format!(
            "CREATE TABLE {} ({})",
            quote_identifier(&self.table_name),
            definitions.join(", ")
        )
    }

    fn insert_statement(&self, table: &Table) -> String {
        let columns: Vec<String> = table.column_names().map(quote_identifier).collect();
        let placeholders = vec!["?"; columns.len()].join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_identifier(&self.table_name),
            columns.join(", "),
            placeholders
        )
    }

    async fn store(&self, table: &Table, destination: &Path) -> Result<()> {
        let options = SqliteConnectOptions::new()
            .filename(destination)
            .create_if_missing(true);
        let mut conn = SqliteConnection::connect_with(&options)
            .await
            .with_context(|| format!("Failed to open database: {}", destination.display()))?;

        let mut tx = conn.begin().await.context("Failed to start transaction")?;

        let drop_table = format!("DROP TABLE IF EXISTS {}", quote_identifier(&self.table_name));
        sqlx::query(&drop_table)
            .execute(&mut *tx)
            .await
            .context("Failed to drop existing table")?;
        sqlx::query(&self.create_statement(table))
            .execute(&mut *tx)
            .await
            .context("Failed to create table")?;

        let insert = self.insert_statement(table);
        for row in &table.rows {
            let query = row
                .cells
                .iter()
                .fold(sqlx::query(&insert), |query, cell| bind_cell(query, cell));
            query
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to insert row {}", row.index))?;
        }

        tx.commit().await.context("Failed to commit transaction")?;
        conn.close().await.context("Failed to close database")?;
        Ok(())
    }
}

/// SQLite identifiers are double-quoted; embedded quotes are doubled
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn bind_cell<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    cell: &'q CellValue,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match cell {
        CellValue::Null => query.bind(None::<String>),
        CellValue::Bool(b) => query.bind(*b),
        CellValue::Int(i) => query.bind(*i),
        CellValue::Float(f) if f.is_finite() => query.bind(*f),
        CellValue::Float(_) => query.bind(None::<f64>),
        CellValue::String(s) => query.bind(&**s),
        CellValue::Date(_) => query.bind(cell.display().into_owned()),
    }
}

impl TableWriter for SqliteWriter {
    fn write(&self, table: &Table, destination: &Path) -> Result<u64> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to start database runtime")?;
        runtime.block_on(self.store(table, destination))?;

        let size = std::fs::metadata(destination)
            .with_context(|| format!("Failed to stat file: {}", destination.display()))?
            .len();
        Ok(size)
    }
}
