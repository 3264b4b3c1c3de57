//! Data model for tabular data representation

mod schema;
mod table;

pub use schema::{
    Column, ColumnType, DateOrder, DatePattern, TargetSchema, TargetType, TypeDeclaration,
};
pub use table::{CellValue, Row, Table, CANONICAL_DATE_FORMAT};
