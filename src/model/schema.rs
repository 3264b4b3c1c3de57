//! Column metadata, source type declarations and the target schema

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Column metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name (from header)
    pub name: String,
    /// Column index (0-based position)
    pub index: usize,
}

impl Column {
    /// Create a new column with name and index
    pub fn new(name: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            index,
        }
    }
}

/// Field order of a declared date type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateOrder {
    Ymd,
    Dmy,
    Mdy,
}

impl std::str::FromStr for DateOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "YMD" => Ok(DateOrder::Ymd),
            "DMY" => Ok(DateOrder::Dmy),
            "MDY" => Ok(DateOrder::Mdy),
            _ => Err(format!("Unknown date order: {}", s)),
        }
    }
}

/// Date layout implied by a `datetime_<ORDER>_<SEP>` declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DatePattern {
    pub order: DateOrder,
    pub separator: char,
}

impl DatePattern {
    pub fn new(order: DateOrder, separator: char) -> Self {
        Self { order, separator }
    }

    /// chrono format string, e.g. `%Y.%m.%d` for YMD with `.`
    pub fn format_str(&self) -> String {
        let sep = self.separator;
        match self.order {
            DateOrder::Ymd => format!("%Y{sep}%m{sep}%d"),
            DateOrder::Dmy => format!("%d{sep}%m{sep}%Y"),
            DateOrder::Mdy => format!("%m{sep}%d{sep}%Y"),
        }
    }

    pub fn parse(&self, s: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(s.trim(), &self.format_str()).ok()
    }

    pub fn format(&self, date: NaiveDate) -> String {
        date.format(&self.format_str()).to_string()
    }
}

impl std::fmt::Display for DatePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let order = match self.order {
            DateOrder::Ymd => "YMD",
            DateOrder::Dmy => "DMY",
            DateOrder::Mdy => "MDY",
        };
        write!(f, "datetime_{}_{}", order, self.separator)
    }
}

/// Declared source type of a column
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Int,
    Float,
    Str,
    Bool,
    Date(DatePattern),
    /// A tag this version does not understand; cells are left untouched
    Unknown(String),
}

impl ColumnType {
    /// Parse a type tag; never fails, unrecognized tags become `Unknown`
    pub fn parse(tag: &str) -> Self {
        match tag {
            "int" => ColumnType::Int,
            "float" => ColumnType::Float,
            "str" => ColumnType::Str,
            "bool" => ColumnType::Bool,
            other => parse_datetime_tag(other)
                .map(ColumnType::Date)
                .unwrap_or_else(|| ColumnType::Unknown(other.to_string())),
        }
    }

    pub fn date_pattern(&self) -> Option<DatePattern> {
        match self {
            ColumnType::Date(p) => Some(*p),
            _ => None,
        }
    }
}

fn parse_datetime_tag(tag: &str) -> Option<DatePattern> {
    let rest = tag.strip_prefix("datetime_")?;
    let (order, sep) = rest.split_once('_')?;
    let order: DateOrder = order.parse().ok()?;
    match sep {
        "." => Some(DatePattern::new(order, '.')),
        "-" => Some(DatePattern::new(order, '-')),
        _ => None,
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnType::Int => write!(f, "int"),
            ColumnType::Float => write!(f, "float"),
            ColumnType::Str => write!(f, "str"),
            ColumnType::Bool => write!(f, "bool"),
            ColumnType::Date(p) => write!(f, "{}", p),
            ColumnType::Unknown(tag) => write!(f, "{}", tag),
        }
    }
}

/// Source column name -> declared type. Columns not listed pass through untyped.
#[derive(Debug, Clone, Default)]
pub struct TypeDeclaration {
    types: IndexMap<String, ColumnType>,
}

impl TypeDeclaration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tags<'a, I>(tags: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let types = tags
            .into_iter()
            .map(|(col, tag)| (col.clone(), ColumnType::parse(tag)))
            .collect();
        Self { types }
    }

    pub fn with(mut self, column: impl Into<String>, column_type: ColumnType) -> Self {
        self.types.insert(column.into(), column_type);
        self
    }

    pub fn get(&self, column: &str) -> Option<&ColumnType> {
        self.types.get(column)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ColumnType)> {
        self.types.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Destination type tag; drives postprocessing of values routed into the column
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TargetType {
    Int,
    Float,
    Str,
    Bool,
    Datetime,
    Gender,
    Mail,
    Other(String),
}

impl TargetType {
    pub fn parse(tag: &str) -> Self {
        match tag {
            "int" => TargetType::Int,
            "float" => TargetType::Float,
            "str" => TargetType::Str,
            "bool" => TargetType::Bool,
            "datetime" => TargetType::Datetime,
            "gender" => TargetType::Gender,
            "mail" => TargetType::Mail,
            other => TargetType::Other(other.to_string()),
        }
    }

    /// SQL column type used by the relational writer
    pub fn sql_type(&self) -> &'static str {
        match self {
            TargetType::Int => "INTEGER",
            TargetType::Float => "REAL",
            TargetType::Bool => "INTEGER",
            _ => "TEXT",
        }
    }
}

impl std::fmt::Display for TargetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetType::Int => write!(f, "int"),
            TargetType::Float => write!(f, "float"),
            TargetType::Str => write!(f, "str"),
            TargetType::Bool => write!(f, "bool"),
            TargetType::Datetime => write!(f, "datetime"),
            TargetType::Gender => write!(f, "gender"),
            TargetType::Mail => write!(f, "mail"),
            TargetType::Other(tag) => write!(f, "{}", tag),
        }
    }
}

/// Ordered target column name -> target type
#[derive(Debug, Clone, Default)]
pub struct TargetSchema {
    columns: IndexMap<String, TargetType>,
}

impl TargetSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tags<'a, I>(tags: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let columns = tags
            .into_iter()
            .map(|(col, tag)| (col.clone(), TargetType::parse(tag)))
            .collect();
        Self { columns }
    }

    pub fn with(mut self, column: impl Into<String>, target_type: TargetType) -> Self {
        self.columns.insert(column.into(), target_type);
        self
    }

    pub fn get(&self, column: &str) -> Option<&TargetType> {
        self.columns.get(column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    /// Position of a column in output order
    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.get_index_of(column)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TargetType)> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_column_types() {
        assert_eq!(ColumnType::parse("int"), ColumnType::Int);
        assert_eq!(
            ColumnType::parse("datetime_DMY_."),
            ColumnType::Date(DatePattern::new(DateOrder::Dmy, '.'))
        );
        assert_eq!(
            ColumnType::parse("datetime_YMD_/"),
            ColumnType::Unknown("datetime_YMD_/".into())
        );
        assert_eq!(
            ColumnType::parse("decimal"),
            ColumnType::Unknown("decimal".into())
        );
    }

    #[test]
    fn test_date_pattern_round_trip() {
        let samples = [
            ("datetime_YMD_.", "1987.04.23"),
            ("datetime_YMD_-", "1987-04-23"),
            ("datetime_DMY_.", "23.04.1987"),
            ("datetime_DMY_-", "23-04-1987"),
            ("datetime_MDY_.", "04.23.1987"),
            ("datetime_MDY_-", "04-23-1987"),
        ];
        for (tag, text) in samples {
            let pattern = ColumnType::parse(tag).date_pattern().unwrap();
            let date = pattern.parse(text).unwrap();
            assert_eq!(pattern.format(date), text, "{}", tag);
            assert_eq!(pattern.to_string(), tag);
        }
    }

    #[test]
    fn test_target_schema_keeps_order() {
        let schema = TargetSchema::new()
            .with("last_name", TargetType::Str)
            .with("first_name", TargetType::Str)
            .with("mail", TargetType::Mail);

        let names: Vec<_> = schema.column_names().collect();
        assert_eq!(names, vec!["last_name", "first_name", "mail"]);
        assert_eq!(schema.position("mail"), Some(2));
        assert_eq!(TargetType::parse("gender"), TargetType::Gender);
    }
}
