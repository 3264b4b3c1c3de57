//! Mapping directives
//!
//! Grammar, with `§` as field delimiter:
//!
//! ```text
//! §DISCARD
//! §CALC§<calc_type>§<target>
//! §SPLIT§<separator>§<target_1>§<target_2>...
//! <target>
//! ```

use indexmap::IndexMap;

use crate::error::ConfigError;
use crate::model::TargetSchema;

/// Field delimiter of the directive grammar
pub const DELIMITER: char = '§';

/// Parsed instruction for one source column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Write the value to a target column unchanged
    Move(String),
    /// Drop the value
    Discard,
    /// Compute a derived value into a target column
    Calc { calc: String, target: String },
    /// Split on `separator`, fragments go to `targets` by position
    Split {
        separator: String,
        targets: Vec<String>,
    },
}

impl Directive {
    /// Parse a directive string for `column`
    pub fn parse(column: &str, directive: &str) -> Result<Self, ConfigError> {
        let malformed = |reason: &str| ConfigError::MalformedDirective {
            column: column.to_string(),
            directive: directive.to_string(),
            reason: reason.to_string(),
        };

        let Some(body) = directive.strip_prefix(DELIMITER) else {
            if directive.is_empty() {
                return Err(malformed("empty target column name"));
            }
            return Ok(Directive::Move(directive.to_string()));
        };

        let fields: Vec<&str> = body.split(DELIMITER).collect();
        match fields[0] {
            "DISCARD" => {
                if fields.len() > 1 {
                    return Err(malformed("DISCARD takes no arguments"));
                }
                Ok(Directive::Discard)
            }
            "CALC" => match fields.as_slice() {
                [_, calc, target] if !calc.is_empty() && !target.is_empty() => {
                    Ok(Directive::Calc {
                        calc: calc.to_string(),
                        target: target.to_string(),
                    })
                }
                _ => Err(malformed("expected §CALC§<calc_type>§<target>")),
            },
            "SPLIT" => {
                if fields.len() < 3 {
                    return Err(malformed(
                        "expected §SPLIT§<separator>§<target_1>[§<target_n>...]",
                    ));
                }
                let separator = fields[1];
                if separator.is_empty() {
                    return Err(malformed("empty separator"));
                }
                let targets: Vec<String> = fields[2..].iter().map(|t| t.to_string()).collect();
                if targets.iter().any(String::is_empty) {
                    return Err(malformed("empty target column name"));
                }
                Ok(Directive::Split {
                    separator: separator.to_string(),
                    targets,
                })
            }
            // Anything else is read literally as a column name
            _ => Ok(Directive::Move(directive.to_string())),
        }
    }

    /// Target columns this directive writes to
    pub fn targets(&self) -> Vec<&str> {
        match self {
            Directive::Move(target) => vec![target.as_str()],
            Directive::Discard => Vec::new(),
            Directive::Calc { target, .. } => vec![target.as_str()],
            Directive::Split { targets, .. } => targets.iter().map(String::as_str).collect(),
        }
    }
}

/// Directives for every mapped source column, checked against a target schema
#[derive(Debug, Clone, Default)]
pub struct MappingPlan {
    directives: IndexMap<String, Directive>,
}

impl MappingPlan {
    /// Parse every directive once and verify each target exists in `schema`
    pub fn compile<'a, I>(mapping: I, schema: &TargetSchema) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let mut directives = IndexMap::new();
        for (column, raw) in mapping {
            let directive = Directive::parse(column, raw)?;
            for target in directive.targets() {
                if !schema.contains(target) {
                    return Err(ConfigError::UndeclaredTarget {
                        column: column.clone(),
                        target: target.to_string(),
                    });
                }
            }
            directives.insert(column.clone(), directive);
        }
        Ok(Self { directives })
    }

    pub fn get(&self, column: &str) -> Option<&Directive> {
        self.directives.get(column)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Directive)> {
        self.directives.iter()
    }

    pub fn len(&self) -> usize {
        self.directives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }
}
