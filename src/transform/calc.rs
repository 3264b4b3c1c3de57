//! Derived-value functions used by `§CALC` directives

use chrono::{Datelike, Local, NaiveDate};
use rustc_hash::FxHashMap;

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::model::{CellValue, CANONICAL_DATE_FORMAT};

/// A named calculation over one cell value
pub trait CalcFunction: Send + Sync {
    /// Compute the derived value; `today` is the reference date of the run
    fn compute(&self, value: &CellValue, today: NaiveDate) -> Result<CellValue, String>;
}

/// Whole years elapsed since a `DD-MM-YYYY` date
pub struct Age;

impl CalcFunction for Age {
    fn compute(&self, value: &CellValue, today: NaiveDate) -> Result<CellValue, String> {
        let born = match value {
            CellValue::Date(d) => *d,
            CellValue::String(s) => NaiveDate::parse_from_str(s.trim(), CANONICAL_DATE_FORMAT)
                .map_err(|e| e.to_string())?,
            other => return Err(format!("not a date: {}", other)),
        };

        let had_birthday = (today.month(), today.day()) >= (born.month(), born.day());
        let years = today.year() - born.year() - i32::from(!had_birthday);
        Ok(CellValue::Int(i64::from(years)))
    }
}

/// `DD-MM-YYYY` date for someone turning `value` years old today
pub struct Birthdate;

impl CalcFunction for Birthdate {
    fn compute(&self, value: &CellValue, today: NaiveDate) -> Result<CellValue, String> {
        let age: i64 = match value {
            CellValue::Int(i) => *i,
            CellValue::Float(f) if f.fract() == 0.0 => *f as i64,
            CellValue::String(s) => s.trim().parse().map_err(|_| format!("not an age: {}", s))?,
            other => return Err(format!("not an age: {}", other)),
        };

        let year = i64::from(today.year()) - age;
        let year = i32::try_from(year).map_err(|_| format!("age out of range: {}", age))?;
        let born = NaiveDate::from_ymd_opt(year, today.month(), today.day())
            .ok_or_else(|| format!("{:02}-{:02}-{} is not a date", today.day(), today.month(), year))?;
        Ok(CellValue::text(born.format(CANONICAL_DATE_FORMAT).to_string()))
    }
}

/// Registry of calculations, keyed by the name used in directives
pub struct CalcLibrary {
    functions: FxHashMap<String, Box<dyn CalcFunction>>,
    today: NaiveDate,
}

impl Default for CalcLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl CalcLibrary {
    /// Library with the built-in `AGE` and `BIRTHDATE`, dated today
    pub fn new() -> Self {
        Self::with_today(Local::now().date_naive())
    }

    /// Library with a fixed reference date
    pub fn with_today(today: NaiveDate) -> Self {
        let mut library = Self {
            functions: FxHashMap::default(),
            today,
        };
        library.register("AGE", Age);
        library.register("BIRTHDATE", Birthdate);
        library
    }

    pub fn register(&mut self, name: impl Into<String>, function: impl CalcFunction + 'static) {
        self.functions.insert(name.into(), Box::new(function));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Run `calc` on `value`. Null input, unknown names and bad values give `None`.
    pub fn compute(
        &self,
        calc: &str,
        value: &CellValue,
        sink: &mut dyn DiagnosticSink,
    ) -> Option<CellValue> {
        if value.is_null() {
            return None;
        }

        let Some(function) = self.functions.get(calc) else {
            sink.record(Diagnostic::CalcFailed {
                calc: calc.to_string(),
                value: value.display().into_owned(),
                reason: "unknown calculation".to_string(),
            });
            return None;
        };

        match function.compute(value, self.today) {
            Ok(result) => Some(result),
            Err(reason) => {
                sink.record(Diagnostic::CalcFailed {
                    calc: calc.to_string(),
                    value: value.display().into_owned(),
                    reason,
                });
                None
            }
        }
    }
}
