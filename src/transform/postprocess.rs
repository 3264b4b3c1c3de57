//! Normalization of values by target column type

use std::sync::OnceLock;

use regex::Regex;

use crate::model::{CellValue, TargetType};

const MAIL_PATTERN: &str = r"^[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9.-]+$";

const TRUE_VALUES: &[&str] = &["true", "1", "yes", "y", "ja", "j"];
const MALE_VALUES: &[&str] = &["m", "male", "männlich", "maennlich"];
const FEMALE_VALUES: &[&str] = &["f", "female", "weiblich"];

fn mail_regex() -> &'static Regex {
    static MAIL: OnceLock<Regex> = OnceLock::new();
    MAIL.get_or_init(|| Regex::new(MAIL_PATTERN).expect("mail pattern is valid"))
}

/// Normalize `value` for a column of type `target_type`.
///
/// `None` means the field is emptied (null input, or a value the rule rejects).
pub fn postprocess(value: &CellValue, target_type: &TargetType) -> Option<CellValue> {
    if value.is_null() {
        return None;
    }

    match target_type {
        TargetType::Bool => {
            let text = value.display().to_lowercase();
            let flag = if TRUE_VALUES.contains(&text.as_str()) {
                "1"
            } else {
                "0"
            };
            Some(CellValue::from(flag))
        }
        TargetType::Gender => {
            let text = value.display().to_lowercase();
            let gender = if MALE_VALUES.contains(&text.as_str()) {
                "M"
            } else if FEMALE_VALUES.contains(&text.as_str()) {
                "F"
            } else {
                "X"
            };
            Some(CellValue::from(gender))
        }
        TargetType::Mail => {
            if mail_regex().is_match(&value.display()) {
                Some(value.clone())
            } else {
                None
            }
        }
        _ => Some(value.clone()),
    }
}

/// Name of the rule applied for a target type, for diagnostics
pub fn rule_name(target_type: &TargetType) -> &'static str {
    match target_type {
        TargetType::Bool => "bool",
        TargetType::Gender => "gender",
        TargetType::Mail => "mail",
        _ => "passthrough",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool() {
        for yes in ["TRUE", "1", "Yes", "y", "ja", "J"] {
            assert_eq!(postprocess(&yes.into(), &TargetType::Bool), Some("1".into()));
        }
        for no in ["false", "nein", "2", ""] {
            assert_eq!(postprocess(&no.into(), &TargetType::Bool), Some("0".into()));
        }
        assert_eq!(
            postprocess(&CellValue::Bool(true), &TargetType::Bool),
            Some("1".into())
        );
        assert_eq!(
            postprocess(&CellValue::Int(1), &TargetType::Bool),
            Some("1".into())
        );
    }

    #[test]
    fn test_gender() {
        assert_eq!(postprocess(&"männlich".into(), &TargetType::Gender), Some("M".into()));
        assert_eq!(postprocess(&"MAENNLICH".into(), &TargetType::Gender), Some("M".into()));
        assert_eq!(postprocess(&"Weiblich".into(), &TargetType::Gender), Some("F".into()));
        assert_eq!(postprocess(&"f".into(), &TargetType::Gender), Some("F".into()));
        assert_eq!(postprocess(&"unknown".into(), &TargetType::Gender), Some("X".into()));
        assert_eq!(postprocess(&CellValue::Null, &TargetType::Gender), None);
    }

    #[test]
    fn test_mail() {
        assert_eq!(postprocess(&"a@b.com".into(), &TargetType::Mail), Some("a@b.com".into()));
        assert_eq!(
            postprocess(&"first.last+tag@mail-host.co.uk".into(), &TargetType::Mail),
            Some("first.last+tag@mail-host.co.uk".into())
        );
        assert_eq!(postprocess(&"not-an-email".into(), &TargetType::Mail), None);
        assert_eq!(postprocess(&"a@b".into(), &TargetType::Mail), None);
        assert_eq!(postprocess(&"a b@c.de".into(), &TargetType::Mail), None);
    }

    #[test]
    fn test_passthrough_keeps_type() {
        assert_eq!(
            postprocess(&CellValue::Int(42), &TargetType::Int),
            Some(CellValue::Int(42))
        );
        assert_eq!(
            postprocess(&"x".into(), &TargetType::Other("phone".into())),
            Some("x".into())
        );
    }
}
