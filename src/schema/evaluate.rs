//! Constraint evaluation
//!
//! Evaluates a value against a compiled chain, left to right, short-
//! circuiting on the first failure. With `fix = true` the two REPAIR-tier
//! transformations are available: ENUM casefold (only when unambiguous)
//! and string-to-number/boolean coercion when TYPE demands it. Every
//! repair is logged; nothing above the REPAIR tier ever happens here.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::ast::Value;
use crate::diagnostics::Code;
use crate::repair::{RepairAction, RepairTier};
use crate::schema::constraints::{Constraint, TypeTag};

/// Structured record for a single constraint failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub code: Code,
    pub path: String,
    pub constraint: String,
    pub expected: String,
    pub got: String,
}

impl ValidationError {
    fn new(
        code: Code,
        path: &str,
        constraint: &Constraint,
        expected: impl Into<String>,
        got: impl Into<String>,
    ) -> Self {
        Self {
            code,
            path: path.to_string(),
            constraint: constraint.canonical(),
            expected: expected.into(),
            got: got.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EvalOutcome {
    pub errors: Vec<ValidationError>,
    pub repairs: Vec<RepairAction>,
}

/// Evaluate `value` against `chain` at `path`. The value may be rewritten
/// by REPAIR-tier fixes when `fix` is set; each rewrite lands in
/// `outcome.repairs`.
pub fn evaluate(value: &mut Value, chain: &[Constraint], path: &str, fix: bool) -> EvalOutcome {
    let mut outcome = EvalOutcome::default();

    for constraint in chain {
        match constraint {
            // Presence is the schema walker's concern.
            Constraint::Req | Constraint::Opt | Constraint::AppendOnly => continue,
            _ => {}
        }
        if let Some(error) = check_one(value, constraint, path, fix, &mut outcome.repairs) {
            outcome.errors.push(error);
            break; // fail-fast
        }
    }

    outcome
}

fn check_one(
    value: &mut Value,
    constraint: &Constraint,
    path: &str,
    fix: bool,
    repairs: &mut Vec<RepairAction>,
) -> Option<ValidationError> {
    match constraint {
        Constraint::Type { tag } => check_type(value, *tag, constraint, path, fix, repairs),
        Constraint::Range { min, max } => match value {
            Value::Number { value: n, .. } if *min <= *n && *n <= *max => None,
            Value::Number { raw, .. } => Some(ValidationError::new(
                Code::EConstraint,
                path,
                constraint,
                format!("number in [{}, {}]", min, max),
                raw.clone(),
            )),
            other => Some(ValidationError::new(
                Code::EConstraint,
                path,
                constraint,
                "a numeric value",
                other.type_name(),
            )),
        },
        Constraint::MaxLength { limit } => match length_of(value) {
            Some(len) if len <= *limit => None,
            Some(len) => Some(ValidationError::new(
                Code::EConstraint,
                path,
                constraint,
                format!("length <= {}", limit),
                len.to_string(),
            )),
            None => Some(ValidationError::new(
                Code::EConstraint,
                path,
                constraint,
                "a string or list",
                value.type_name(),
            )),
        },
        Constraint::MinLength { limit } => match length_of(value) {
            Some(len) if len >= *limit => None,
            Some(len) => Some(ValidationError::new(
                Code::EConstraint,
                path,
                constraint,
                format!("length >= {}", limit),
                len.to_string(),
            )),
            None => Some(ValidationError::new(
                Code::EConstraint,
                path,
                constraint,
                "a string or list",
                value.type_name(),
            )),
        },
        Constraint::Enum { values } => check_enum(value, values, constraint, path, fix, repairs),
        Constraint::Const { value: expected } => {
            let got = value.scalar_repr();
            if got == *expected {
                None
            } else {
                Some(ValidationError::new(
                    Code::EConstraint,
                    path,
                    constraint,
                    expected.clone(),
                    got,
                ))
            }
        }
        Constraint::Regex { pattern } => {
            let text = match value {
                Value::Str { value, .. } => value.clone(),
                other => other.scalar_repr(),
            };
            // Anchored full match in the regex crate's dialect.
            let anchored = format!("^(?:{})$", pattern);
            match regex::Regex::new(&anchored) {
                Ok(re) if re.is_match(&text) => None,
                Ok(_) => Some(ValidationError::new(
                    Code::EConstraint,
                    path,
                    constraint,
                    format!("match for /{}/", pattern),
                    text,
                )),
                Err(e) => Some(ValidationError::new(
                    Code::EConstraint,
                    path,
                    constraint,
                    "a valid pattern",
                    e.to_string(),
                )),
            }
        }
        Constraint::Date => {
            let text = value.scalar_repr();
            // chrono accepts non-padded fields; the shape check keeps
            // YYYY-MM-DD strict.
            let shaped = text.len() == 10
                && text.as_bytes()[4] == b'-'
                && text.as_bytes()[7] == b'-'
                && text
                    .bytes()
                    .enumerate()
                    .all(|(i, b)| matches!(i, 4 | 7) || b.is_ascii_digit());
            if shaped && NaiveDate::parse_from_str(&text, "%Y-%m-%d").is_ok() {
                None
            } else {
                Some(ValidationError::new(
                    Code::EConstraint,
                    path,
                    constraint,
                    "YYYY-MM-DD",
                    text,
                ))
            }
        }
        Constraint::Iso8601 => {
            let text = value.scalar_repr();
            let ok = DateTime::parse_from_rfc3339(&text).is_ok()
                || NaiveDateTime::parse_from_str(&text, "%Y-%m-%dT%H:%M:%S").is_ok();
            if ok {
                None
            } else {
                Some(ValidationError::new(
                    Code::EConstraint,
                    path,
                    constraint,
                    "an ISO 8601 datetime",
                    text,
                ))
            }
        }
        Constraint::Dir => match value {
            Value::Str { value: text, .. } if !text.is_empty() => None,
            other => Some(ValidationError::new(
                Code::EConstraint,
                path,
                constraint,
                "a non-empty path string",
                other.type_name(),
            )),
        },
        Constraint::Req | Constraint::Opt | Constraint::AppendOnly => None,
    }
}

fn check_type(
    value: &mut Value,
    tag: TypeTag,
    constraint: &Constraint,
    path: &str,
    fix: bool,
    repairs: &mut Vec<RepairAction>,
) -> Option<ValidationError> {
    let matches_tag = match tag {
        TypeTag::String => matches!(value, Value::Str { .. }),
        // Booleans are not numbers.
        TypeTag::Number => matches!(value, Value::Number { .. }),
        TypeTag::List => matches!(value, Value::List(_)),
        TypeTag::Boolean => matches!(value, Value::Boolean(_)),
    };
    if matches_tag {
        return None;
    }

    // REPAIR tier: string-to-number / string-to-boolean coercion.
    if fix {
        if let Value::Str { value: text, .. } = value {
            match tag {
                TypeTag::Number => {
                    if let Ok(parsed) = text.parse::<f64>() {
                        repairs.push(RepairAction {
                            rule_id: "coerce_string_to_number".to_string(),
                            path: path.to_string(),
                            before: text.clone(),
                            after: text.clone(),
                            tier: RepairTier::Repair,
                            safe: true,
                            semantics_changed: false,
                        });
                        *value = Value::Number {
                            raw: text.clone(),
                            value: parsed,
                        };
                        return None;
                    }
                }
                TypeTag::Boolean => {
                    let lowered = text.to_lowercase();
                    if lowered == "true" || lowered == "false" {
                        repairs.push(RepairAction {
                            rule_id: "coerce_string_to_boolean".to_string(),
                            path: path.to_string(),
                            before: text.clone(),
                            after: lowered.clone(),
                            tier: RepairTier::Repair,
                            safe: true,
                            semantics_changed: false,
                        });
                        *value = Value::Boolean(lowered == "true");
                        return None;
                    }
                }
                _ => {}
            }
        }
    }

    Some(ValidationError::new(
        Code::EConstraint,
        path,
        constraint,
        tag.as_str(),
        value.type_name(),
    ))
}

fn check_enum(
    value: &mut Value,
    allowed: &[String],
    constraint: &Constraint,
    path: &str,
    fix: bool,
    repairs: &mut Vec<RepairAction>,
) -> Option<ValidationError> {
    let got = value.scalar_repr();
    if allowed.iter().any(|v| *v == got) {
        return None;
    }

    if fix {
        // Unique case-insensitive match may be folded; ambiguity is E006.
        let folded: Vec<&String> = allowed
            .iter()
            .filter(|v| v.eq_ignore_ascii_case(&got))
            .collect();
        match folded.as_slice() {
            [unique] => {
                repairs.push(RepairAction {
                    rule_id: "enum_casefold".to_string(),
                    path: path.to_string(),
                    before: got.clone(),
                    after: (*unique).clone(),
                    tier: RepairTier::Repair,
                    safe: true,
                    semantics_changed: false,
                });
                *value = Value::Str {
                    value: (*unique).clone(),
                    quoted: false,
                };
                return None;
            }
            [] => {}
            _ => {
                return Some(ValidationError::new(
                    Code::E006,
                    path,
                    constraint,
                    "an unambiguous case-insensitive match",
                    got,
                ));
            }
        }
    }

    Some(ValidationError::new(
        Code::EConstraint,
        path,
        constraint,
        format!("one of {}", allowed.join("|")),
        got,
    ))
}

fn length_of(value: &Value) -> Option<usize> {
    match value {
        Value::Str { value, .. } => Some(value.chars().count()),
        Value::List(items) => Some(items.len()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn str_value(s: &str) -> Value {
        Value::Str {
            value: s.to_string(),
            quoted: false,
        }
    }

    #[test]
    fn range_is_inclusive() {
        let range = Constraint::Range { min: 1.0, max: 10.0 };
        let mut low = Value::number("1");
        let mut high = Value::number("10");
        let mut out = Value::number("10.5");
        assert!(evaluate(&mut low, &[range.clone()], "K", false).errors.is_empty());
        assert!(evaluate(&mut high, &[range.clone()], "K", false).errors.is_empty());
        assert!(!evaluate(&mut out, &[range], "K", false).errors.is_empty());
    }

    #[test]
    fn booleans_are_not_numbers() {
        let mut value = Value::Boolean(true);
        let chain = [Constraint::Type { tag: TypeTag::Number }];
        let outcome = evaluate(&mut value, &chain, "K", false);
        assert_eq!(outcome.errors[0].got, "BOOLEAN");
    }

    #[test]
    fn chain_short_circuits() {
        let chain = [
            Constraint::Type { tag: TypeTag::Number },
            Constraint::Range { min: 0.0, max: 1.0 },
        ];
        let mut value = str_value("nope");
        let outcome = evaluate(&mut value, &chain, "K", false);
        // Only the TYPE failure is reported; RANGE never ran.
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].constraint, "TYPE[NUMBER]");
    }

    #[test]
    fn enum_is_case_sensitive_without_fix() {
        let chain = [Constraint::Enum {
            values: vec!["ACTIVE".to_string(), "DONE".to_string()],
        }];
        let mut value = str_value("active");
        assert!(!evaluate(&mut value, &chain, "K", false).errors.is_empty());
    }

    #[test]
    fn enum_casefold_repairs_when_unique() {
        let chain = [Constraint::Enum {
            values: vec!["ACTIVE".to_string(), "DONE".to_string()],
        }];
        let mut value = str_value("active");
        let outcome = evaluate(&mut value, &chain, "K", true);
        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.repairs[0].rule_id, "enum_casefold");
        assert_eq!(value.scalar_repr(), "ACTIVE");
    }

    #[test]
    fn ambiguous_casefold_is_e006() {
        let chain = [Constraint::Enum {
            values: vec!["Active".to_string(), "ACTIVE".to_string()],
        }];
        let mut value = str_value("active");
        let outcome = evaluate(&mut value, &chain, "K", true);
        assert_eq!(outcome.errors[0].code, Code::E006);
    }

    #[test]
    fn string_to_number_coercion_only_with_fix() {
        let chain = [Constraint::Type { tag: TypeTag::Number }];
        let mut value = str_value("42");
        assert!(!evaluate(&mut value.clone(), &chain, "K", false).errors.is_empty());
        let outcome = evaluate(&mut value, &chain, "K", true);
        assert!(outcome.errors.is_empty());
        assert!(matches!(value, Value::Number { .. }));
    }

    #[test]
    fn date_is_strict() {
        let chain = [Constraint::Date];
        assert!(evaluate(&mut str_value("2026-08-01"), &chain, "K", false)
            .errors
            .is_empty());
        assert!(!evaluate(&mut str_value("2026-8-1"), &chain, "K", false)
            .errors
            .is_empty());
        assert!(!evaluate(&mut str_value("01/08/2026"), &chain, "K", false)
            .errors
            .is_empty());
    }

    #[test]
    fn regex_is_anchored() {
        let chain = [Constraint::Regex {
            pattern: "[a-z]+".to_string(),
        }];
        assert!(evaluate(&mut str_value("abc"), &chain, "K", false)
            .errors
            .is_empty());
        assert!(!evaluate(&mut str_value("abc1"), &chain, "K", false)
            .errors
            .is_empty());
    }
}
