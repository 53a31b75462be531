//! Constraint atoms and chain compilation
//!
//! Surface-form [`ConstraintAtom`]s from holographic patterns compile into
//! typed [`Constraint`]s. Compilation is left-to-right and fail-fast, with
//! chain-time conflict detection: `REQ∧OPT`, contradictory `CONST`s, and
//! `ENUM∧CONST` with an empty intersection are rejected before any value
//! is ever evaluated.

use serde::{Deserialize, Serialize};

use crate::ast::value::ConstraintAtom;
use crate::diagnostics::{Code, Diagnostic};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypeTag {
    String,
    Number,
    List,
    Boolean,
}

impl TypeTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::String => "STRING",
            TypeTag::Number => "NUMBER",
            TypeTag::List => "LIST",
            TypeTag::Boolean => "BOOLEAN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "constraint", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Constraint {
    Req,
    Opt,
    Const { value: String },
    Enum { values: Vec<String> },
    Type { tag: TypeTag },
    /// Pattern in the `regex` crate's dialect (RE2-style, no
    /// backtracking); matching is anchored to the whole value.
    Regex { pattern: String },
    Dir,
    AppendOnly,
    /// Inclusive on both ends; numeric values only.
    Range { min: f64, max: f64 },
    MaxLength { limit: usize },
    MinLength { limit: usize },
    /// Strict `YYYY-MM-DD`.
    Date,
    /// Full datetime, RFC 3339 zone accepted.
    Iso8601,
}

impl Constraint {
    /// Surface rendering for diagnostics and canonical re-emission.
    pub fn canonical(&self) -> String {
        match self {
            Constraint::Req => "REQ".to_string(),
            Constraint::Opt => "OPT".to_string(),
            Constraint::Const { value } => format!("CONST[{}]", value),
            Constraint::Enum { values } => format!("ENUM[{}]", values.join(",")),
            Constraint::Type { tag } => format!("TYPE[{}]", tag.as_str()),
            Constraint::Regex { pattern } => format!("REGEX[{}]", pattern),
            Constraint::Dir => "DIR".to_string(),
            Constraint::AppendOnly => "APPEND_ONLY".to_string(),
            Constraint::Range { min, max } => format!("RANGE[{},{}]", fmt_num(*min), fmt_num(*max)),
            Constraint::MaxLength { limit } => format!("MAX_LENGTH[{}]", limit),
            Constraint::MinLength { limit } => format!("MIN_LENGTH[{}]", limit),
            Constraint::Date => "DATE".to_string(),
            Constraint::Iso8601 => "ISO8601".to_string(),
        }
    }
}

fn fmt_num(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Compile a chain of surface atoms. Fail-fast: the first malformed link
/// stops compilation; conflicts found between well-formed links are also
/// errors.
pub fn compile_chain(atoms: &[ConstraintAtom]) -> Result<Vec<Constraint>, Vec<Diagnostic>> {
    let mut chain = Vec::new();
    let mut errors = Vec::new();

    for atom in atoms {
        match compile_atom(atom) {
            Ok(constraint) => chain.push(constraint),
            Err(diag) => {
                errors.push(diag);
                break;
            }
        }
    }

    if errors.is_empty() {
        errors.extend(detect_conflicts(&chain, atoms));
    }
    if errors.is_empty() {
        Ok(chain)
    } else {
        Err(errors)
    }
}

fn compile_atom(atom: &ConstraintAtom) -> Result<Constraint, Diagnostic> {
    let args = atom.args.as_deref();
    match (atom.name.as_str(), args) {
        ("REQ", None) => Ok(Constraint::Req),
        ("OPT", None) => Ok(Constraint::Opt),
        ("DIR", None) => Ok(Constraint::Dir),
        ("APPEND_ONLY", None) => Ok(Constraint::AppendOnly),
        ("DATE", None) => Ok(Constraint::Date),
        ("ISO8601", None) => Ok(Constraint::Iso8601),
        ("CONST", Some(v)) => Ok(Constraint::Const {
            value: unquote(v.trim()).to_string(),
        }),
        ("ENUM", Some(v)) => {
            let values: Vec<String> = v
                .split(',')
                .map(|s| unquote(s.trim()).to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if values.is_empty() {
                return Err(constraint_error(atom, "ENUM requires at least one value"));
            }
            Ok(Constraint::Enum { values })
        }
        ("TYPE", Some(v)) => match v.trim() {
            "STRING" => Ok(Constraint::Type { tag: TypeTag::String }),
            "NUMBER" => Ok(Constraint::Type { tag: TypeTag::Number }),
            "LIST" => Ok(Constraint::Type { tag: TypeTag::List }),
            "BOOLEAN" => Ok(Constraint::Type { tag: TypeTag::Boolean }),
            other => Err(constraint_error(
                atom,
                &format!("TYPE accepts STRING|NUMBER|LIST|BOOLEAN, got {:?}", other),
            )),
        },
        ("REGEX", Some(p)) => {
            // Compile eagerly so schema errors surface at extraction time,
            // not on first evaluation.
            if let Err(e) = regex::Regex::new(p) {
                return Err(constraint_error(atom, &format!("invalid regex: {}", e)));
            }
            Ok(Constraint::Regex {
                pattern: p.to_string(),
            })
        }
        ("RANGE", Some(v)) => {
            let parts: Vec<&str> = v.split(',').map(|s| s.trim()).collect();
            let parsed: Option<(f64, f64)> = match parts.as_slice() {
                [min, max] => min.parse().ok().zip(max.parse().ok()),
                _ => None,
            };
            match parsed {
                Some((min, max)) if min <= max => Ok(Constraint::Range { min, max }),
                Some(_) => Err(constraint_error(atom, "RANGE minimum exceeds maximum")),
                None => Err(constraint_error(atom, "RANGE requires two numbers: RANGE[min,max]")),
            }
        }
        ("MAX_LENGTH", Some(v)) => v
            .trim()
            .parse::<usize>()
            .map(|limit| Constraint::MaxLength { limit })
            .map_err(|_| constraint_error(atom, "MAX_LENGTH requires a non-negative integer")),
        ("MIN_LENGTH", Some(v)) => v
            .trim()
            .parse::<usize>()
            .map(|limit| Constraint::MinLength { limit })
            .map_err(|_| constraint_error(atom, "MIN_LENGTH requires a non-negative integer")),
        (name, Some(_)) => Err(constraint_error(
            atom,
            &format!("constraint {} takes no arguments or is unknown", name),
        )),
        (name, None) => Err(constraint_error(
            atom,
            &format!("unknown constraint {:?}", name),
        )),
    }
}

fn constraint_error(atom: &ConstraintAtom, message: &str) -> Diagnostic {
    Diagnostic::new(Code::EConstraint, message.to_string()).at(atom.position)
}

/// Chain-time conflicts: contradictions that no value could ever satisfy.
fn detect_conflicts(chain: &[Constraint], atoms: &[ConstraintAtom]) -> Vec<Diagnostic> {
    let mut errors = Vec::new();
    let position = atoms.first().map(|a| a.position);
    let mut push = |message: String| {
        let mut diag = Diagnostic::new(Code::EConstraint, message);
        if let Some(pos) = position {
            diag = diag.at(pos);
        }
        errors.push(diag);
    };

    let has_req = chain.iter().any(|c| matches!(c, Constraint::Req));
    let has_opt = chain.iter().any(|c| matches!(c, Constraint::Opt));
    if has_req && has_opt {
        push("REQ∧OPT is contradictory".to_string());
    }

    let consts: Vec<&String> = chain
        .iter()
        .filter_map(|c| match c {
            Constraint::Const { value } => Some(value),
            _ => None,
        })
        .collect();
    if let [first, rest @ ..] = consts.as_slice() {
        for other in rest {
            if other != first {
                push(format!(
                    "CONST[{}]∧CONST[{}] can never both hold",
                    first, other
                ));
            }
        }
    }

    for c in chain {
        if let Constraint::Enum { values } = c {
            for value in &consts {
                if !values.iter().any(|v| v == *value) {
                    push(format!(
                        "ENUM[{}] and CONST[{}] have an empty intersection",
                        values.join(","),
                        value
                    ));
                }
            }
        }
    }

    errors
}

fn unquote(s: &str) -> &str {
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Position;

    fn atom(name: &str, args: Option<&str>) -> ConstraintAtom {
        ConstraintAtom::new(name, args.map(|s| s.to_string()), Position::new(1, 1))
    }

    #[test]
    fn basic_chain_compiles() {
        let chain = compile_chain(&[
            atom("REQ", None),
            atom("ENUM", Some("A,B")),
            atom("RANGE", Some("1,10")),
        ])
        .unwrap();
        assert_eq!(chain.len(), 3);
        assert_eq!(chain[1].canonical(), "ENUM[A,B]");
        assert_eq!(chain[2].canonical(), "RANGE[1,10]");
    }

    #[test]
    fn req_opt_conflicts() {
        let err = compile_chain(&[atom("REQ", None), atom("OPT", None)]).unwrap_err();
        assert!(err[0].message.contains("REQ∧OPT"));
    }

    #[test]
    fn const_const_conflicts() {
        let err =
            compile_chain(&[atom("CONST", Some("X")), atom("CONST", Some("Y"))]).unwrap_err();
        assert!(err[0].message.contains("never both hold"));
    }

    #[test]
    fn const_matching_enum_is_fine() {
        assert!(compile_chain(&[atom("ENUM", Some("X,Y")), atom("CONST", Some("X"))]).is_ok());
        assert!(compile_chain(&[atom("ENUM", Some("X,Y")), atom("CONST", Some("Z"))]).is_err());
    }

    #[test]
    fn compilation_is_fail_fast() {
        let err = compile_chain(&[
            atom("BOGUS", None),
            atom("ALSO_BOGUS", None),
        ])
        .unwrap_err();
        assert_eq!(err.len(), 1);
    }

    #[test]
    fn regex_with_brackets_survives() {
        let chain = compile_chain(&[atom("REGEX", Some("^[a-z]+$"))]).unwrap();
        assert_eq!(chain[0].canonical(), "REGEX[^[a-z]+$]");
    }

    #[test]
    fn bad_regex_is_rejected_at_compile_time() {
        assert!(compile_chain(&[atom("REGEX", Some("((("))]).is_err());
    }
}
