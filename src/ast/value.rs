//! Value sum type
//!
//! Values are the right-hand side of assignments. The set is closed; the
//! parser resolves every RHS into exactly one of these, in the order
//! triple-quote -> quoted string -> bracketed value -> section ref ->
//! variable -> colon path -> number/boolean/null/version -> multi-word
//! coalescing.

use serde::{Deserialize, Serialize};

use crate::ast::flow::FlowExpr;
use crate::ast::target::Target;
use crate::diagnostics::Position;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Str {
        value: String,
        /// True when the source quoted the string (or coalescing produced
        /// content that needs quoting); drives canonical emission.
        quoted: bool,
    },
    Number {
        /// Source lexeme, preserved verbatim for round-trip fidelity.
        raw: String,
        value: f64,
    },
    Boolean(bool),
    Null,
    /// Semver lexeme, e.g. `1.2.3-rc.1`.
    Version(String),
    /// `$NAME` or `$2:role`, dollar included.
    Variable(String),
    /// `§NAME` or `§3`, section sign stripped.
    SectionRef(String),
    /// `A:B:C`.
    ColonPath(Vec<String>),
    List(Vec<Value>),
    /// `[k::atom, k2::atom]` - ordered, atomic values only.
    InlineMap(Vec<(String, Value)>),
    Holographic(Box<HolographicPattern>),
    Flow(Box<FlowExpr>),
}

impl Value {
    pub fn string(value: impl Into<String>, quoted: bool) -> Self {
        Value::Str {
            value: value.into(),
            quoted,
        }
    }

    pub fn number(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let value = raw.parse::<f64>().unwrap_or(f64::NAN);
        Value::Number { raw, value }
    }

    /// Coarse type name used in constraint diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Str { .. } => "STRING",
            Value::Number { .. } => "NUMBER",
            Value::Boolean(_) => "BOOLEAN",
            Value::Null => "NULL",
            Value::Version(_) => "VERSION",
            Value::Variable(_) => "VARIABLE",
            Value::SectionRef(_) => "SECTION_REF",
            Value::ColonPath(_) => "COLON_PATH",
            Value::List(_) => "LIST",
            Value::InlineMap(_) => "INLINE_MAP",
            Value::Holographic(_) => "HOLOGRAPHIC",
            Value::Flow(_) => "FLOW",
        }
    }

    /// Scalar rendering for equality checks (CONST, ENUM) and repair
    /// messages. Structured values render canonically.
    pub fn scalar_repr(&self) -> String {
        match self {
            Value::Str { value, .. } => value.clone(),
            Value::Number { raw, .. } => raw.clone(),
            Value::Boolean(b) => b.to_string(),
            Value::Null => "null".to_string(),
            Value::Version(v) => v.clone(),
            Value::Variable(v) => v.clone(),
            Value::SectionRef(s) => format!("§{}", s),
            Value::ColonPath(parts) => parts.join(":"),
            other => format!("{:?}", other),
        }
    }
}

/// A field definition pattern: example value, constraint chain, optional
/// routing target. Recognized only inside `[ ]` when a `∧` appears at
/// depth 1 and no list comma does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolographicPattern {
    pub example: Value,
    pub constraints: Vec<ConstraintAtom>,
    pub target: Option<Target>,
}

/// One link of a constraint chain, still in surface form. The schema
/// compiler turns these into typed `Constraint`s; keeping the raw argument
/// text here means regex metacharacters never touch the value grammar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintAtom {
    pub name: String,
    /// Raw text between the constructor's brackets, e.g. `A,B` for
    /// `ENUM[A,B]`; None for bare atoms like `REQ`.
    pub args: Option<String>,
    pub position: Position,
}

impl ConstraintAtom {
    pub fn new(name: impl Into<String>, args: Option<String>, position: Position) -> Self {
        Self {
            name: name.into(),
            args,
            position,
        }
    }
}
