//! Flow expressions
//!
//! Operator expressions over values, recognized inside `[ ]`. Precedence,
//! tighter first: AT, CONCAT, SYNTHESIS, TENSION, CONSTRAINT, ALTERNATIVE,
//! FLOW. FLOW is right-associative; all others are left-associative;
//! TENSION is strictly binary (chaining is a parse error).

use serde::{Deserialize, Serialize};

use crate::ast::value::Value;
use crate::lexer::TokenType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowOp {
    At,          // @
    Concat,      // ⧺
    Synthesis,   // ⊕
    Tension,     // ⇌
    Constraint,  // ∧
    Alternative, // ∨
    Flow,        // →
}

impl FlowOp {
    pub fn from_token(kind: TokenType) -> Option<Self> {
        match kind {
            TokenType::At => Some(FlowOp::At),
            TokenType::Concat => Some(FlowOp::Concat),
            TokenType::Synthesis => Some(FlowOp::Synthesis),
            TokenType::Tension => Some(FlowOp::Tension),
            TokenType::Constraint => Some(FlowOp::Constraint),
            TokenType::Alternative => Some(FlowOp::Alternative),
            TokenType::Flow => Some(FlowOp::Flow),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            FlowOp::At => "@",
            FlowOp::Concat => "⧺",
            FlowOp::Synthesis => "⊕",
            FlowOp::Tension => "⇌",
            FlowOp::Constraint => "∧",
            FlowOp::Alternative => "∨",
            FlowOp::Flow => "→",
        }
    }

    /// Left and right binding powers for the Pratt loop. A higher number
    /// binds tighter. FLOW gets `right > left` for right-associativity;
    /// everything else `left > right`.
    pub fn binding_power(&self) -> (u8, u8) {
        match self {
            FlowOp::At => (13, 14),
            FlowOp::Concat => (11, 12),
            FlowOp::Synthesis => (9, 10),
            FlowOp::Tension => (7, 8),
            FlowOp::Constraint => (5, 6),
            FlowOp::Alternative => (3, 4),
            FlowOp::Flow => (2, 1),
        }
    }
}

impl std::fmt::Display for FlowOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowExpr {
    Atom(Value),
    Binary {
        op: FlowOp,
        lhs: Box<FlowExpr>,
        rhs: Box<FlowExpr>,
    },
}

impl FlowExpr {
    pub fn binary(op: FlowOp, lhs: FlowExpr, rhs: FlowExpr) -> Self {
        FlowExpr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// True when the top of this expression is a TENSION - used to refuse
    /// a second `⇌` at the same level.
    pub fn is_tension(&self) -> bool {
        matches!(
            self,
            FlowExpr::Binary {
                op: FlowOp::Tension,
                ..
            }
        )
    }
}
