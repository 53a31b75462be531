//! Phase 2: Parser - lenient AST construction
//!
//! Builds a [`crate::ast::Document`] from the token stream with lenient
//! semantics: the parser continues after recoverable errors and attaches
//! every silent repair as a warning.
//!
//! ## Modules
//!
//! - [`engine`] - line grouping, block structure by indentation, recovery
//! - [`values`] - RHS value resolution order
//! - [`bracket`] - bracketed values: list / inline map / holographic
//! - [`flow_expr`] - Pratt parsing for flow expressions

pub mod bracket;
pub mod engine;
pub mod flow_expr;
pub mod values;

pub use engine::{parse, parse_tokens, ParseOutput, IMPLICIT_ENVELOPE, MAX_COMFORT_DEPTH};
