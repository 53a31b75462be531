//! OCTAVE Parser and Processor
//!
//! OCTAVE is a structured semantic notation used by language-model agents
//! to exchange compressed, auditable documents. This crate implements the
//! core pipeline that turns lenient, human-authored OCTAVE text into a
//! canonical, validated document tree and back again:
//!
//! ```text
//! Source text
//!   -> lexer       (tokens + warnings, bracket ledger)
//!   -> parser      (AST + lenient repair warnings)
//!   -> normalizer  (canonical AST + normalization log)
//!   -> schema      (FIELDS/POLICY extraction, constraints, routing)
//!   -> emitter     (canonical text | JSON | YAML | Markdown)
//! ```
//!
//! Two contracts hold everywhere:
//!
//! - **Fidelity**: canonical emission is a fixed point, and NUMBER/STRING
//!   lexemes round-trip verbatim.
//! - **Audit**: the pipeline never transforms silently. Every lenient
//!   repair is a warning; stages return `(value, diagnostics)` pairs
//!   rather than throwing across boundaries.
//!
//! The write path ([`store`]) wraps the pipeline with content addressing
//! (SHA-256 of canonical text), dot-path amendment with tri-state values,
//! and atomic replace.
//!
//! ```rust
//! use octave::pipeline::{self, PipelineOptions};
//!
//! let outcome = pipeline::run("TENSION::Speed <-> Quality\n", PipelineOptions::default());
//! assert_eq!(outcome.canonical, "TENSION::\"Speed ⇌ Quality\"\n");
//! ```

pub mod api;
pub mod ast;
pub mod diagnostics;
pub mod emitter;
pub mod lexer;
pub mod normalizer;
pub mod parser;
pub mod pipeline;
pub mod repair;
pub mod schema;
pub mod store;

pub use ast::{Document, Envelope, Node, Value};
pub use diagnostics::{Code, Diagnostic, Position, Severity};
pub use lexer::{tokenize, Token, TokenType};
pub use parser::parse;
pub use pipeline::{run, PipelineOptions, PipelineOutcome, Status, ValidationStatus};

/// Parse, normalize and emit in one call.
pub fn to_canonical(content: &str) -> String {
    pipeline::to_canonical(content)
}

/// Canonical hash of arbitrary OCTAVE content (parse + normalize + emit +
/// SHA-256).
pub fn content_hash(content: &str) -> String {
    store::canonical_hash(&to_canonical(content))
}
