//! Phase 1: Lexer - Tokenization
//!
//! Converts OCTAVE source text into a flat token stream plus an audit
//! trail.
//!
//! ## Lexer Steps
//!
//! Step 1.a: Literal zone scanning - locates fenced verbatim regions so
//! their bytes bypass tokenization and NFC normalization
//! Step 1.b: Tokenization - envelope delimiters, atoms, structure tokens,
//! flow operators (ASCII aliases rewritten to Unicode with a W002 audit),
//! balanced-bracket ledger
//!
//! The lexer returns `(tokens, diagnostics)`; callers must propagate both.

pub mod literal_scanner;
pub mod scanner;
pub mod tokens;

pub use literal_scanner::{LiteralScanner, LiteralZoneSpan};
pub use scanner::{tokenize, tokenize_bytes, LexOutput};
pub use tokens::{Token, TokenType};
