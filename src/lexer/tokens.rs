//! Token definitions for the OCTAVE lexer
//!
//! Tokens carry both the exact source lexeme (`raw`) and the normalized
//! form (`text`). For NUMBER and STRING tokens, `raw` round-trips through
//! the whole pipeline so canonical emission never loses the author's
//! lexeme (`1.50` stays `1.50`, not `1.5`).

use serde::{Deserialize, Serialize};

use crate::diagnostics::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenType {
    // Envelope delimiters
    EnvelopeStart, // ===IDENT===
    EnvelopeEnd,   // ===END===

    // Atoms
    Ident,
    String,
    Number,
    Boolean,
    Null,
    Version,  // 1.2.3, 1.2.3-rc.1
    Variable, // $NAME, $2:role

    // Structure
    Assign, // ::
    Colon,  // :
    Comma,
    LBracket,
    RBracket,
    Section, // § (ASCII alias: #)

    // Flow operators (canonical Unicode in `text`)
    Flow,        // → (->)
    Synthesis,   // ⊕ (+)
    Concat,      // ⧺ (~)
    Tension,     // ⇌ (<->, vs)
    Constraint,  // ∧ (&)
    Alternative, // ∨ (|)
    At,          // @

    // Trivia kept for fidelity
    Comment,     // // to end of line
    LiteralZone, // fenced verbatim region, bytes preserved

    Newline,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenType,
    /// Exact source lexeme.
    pub raw: String,
    /// Normalized form: Unicode operator, unescaped string content,
    /// lowercased boolean/null.
    pub text: String,
    pub position: Position,
}

impl Token {
    pub fn new(
        kind: TokenType,
        raw: impl Into<String>,
        text: impl Into<String>,
        position: Position,
    ) -> Self {
        Self {
            kind,
            raw: raw.into(),
            text: text.into(),
            position,
        }
    }

    /// Column just past the end of this token's raw lexeme. Multi-line
    /// tokens (triple strings, literal zones) report the end on their
    /// final line instead.
    pub fn end_column(&self) -> usize {
        match self.raw.rfind('\n') {
            Some(idx) => self.raw[idx + 1..].chars().count() + 1,
            None => self.position.column + self.raw.chars().count(),
        }
    }

    /// Number of newlines embedded in the raw lexeme.
    pub fn embedded_newlines(&self) -> usize {
        self.raw.matches('\n').count()
    }

    pub fn is_operator(&self) -> bool {
        matches!(
            self.kind,
            TokenType::Flow
                | TokenType::Synthesis
                | TokenType::Concat
                | TokenType::Tension
                | TokenType::Constraint
                | TokenType::Alternative
                | TokenType::At
        )
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Token({:?}, {:?}, {})",
            self.kind, self.raw, self.position
        )
    }
}
