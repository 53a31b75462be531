//! Audit records for the OCTAVE pipeline
//!
//! Every stage returns `(value, diagnostics)` instead of throwing across
//! stage boundaries. Warnings document lenient transformations (nothing the
//! pipeline does is silent); errors carry position, a caret context line,
//! and an expected/got pair so callers can render actionable messages.

use serde::{Deserialize, Serialize};

/// Source position, 1-indexed for human-facing diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Closed set of diagnostic codes.
///
/// Numeric codes (`E001`, `W002`, ...) match the published tool surface;
/// named codes (`E_PATH`, `W_DUPLICATE_KEY`, ...) are shared with the
/// original notation tooling and must not be renamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Code {
    // Transport / filesystem
    EPath,
    EFile,
    EHash,
    EEncoding,
    // Lexical
    ETokenize,
    EUnbalancedBracket,
    EUnexpectedBracket,
    EInvalidEnvelopeId,
    // Parse-level
    E001,
    E002,
    E003,
    E004,
    E005,
    E006,
    ETensionChain,
    EConstraintOutsideBrackets,
    // Semantic
    EMissingRequired,
    EUnknownField,
    EConstraint,
    // Warnings
    W001,
    W002,
    W003,
    WDuplicateKey,
    WDeepNesting,
    WUnknownField,
    WMultiword,
}

impl Code {
    pub fn as_str(&self) -> &'static str {
        match self {
            Code::EPath => "E_PATH",
            Code::EFile => "E_FILE",
            Code::EHash => "E_HASH",
            Code::EEncoding => "E_ENCODING",
            Code::ETokenize => "E_TOKENIZE",
            Code::EUnbalancedBracket => "E_UNBALANCED_BRACKET",
            Code::EUnexpectedBracket => "E_UNEXPECTED_BRACKET",
            Code::EInvalidEnvelopeId => "E_INVALID_ENVELOPE_ID",
            Code::E001 => "E001",
            Code::E002 => "E002",
            Code::E003 => "E003",
            Code::E004 => "E004",
            Code::E005 => "E005",
            Code::E006 => "E006",
            Code::ETensionChain => "E_TENSION_CHAIN",
            Code::EConstraintOutsideBrackets => "E_CONSTRAINT_OUTSIDE_BRACKETS",
            Code::EMissingRequired => "E_MISSING_REQUIRED",
            Code::EUnknownField => "E_UNKNOWN_FIELD",
            Code::EConstraint => "E_CONSTRAINT",
            Code::W001 => "W001",
            Code::W002 => "W002",
            Code::W003 => "W003",
            Code::WDuplicateKey => "W_DUPLICATE_KEY",
            Code::WDeepNesting => "W_DEEP_NESTING",
            Code::WUnknownField => "W_UNKNOWN_FIELD",
            Code::WMultiword => "W_MULTIWORD",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Code::W001
            | Code::W002
            | Code::W003
            | Code::WDuplicateKey
            | Code::WDeepNesting
            | Code::WUnknownField
            | Code::WMultiword => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: Code,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    pub message: String,
    /// Offending source line plus a caret line pointing at the column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub got: Option<String>,
}

impl Diagnostic {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: code.severity(),
            position: None,
            message: message.into(),
            context: None,
            expected: None,
            got: None,
        }
    }

    pub fn at(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    /// Attach the source line with a caret pointing at this diagnostic's
    /// column.
    pub fn with_source_line(mut self, line_text: &str) -> Self {
        let column = self.position.map(|p| p.column).unwrap_or(1);
        self.context = Some(caret_context(line_text, column));
        self
    }

    pub fn expected_got(mut self, expected: impl Into<String>, got: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self.got = Some(got.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.position {
            Some(pos) => write!(f, "{} at {}: {}", self.code.as_str(), pos, self.message),
            None => write!(f, "{}: {}", self.code.as_str(), self.message),
        }
    }
}

/// Build a two-line context: the source line and a caret under `column`.
pub fn caret_context(line_text: &str, column: usize) -> String {
    let caret_offset = column.saturating_sub(1);
    let pad: String = line_text
        .chars()
        .take(caret_offset)
        .map(|c| if c == '\t' { '\t' } else { ' ' })
        .collect();
    format!("{}\n{}^", line_text, pad)
}

/// Sort by source order: ascending line, then column. Records without a
/// position keep their relative order at the front.
pub fn sort_by_position(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by_key(|d| {
        d.position
            .map(|p| (1usize, p.line, p.column))
            .unwrap_or((0, 0, 0))
    });
}

/// Render a diagnostic list as structured JSON for transports.
pub fn to_json(diagnostics: &[Diagnostic]) -> serde_json::Value {
    serde_json::json!(diagnostics
        .iter()
        .map(|d| {
            serde_json::json!({
                "code": d.code.as_str(),
                "severity": d.severity,
                "line": d.position.map(|p| p.line),
                "column": d.position.map(|p| p.column),
                "message": d.message,
                "context": d.context,
                "expected": d.expected,
                "got": d.got,
            })
        })
        .collect::<Vec<_>>())
}
