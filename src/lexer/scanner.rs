//! Pass 1: main tokenization engine
//!
//! Converts OCTAVE source text into a flat token stream plus an audit
//! trail. The engine is line-oriented: literal zones found by pass 0 are
//! lifted out whole, every other line is NFC-normalized and scanned
//! character by character.
//!
//! ASCII operator aliases (`->`, `+`, `~`, `<->`, `&`, `|`, `vs`, `#`) are
//! rewritten to their Unicode canonical forms in the token's `text`; each
//! rewrite is recorded as a W002 so no transformation is silent.

use unicode_normalization::UnicodeNormalization;

use crate::diagnostics::{Code, Diagnostic, Position};
use crate::lexer::literal_scanner::{LiteralScanner, LiteralZoneSpan};
use crate::lexer::tokens::{Token, TokenType};

/// Canonical operator codepoints.
pub const OP_FLOW: char = '\u{2192}'; // →
pub const OP_SYNTHESIS: char = '\u{2295}'; // ⊕
pub const OP_CONCAT: char = '\u{29FA}'; // ⧺
pub const OP_TENSION: char = '\u{21CC}'; // ⇌
pub const OP_CONSTRAINT: char = '\u{2227}'; // ∧
pub const OP_ALTERNATIVE: char = '\u{2228}'; // ∨
pub const OP_SECTION: char = '\u{A7}'; // §

#[derive(Debug, Clone)]
pub struct LexOutput {
    pub tokens: Vec<Token>,
    pub diagnostics: Vec<Diagnostic>,
}

impl LexOutput {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.is_error())
    }
}

/// Decode a byte string as UTF-8, then tokenize. Invalid sequences fail
/// with E_ENCODING before any scanning happens.
pub fn tokenize_bytes(bytes: &[u8]) -> Result<LexOutput, Diagnostic> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Ok(tokenize(text)),
        Err(e) => Err(Diagnostic::new(
            Code::EEncoding,
            format!("input is not valid UTF-8 at byte {}", e.valid_up_to()),
        )),
    }
}

/// Tokenize OCTAVE source text. Callers must propagate the diagnostics
/// alongside the tokens; dropping the audit trail is a bug.
pub fn tokenize(text: &str) -> LexOutput {
    let mut lexer = Lexer::new(text);
    lexer.run();
    LexOutput {
        tokens: lexer.tokens,
        diagnostics: lexer.diagnostics,
    }
}

struct Lexer {
    /// Original source lines, byte-exact.
    raw_lines: Vec<String>,
    zones: Vec<LiteralZoneSpan>,
    /// 0-indexed cursor into `raw_lines`.
    line_idx: usize,
    tokens: Vec<Token>,
    diagnostics: Vec<Diagnostic>,
    bracket_stack: Vec<Position>,
}

impl Lexer {
    fn new(text: &str) -> Self {
        let zones = LiteralScanner::new().scan(text);
        Self {
            raw_lines: text.lines().map(|l| l.to_string()).collect(),
            zones,
            line_idx: 0,
            tokens: Vec::new(),
            diagnostics: Vec::new(),
            bracket_stack: Vec::new(),
        }
    }

    fn run(&mut self) {
        while self.line_idx < self.raw_lines.len() {
            if let Some(zone) = self.zone_opening_here() {
                self.read_literal_zone(&zone);
                continue;
            }
            let line = self.raw_lines[self.line_idx].clone();
            let line_num = self.line_idx + 1;

            if let Some(stripped) = envelope_line(&line) {
                let stripped = stripped.to_string();
                self.read_envelope(&stripped, line_num, &line);
            } else {
                self.scan_line(&line, line_num);
            }

            self.push_newline();
            self.line_idx += 1;
        }

        if let Some(first) = self.bracket_stack.first().copied() {
            self.diagnostics.push(
                Diagnostic::new(
                    Code::EUnbalancedBracket,
                    format!("unclosed '[' opened at {}", first),
                )
                .at(first)
                .expected_got("matching ']'", "end of input"),
            );
        }

        let eof_pos = Position::new(self.raw_lines.len().max(1), 1);
        self.tokens.push(Token::new(TokenType::Eof, "", "", eof_pos));
    }

    fn zone_opening_here(&self) -> Option<LiteralZoneSpan> {
        let line_num = self.line_idx + 1;
        self.zones.iter().find(|z| z.key_line == line_num).cloned()
    }

    /// Lift a whole literal zone out as key + LiteralZone tokens. Bytes
    /// between the fences are preserved exactly; no NFC, no scanning.
    fn read_literal_zone(&mut self, zone: &LiteralZoneSpan) {
        let key_line = self.raw_lines[zone.key_line - 1].clone();
        let key = key_line.trim().to_string();
        let key_pos = Position::new(zone.key_line, zone.indent + 1);
        self.tokens
            .push(Token::new(TokenType::Ident, key.clone(), key, key_pos));
        self.tokens.push(Token::new(
            TokenType::Newline,
            "\n",
            "\n",
            Position::new(zone.key_line, key_line.chars().count() + 1),
        ));

        let content_end = if zone.closed {
            zone.close_line - 1
        } else {
            zone.close_line
        };
        let content = self.raw_lines[zone.fence_line..content_end].join("\n");
        let raw = self.raw_lines[zone.fence_line - 1..zone.close_line].join("\n");
        let fence_pos = Position::new(zone.fence_line, zone.indent + 1);
        self.tokens
            .push(Token::new(TokenType::LiteralZone, raw, content, fence_pos));

        if !zone.closed {
            self.diagnostics.push(
                Diagnostic::new(
                    Code::W001,
                    format!(
                        "literal zone opened at line {} auto-closed at end of input",
                        zone.fence_line
                    ),
                )
                .at(fence_pos),
            );
        }

        self.push_newline_at(Position::new(zone.close_line, 1));
        self.line_idx = zone.close_line;
    }

    fn read_envelope(&mut self, ident: &str, line_num: usize, line: &str) {
        let pos = Position::new(line_num, 1);
        if ident == "END" {
            self.tokens
                .push(Token::new(TokenType::EnvelopeEnd, line, "END", pos));
            return;
        }

        if let Some(bad) = invalid_ident_char(ident) {
            self.diagnostics.push(
                Diagnostic::new(
                    Code::EInvalidEnvelopeId,
                    format!("invalid envelope identifier {:?}: {}", ident, char_name(bad)),
                )
                .at(pos)
                .with_source_line(line)
                .expected_got("[A-Za-z_][A-Za-z0-9_]*", ident),
            );
        }
        self.tokens
            .push(Token::new(TokenType::EnvelopeStart, line, ident, pos));
    }

    /// Scan one non-envelope, non-zone line.
    fn scan_line(&mut self, raw_line: &str, line_num: usize) {
        let normalized: String = raw_line.nfc().collect();
        if normalized != raw_line {
            self.diagnostics.push(
                Diagnostic::new(Code::W001, "Unicode NFC normalization applied")
                    .at(Position::new(line_num, 1)),
            );
        }
        let chars: Vec<char> = normalized.chars().collect();

        // Tab-in-indent check before anything else.
        let mut indent_end = 0;
        while indent_end < chars.len() && (chars[indent_end] == ' ' || chars[indent_end] == '\t') {
            if chars[indent_end] == '\t' {
                self.diagnostics.push(
                    Diagnostic::new(Code::E005, "tabs are not allowed in indentation")
                        .at(Position::new(line_num, indent_end + 1))
                        .with_source_line(raw_line)
                        .expected_got("two spaces per depth", "tab"),
                );
            }
            indent_end += 1;
        }
        // 0-indexed cursor; positions are col+1.
        let mut col = indent_end;

        while col < chars.len() {
            let ch = chars[col];
            let pos = Position::new(line_num, col + 1);

            if ch == ' ' || ch == '\t' {
                col += 1;
                continue;
            }

            // Comment runs to end of line.
            if ch == '/' && chars.get(col + 1) == Some(&'/') {
                let raw: String = chars[col..].iter().collect();
                let text = raw[2..].trim().to_string();
                self.tokens.push(Token::new(TokenType::Comment, raw, text, pos));
                break;
            }

            // Strings before everything else so operators inside quotes
            // stay untouched.
            if ch == '"' {
                col = self.read_string(&chars, col, line_num);
                continue;
            }

            if let Some(width) = self.try_read_operator(&chars, col, pos) {
                col += width;
                continue;
            }

            match ch {
                ':' if chars.get(col + 1) == Some(&':') => {
                    self.tokens.push(Token::new(TokenType::Assign, "::", "::", pos));
                    col += 2;
                }
                ':' => {
                    self.tokens.push(Token::new(TokenType::Colon, ":", ":", pos));
                    col += 1;
                }
                ',' => {
                    self.tokens.push(Token::new(TokenType::Comma, ",", ",", pos));
                    col += 1;
                }
                '[' => {
                    self.bracket_stack.push(pos);
                    self.tokens.push(Token::new(TokenType::LBracket, "[", "[", pos));
                    col += 1;
                }
                ']' => {
                    if self.bracket_stack.pop().is_none() {
                        self.diagnostics.push(
                            Diagnostic::new(Code::EUnexpectedBracket, "']' without a matching '['")
                                .at(pos)
                                .with_source_line(raw_line)
                                .expected_got("preceding '['", "']'"),
                        );
                    }
                    self.tokens.push(Token::new(TokenType::RBracket, "]", "]", pos));
                    col += 1;
                }
                '$' => {
                    col = self.read_variable(&chars, col, pos);
                }
                c if c.is_ascii_digit() || (c == '-' && next_is_digit(&chars, col + 1)) => {
                    col = self.read_number(&chars, col, pos);
                }
                c if is_bareword_start(c) => {
                    col = self.read_bareword(&chars, col, pos);
                }
                other => {
                    self.diagnostics.push(
                        Diagnostic::new(
                            Code::ETokenize,
                            format!("unknown character {}", char_name(other)),
                        )
                        .at(pos)
                        .with_source_line(raw_line)
                        .expected_got("OCTAVE token", format!("{:?}", other)),
                    );
                    col += 1;
                }
            }
        }
    }

    /// Operator recognition, Unicode canonical forms and ASCII aliases.
    /// Returns the consumed width in chars.
    fn try_read_operator(&mut self, chars: &[char], col: usize, pos: Position) -> Option<usize> {
        let ch = chars[col];
        let (kind, raw, text, width) = match ch {
            OP_FLOW => (TokenType::Flow, "→", "→", 1),
            OP_SYNTHESIS => (TokenType::Synthesis, "⊕", "⊕", 1),
            OP_CONCAT => (TokenType::Concat, "⧺", "⧺", 1),
            OP_TENSION => (TokenType::Tension, "⇌", "⇌", 1),
            OP_CONSTRAINT => (TokenType::Constraint, "∧", "∧", 1),
            OP_ALTERNATIVE => (TokenType::Alternative, "∨", "∨", 1),
            OP_SECTION => (TokenType::Section, "§", "§", 1),
            '@' => (TokenType::At, "@", "@", 1),
            '-' if chars.get(col + 1) == Some(&'>') => (TokenType::Flow, "->", "→", 2),
            '<' if chars.get(col + 1) == Some(&'-') && chars.get(col + 2) == Some(&'>') => {
                (TokenType::Tension, "<->", "⇌", 3)
            }
            '+' => (TokenType::Synthesis, "+", "⊕", 1),
            '~' => (TokenType::Concat, "~", "⧺", 1),
            '&' => (TokenType::Constraint, "&", "∧", 1),
            '|' => (TokenType::Alternative, "|", "∨", 1),
            '#' => (TokenType::Section, "#", "§", 1),
            _ => return None,
        };

        if raw != text {
            self.diagnostics.push(
                Diagnostic::new(
                    Code::W002,
                    format!("ASCII alias {:?} normalized to {:?}", raw, text),
                )
                .at(pos),
            );
        }
        self.tokens.push(Token::new(kind, raw, text, pos));
        Some(width)
    }

    /// Quoted strings: `"..."` with escapes, or `"""..."""` preserved
    /// verbatim (may span lines). Returns the cursor past the lexeme.
    fn read_string(&mut self, chars: &[char], start: usize, line_num: usize) -> usize {
        let pos = Position::new(line_num, start + 1);
        let triple =
            chars.get(start + 1) == Some(&'"') && chars.get(start + 2) == Some(&'"');

        if triple {
            return self.read_triple_string(chars, start, pos);
        }

        let mut raw = String::from("\"");
        let mut text = String::new();
        let mut col = start + 1;
        while col < chars.len() {
            let ch = chars[col];
            raw.push(ch);
            match ch {
                '"' => {
                    self.tokens.push(Token::new(TokenType::String, raw, text, pos));
                    return col + 1;
                }
                '\\' => {
                    col += 1;
                    match chars.get(col) {
                        Some('n') => {
                            raw.push('n');
                            text.push('\n');
                        }
                        Some('t') => {
                            raw.push('t');
                            text.push('\t');
                        }
                        Some('r') => {
                            raw.push('r');
                            text.push('\r');
                        }
                        Some('"') => {
                            raw.push('"');
                            text.push('"');
                        }
                        Some('\\') => {
                            raw.push('\\');
                            text.push('\\');
                        }
                        Some(other) => {
                            // Unknown escape kept literally.
                            raw.push(*other);
                            text.push('\\');
                            text.push(*other);
                        }
                        None => text.push('\\'),
                    }
                }
                other => text.push(other),
            }
            col += 1;
        }

        self.diagnostics.push(
            Diagnostic::new(Code::ETokenize, "unterminated string")
                .at(pos)
                .expected_got("closing '\"'", "end of line"),
        );
        self.tokens.push(Token::new(TokenType::String, raw, text, pos));
        chars.len()
    }

    /// Triple-quoted string; interior whitespace and newlines preserved in
    /// both `raw` and `text`. May consume following lines.
    fn read_triple_string(&mut self, chars: &[char], start: usize, pos: Position) -> usize {
        // Closing delimiter on the same line?
        let rest: String = chars[start + 3..].iter().collect();
        if let Some(end) = rest.find("\"\"\"") {
            let text = rest[..end].to_string();
            let raw = format!("\"\"\"{}\"\"\"", text);
            let consumed = text.chars().count();
            self.tokens.push(Token::new(TokenType::String, raw, text, pos));
            return start + 3 + consumed + 3;
        }

        // Spans lines: collect until a line containing the closer.
        let mut text = rest;
        let mut closed = false;
        let mut trailing = String::new();
        while self.line_idx + 1 < self.raw_lines.len() {
            self.line_idx += 1;
            let line = self.raw_lines[self.line_idx].clone();
            if let Some(end) = line.find("\"\"\"") {
                text.push('\n');
                text.push_str(&line[..end]);
                trailing = line[end + 3..].to_string();
                closed = true;
                break;
            }
            text.push('\n');
            text.push_str(&line);
        }
        if !closed {
            self.diagnostics.push(
                Diagnostic::new(Code::ETokenize, "unterminated triple-quoted string")
                    .at(pos)
                    .expected_got("closing '\"\"\"'", "end of input"),
            );
        }
        if !trailing.trim().is_empty() {
            self.diagnostics.push(
                Diagnostic::new(
                    Code::W001,
                    format!(
                        "content after closing triple quote dropped: {:?}",
                        trailing.trim()
                    ),
                )
                .at(Position::new(self.line_idx + 1, 1)),
            );
        }
        let raw = format!("\"\"\"{}\"\"\"", text);
        self.tokens.push(Token::new(TokenType::String, raw, text, pos));
        chars.len() // the remainder of the opening line was consumed
    }

    fn read_variable(&mut self, chars: &[char], start: usize, pos: Position) -> usize {
        let mut col = start + 1;
        let mut name = String::new();
        while col < chars.len() && (chars[col].is_alphanumeric() || chars[col] == '_') {
            name.push(chars[col]);
            col += 1;
        }
        if name.is_empty() {
            // A lone `$` (regex tails, currency text) stays a bareword.
            self.tokens.push(Token::new(TokenType::Ident, "$", "$", pos));
            return col;
        }
        // Optional role suffix: $2:driver
        let mut raw = format!("${}", name);
        if chars.get(col) == Some(&':')
            && chars
                .get(col + 1)
                .map(|c| c.is_alphabetic() || *c == '_')
                .unwrap_or(false)
        {
            raw.push(':');
            col += 1;
            while col < chars.len() && (chars[col].is_alphanumeric() || chars[col] == '_') {
                raw.push(chars[col]);
                col += 1;
            }
        }
        self.tokens
            .push(Token::new(TokenType::Variable, raw.clone(), raw, pos));
        col
    }

    fn read_number(&mut self, chars: &[char], start: usize, pos: Position) -> usize {
        let rest: String = chars[start..].iter().collect();

        // Semver before plain numbers: 1.2.3 must not lex as 1.2 + .3
        if !rest.starts_with('-') {
            if let Some(m) = version_pattern().find(&rest) {
                let raw = m.as_str().to_string();
                let width = raw.chars().count();
                self.tokens
                    .push(Token::new(TokenType::Version, raw.clone(), raw, pos));
                return start + width;
            }
        }

        let m = number_pattern()
            .find(&rest)
            .expect("digit-led input matches the number pattern");
        let raw = m.as_str().to_string();
        let width = raw.chars().count();
        self.tokens
            .push(Token::new(TokenType::Number, raw.clone(), raw, pos));
        start + width
    }

    fn read_bareword(&mut self, chars: &[char], start: usize, pos: Position) -> usize {
        let mut col = start;
        let mut word = String::new();
        while col < chars.len() {
            let ch = chars[col];
            if !is_bareword_char(ch) {
                break;
            }
            // `-` only ends a bareword when it starts a `->` arrow.
            if ch == '-' && chars.get(col + 1) == Some(&'>') {
                break;
            }
            if ch == '<' && chars.get(col + 1) == Some(&'-') && chars.get(col + 2) == Some(&'>') {
                break;
            }
            if ch == '/' && chars.get(col + 1) == Some(&'/') {
                break;
            }
            word.push(ch);
            col += 1;
        }

        let lowered = word.to_lowercase();
        match lowered.as_str() {
            "true" | "false" => {
                if word != lowered {
                    self.diagnostics.push(
                        Diagnostic::new(
                            Code::W001,
                            format!("boolean {:?} lowercased to {:?}", word, lowered),
                        )
                        .at(pos),
                    );
                }
                self.tokens
                    .push(Token::new(TokenType::Boolean, word, lowered, pos));
            }
            "null" => {
                if word != lowered {
                    self.diagnostics.push(
                        Diagnostic::new(Code::W001, format!("null literal {:?} lowercased", word))
                            .at(pos),
                    );
                }
                self.tokens
                    .push(Token::new(TokenType::Null, word, lowered, pos));
            }
            _ if word == "vs" => {
                // Word-boundary alias: bareword scanning already guarantees
                // `vsNOT_ALIAS` stays one word.
                self.diagnostics.push(
                    Diagnostic::new(Code::W002, "ASCII alias \"vs\" normalized to \"⇌\"").at(pos),
                );
                self.tokens.push(Token::new(TokenType::Tension, "vs", "⇌", pos));
            }
            _ => {
                self.tokens
                    .push(Token::new(TokenType::Ident, word.clone(), word, pos));
            }
        }
        col
    }

    fn push_newline(&mut self) {
        let line_num = self.line_idx + 1;
        let width = self
            .raw_lines
            .get(self.line_idx)
            .map(|l| l.chars().count())
            .unwrap_or(0);
        self.push_newline_at(Position::new(line_num, width + 1));
    }

    fn push_newline_at(&mut self, pos: Position) {
        self.tokens
            .push(Token::new(TokenType::Newline, "\n", "\n", pos));
    }
}

/// `===IDENT===` / `===END===`, column 0 only.
fn envelope_line(line: &str) -> Option<&str> {
    let trimmed = line.trim_end();
    if !trimmed.starts_with("===") || !trimmed.ends_with("===") || trimmed.len() < 7 {
        return None;
    }
    let inner = &trimmed[3..trimmed.len() - 3];
    if inner.is_empty() || inner.contains("===") {
        return None;
    }
    Some(inner)
}

fn invalid_ident_char(ident: &str) -> Option<char> {
    let mut chars = ident.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        Some(c) => return Some(c),
        None => return None,
    }
    chars.find(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
}

fn char_name(c: char) -> String {
    match c {
        '-' => "hyphen '-'".to_string(),
        ' ' => "space ' '".to_string(),
        '\t' => "tab".to_string(),
        '.' => "dot '.'".to_string(),
        other => format!("character {:?}", other),
    }
}

fn next_is_digit(chars: &[char], idx: usize) -> bool {
    chars.get(idx).map(|c| c.is_ascii_digit()).unwrap_or(false)
}

fn is_bareword_start(c: char) -> bool {
    is_bareword_char(c) && !c.is_ascii_digit()
}

/// Barewords take Unicode letters, digits, underscores and most symbol
/// characters; reserved operator codepoints and structural punctuation are
/// excluded.
fn is_bareword_char(c: char) -> bool {
    if c.is_whitespace() || c.is_control() {
        return false;
    }
    !matches!(
        c,
        '"' | '[' | ']' | ',' | ':' | '$' | '@' | '#' | '+' | '~' | '&' | '|'
    ) && !matches!(
        c,
        OP_FLOW
            | OP_SYNTHESIS
            | OP_CONCAT
            | OP_TENSION
            | OP_CONSTRAINT
            | OP_ALTERNATIVE
            | OP_SECTION
    )
}

fn version_pattern() -> &'static regex::Regex {
    static PATTERN: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    PATTERN.get_or_init(|| {
        regex::Regex::new(r"^\d+\.\d+\.\d+(?:-[0-9A-Za-z][0-9A-Za-z.\-]*)?").unwrap()
    })
}

fn number_pattern() -> &'static regex::Regex {
    static PATTERN: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    PATTERN.get_or_init(|| regex::Regex::new(r"^-?\d+(?:\.\d+)?(?:[eE][+-]?\d+)?").unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<TokenType> {
        tokenize(text)
            .tokens
            .iter()
            .map(|t| t.kind)
            .filter(|k| !matches!(k, TokenType::Newline | TokenType::Eof))
            .collect()
    }

    #[test]
    fn assignment_tokens() {
        assert_eq!(
            kinds("KEY::value"),
            vec![TokenType::Ident, TokenType::Assign, TokenType::Ident]
        );
    }

    #[test]
    fn ascii_tension_alias_warns() {
        let out = tokenize("A::Speed <-> Quality");
        let tension: Vec<_> = out
            .tokens
            .iter()
            .filter(|t| t.kind == TokenType::Tension)
            .collect();
        assert_eq!(tension.len(), 1);
        assert_eq!(tension[0].raw, "<->");
        assert_eq!(tension[0].text, "⇌");
        assert!(out.diagnostics.iter().any(|d| d.code == Code::W002));
    }

    #[test]
    fn vs_requires_word_boundary() {
        let out = tokenize("A::x vs y");
        assert!(out.tokens.iter().any(|t| t.kind == TokenType::Tension));
        let out = tokenize("A::vsNOT_ALIAS");
        assert!(!out.tokens.iter().any(|t| t.kind == TokenType::Tension));
        assert!(out
            .tokens
            .iter()
            .any(|t| t.kind == TokenType::Ident && t.raw == "vsNOT_ALIAS"));
    }

    #[test]
    fn number_raw_preserved() {
        let out = tokenize("N::1.50");
        let num = out
            .tokens
            .iter()
            .find(|t| t.kind == TokenType::Number)
            .unwrap();
        assert_eq!(num.raw, "1.50");
    }

    #[test]
    fn version_lexes_whole() {
        let out = tokenize("V::1.2.3-rc.1");
        let ver = out
            .tokens
            .iter()
            .find(|t| t.kind == TokenType::Version)
            .unwrap();
        assert_eq!(ver.raw, "1.2.3-rc.1");
    }

    #[test]
    fn unbalanced_bracket_reports_first_opener() {
        let out = tokenize("A::[1, [2, 3]");
        let err = out
            .diagnostics
            .iter()
            .find(|d| d.code == Code::EUnbalancedBracket)
            .unwrap();
        assert_eq!(err.position.unwrap().column, 4);
    }

    #[test]
    fn unexpected_closer_is_positioned() {
        let out = tokenize("A::1]");
        let err = out
            .diagnostics
            .iter()
            .find(|d| d.code == Code::EUnexpectedBracket)
            .unwrap();
        assert_eq!(err.position.unwrap().column, 5);
    }

    #[test]
    fn tab_in_indent_is_e005() {
        let out = tokenize("BLOCK:\n\tCHILD::1");
        assert!(out.diagnostics.iter().any(|d| d.code == Code::E005));
    }

    #[test]
    fn triple_string_spans_lines() {
        let out = tokenize("K::\"\"\"line one\nline two\"\"\"");
        let s = out
            .tokens
            .iter()
            .find(|t| t.kind == TokenType::String)
            .unwrap();
        assert_eq!(s.text, "line one\nline two");
        assert_eq!(s.embedded_newlines(), 1);
    }

    #[test]
    fn envelope_case_is_accepted_lexically() {
        let out = tokenize("===MyDoc===\nA::1\n===END===\n");
        let start = out
            .tokens
            .iter()
            .find(|t| t.kind == TokenType::EnvelopeStart)
            .unwrap();
        assert_eq!(start.text, "MyDoc");
        assert!(!out.has_errors());
    }

    #[test]
    fn envelope_hyphen_is_hard_error() {
        let out = tokenize("===BAD-NAME===\n===END===\n");
        let err = out
            .diagnostics
            .iter()
            .find(|d| d.code == Code::EInvalidEnvelopeId)
            .unwrap();
        assert!(err.message.contains("hyphen '-'"));
    }

    #[test]
    fn literal_zone_preserves_bytes() {
        let out = tokenize("CODE\n```python\nif x[0]:\n\treturn\n```\n");
        let zone = out
            .tokens
            .iter()
            .find(|t| t.kind == TokenType::LiteralZone)
            .unwrap();
        assert_eq!(zone.text, "if x[0]:\n\treturn");
        // Tabs and brackets inside the zone produce no diagnostics.
        assert!(out.diagnostics.is_empty());
    }
}
