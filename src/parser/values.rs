//! Value resolution for assignment right-hand sides
//!
//! Resolution order: quoted string (triple or plain) -> bracketed value ->
//! section ref -> variable -> number/boolean/null/version -> colon path ->
//! multi-word bareword coalescing.
//!
//! Outside brackets an RHS run of barewords and flow operators coalesces
//! into one canonical STRING (`TENSION::Speed ⇌ Quality` becomes the
//! string "Speed ⇌ Quality", audited as W_MULTIWORD). The full operator
//! grammar only applies inside `[ ]`.

use crate::ast::value::Value;
use crate::diagnostics::{Code, Diagnostic};
use crate::lexer::{Token, TokenType};

/// Shared context threaded through the value parsers: the raw source for
/// constructor-argument slicing, and the audit channel.
pub(crate) struct ParseCtx<'a> {
    pub source_lines: &'a [String],
    pub diagnostics: &'a mut Vec<Diagnostic>,
}

impl ParseCtx<'_> {
    /// Slice raw source text between two columns of a line (1-indexed,
    /// end-exclusive). Used for constraint constructor arguments so regex
    /// metacharacters bypass the value grammar entirely.
    pub fn raw_slice(&self, line: usize, start_col: usize, end_col: usize) -> String {
        let Some(text) = self.source_lines.get(line.saturating_sub(1)) else {
            return String::new();
        };
        text.chars()
            .skip(start_col.saturating_sub(1))
            .take(end_col.saturating_sub(start_col))
            .collect()
    }
}

/// Parse an RHS token run into a value. `in_brackets` selects between the
/// flow-expression grammar and top-level coalescing.
pub(crate) fn parse_value(ctx: &mut ParseCtx<'_>, tokens: &[Token], in_brackets: bool) -> Value {
    match tokens {
        [] => {
            ctx.diagnostics.push(Diagnostic::new(
                Code::W001,
                "empty value treated as null",
            ));
            Value::Null
        }
        [single] if !matches!(single.kind, TokenType::LBracket) => {
            atom_value(ctx, single)
        }
        [section, name]
            if section.kind == TokenType::Section
                && matches!(name.kind, TokenType::Ident | TokenType::Number) =>
        {
            Value::SectionRef(name.text.clone())
        }
        _ => {
            // Bracketed value when the run opens with `[` and the matching
            // closer ends it.
            if tokens[0].kind == TokenType::LBracket {
                if let Some(close) = matching_bracket(tokens, 0) {
                    if close == tokens.len() - 1 {
                        return crate::parser::bracket::parse_bracketed(
                            ctx,
                            &tokens[1..close],
                            tokens[0].position,
                        );
                    }
                }
            }

            if let Some(path) = try_colon_path(tokens) {
                return path;
            }

            if in_brackets {
                crate::parser::flow_expr::parse_flow(ctx, tokens)
            } else {
                coalesce(ctx, tokens)
            }
        }
    }
}

/// Single-token values.
pub(crate) fn atom_value(ctx: &mut ParseCtx<'_>, token: &Token) -> Value {
    match token.kind {
        TokenType::String => Value::Str {
            value: token.text.clone(),
            quoted: true,
        },
        TokenType::Number => Value::number(token.raw.clone()),
        TokenType::Boolean => Value::Boolean(token.text == "true"),
        TokenType::Null => Value::Null,
        TokenType::Version => Value::Version(token.raw.clone()),
        TokenType::Variable => Value::Variable(token.text.clone()),
        TokenType::Ident => Value::Str {
            value: token.text.clone(),
            quoted: false,
        },
        _ => {
            ctx.diagnostics.push(
                Diagnostic::new(
                    Code::W001,
                    format!("unexpected token {:?} treated as string", token.raw),
                )
                .at(token.position),
            );
            Value::Str {
                value: token.text.clone(),
                quoted: true,
            }
        }
    }
}

/// `A:B:C` - identifiers joined by colons with no interior whitespace.
fn try_colon_path(tokens: &[Token]) -> Option<Value> {
    if tokens.len() < 3 || tokens.len() % 2 == 0 {
        return None;
    }
    let mut parts = Vec::new();
    for (idx, token) in tokens.iter().enumerate() {
        if idx % 2 == 0 {
            if token.kind != TokenType::Ident {
                return None;
            }
            parts.push(token.text.clone());
        } else if token.kind != TokenType::Colon {
            return None;
        }
        // Adjacency: a colon path has no spaces around its colons.
        if idx > 0 {
            let prev = &tokens[idx - 1];
            if prev.position.line != token.position.line
                || prev.end_column() != token.position.column
            {
                return None;
            }
        }
    }
    Some(Value::ColonPath(parts))
}

/// Join a run of barewords and operators into one canonical STRING.
/// Adjacent tokens keep their adjacency; separated tokens collapse to a
/// single space. Each ASCII alias was already rewritten (and audited) by
/// the lexer, so the joined text is canonical Unicode.
fn coalesce(ctx: &mut ParseCtx<'_>, tokens: &[Token]) -> Value {
    let mut text = String::new();
    let mut prev: Option<&Token> = None;

    for token in tokens {
        if token.kind == TokenType::Constraint {
            ctx.diagnostics.push(
                Diagnostic::new(
                    Code::EConstraintOutsideBrackets,
                    "∧ is only meaningful inside [ ]",
                )
                .at(token.position)
                .expected_got("[example∧CONSTRAINT...]", "bare ∧"),
            );
        }
        if let Some(prev) = prev {
            let adjacent = prev.position.line == token.position.line
                && prev.end_column() == token.position.column;
            if !adjacent {
                text.push(' ');
            }
        }
        text.push_str(&token.text);
        prev = Some(token);
    }

    if tokens.len() > 1 {
        ctx.diagnostics.push(
            Diagnostic::new(
                Code::WMultiword,
                format!("multi-word value coalesced to string {:?}", text),
            )
            .at(tokens[0].position),
        );
    }

    Value::Str {
        value: text,
        quoted: true,
    }
}

/// Index of the bracket matching the opener at `open_idx`, if present.
pub(crate) fn matching_bracket(tokens: &[Token], open_idx: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, token) in tokens.iter().enumerate().skip(open_idx) {
        match token.kind {
            TokenType::LBracket => depth += 1,
            TokenType::RBracket => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}
