//! Flow expression parsing
//!
//! A Pratt loop keyed on the operator table in [`crate::ast::flow`].
//! TENSION's binary-only rule is enforced here: the loop refuses to
//! consume a second `⇌` whose left operand is already a tension
//! (E_TENSION_CHAIN).

use crate::ast::flow::{FlowExpr, FlowOp};
use crate::ast::value::Value;
use crate::diagnostics::{Code, Diagnostic};
use crate::lexer::{Token, TokenType};
use crate::parser::values::{atom_value, ParseCtx};

/// Parse a token run (inside brackets) as a flow expression. A single
/// atom collapses to its plain value.
pub(crate) fn parse_flow(ctx: &mut ParseCtx<'_>, tokens: &[Token]) -> Value {
    let mut cursor = Cursor { tokens, idx: 0 };
    let expr = expr_bp(ctx, &mut cursor, 0);

    if cursor.idx < tokens.len() {
        let tok = &tokens[cursor.idx];
        ctx.diagnostics.push(
            Diagnostic::new(
                Code::W001,
                format!("trailing tokens after expression dropped: {:?}", tok.raw),
            )
            .at(tok.position),
        );
    }

    match expr {
        FlowExpr::Atom(value) => value,
        binary => Value::Flow(Box::new(binary)),
    }
}

struct Cursor<'t> {
    tokens: &'t [Token],
    idx: usize,
}

impl<'t> Cursor<'t> {
    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.idx)
    }

    fn advance(&mut self) -> Option<&'t Token> {
        let tok = self.tokens.get(self.idx);
        self.idx += 1;
        tok
    }
}

fn expr_bp(ctx: &mut ParseCtx<'_>, cursor: &mut Cursor<'_>, min_bp: u8) -> FlowExpr {
    let mut lhs = parse_operand(ctx, cursor);

    while let Some(tok) = cursor.peek() {
        let op = match FlowOp::from_token(tok.kind) {
            Some(op) => op,
            None => break,
        };
        let (left_bp, right_bp) = op.binding_power();
        if left_bp < min_bp {
            break;
        }

        // TENSION is strictly binary: A ⇌ B ⇌ C is a parse error, not a
        // left fold.
        if op == FlowOp::Tension && lhs.is_tension() {
            ctx.diagnostics.push(
                Diagnostic::new(
                    Code::ETensionChain,
                    "⇌ takes exactly two operands; chaining is not allowed",
                )
                .at(tok.position)
                .expected_got("a single ⇌ per expression", "a second ⇌"),
            );
        }

        cursor.advance();
        let rhs = expr_bp(ctx, cursor, right_bp);
        lhs = FlowExpr::binary(op, lhs, rhs);
    }

    lhs
}

fn parse_operand(ctx: &mut ParseCtx<'_>, cursor: &mut Cursor<'_>) -> FlowExpr {
    let Some(tok) = cursor.peek() else {
        ctx.diagnostics.push(Diagnostic::new(
            Code::W001,
            "empty operand in expression treated as null",
        ));
        return FlowExpr::Atom(Value::Null);
    };

    match tok.kind {
        // Nested bracket group: collect to the matching closer and
        // re-enter bracketed-value parsing.
        TokenType::LBracket => {
            let open = cursor.advance().unwrap();
            let start = cursor.idx;
            let mut depth = 1usize;
            while let Some(inner) = cursor.peek() {
                match inner.kind {
                    TokenType::LBracket => depth += 1,
                    TokenType::RBracket => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
                cursor.advance();
            }
            let inner = &cursor.tokens[start..cursor.idx];
            cursor.advance(); // closing bracket
            let value = crate::parser::bracket::parse_bracketed(ctx, inner, open.position);
            FlowExpr::Atom(value)
        }
        TokenType::Section => {
            cursor.advance();
            match cursor.peek() {
                Some(name)
                    if matches!(name.kind, TokenType::Ident | TokenType::Number) =>
                {
                    let name = cursor.advance().unwrap();
                    FlowExpr::Atom(Value::SectionRef(name.text.clone()))
                }
                _ => {
                    ctx.diagnostics.push(
                        Diagnostic::new(Code::W001, "§ without a section name treated as null")
                            .at(tok.position),
                    );
                    FlowExpr::Atom(Value::Null)
                }
            }
        }
        _ => {
            let first = cursor.advance().unwrap();
            // A run of adjacent bare atoms coalesces into one string
            // operand, same as on top-level value lines.
            let mut run: Vec<&Token> = vec![first];
            while let Some(next) = cursor.peek() {
                if is_atom_token(next.kind) {
                    run.push(next);
                    cursor.advance();
                } else {
                    break;
                }
            }
            if run.len() == 1 {
                return FlowExpr::Atom(atom_value(ctx, first));
            }

            let mut text = String::new();
            for (idx, token) in run.iter().enumerate() {
                if idx > 0 {
                    let prev = run[idx - 1];
                    let adjacent = prev.position.line == token.position.line
                        && prev.end_column() == token.position.column;
                    if !adjacent {
                        text.push(' ');
                    }
                }
                text.push_str(&token.text);
            }
            ctx.diagnostics.push(
                Diagnostic::new(
                    Code::WMultiword,
                    format!("multi-word operand coalesced to string {:?}", text),
                )
                .at(first.position),
            );
            FlowExpr::Atom(Value::Str {
                value: text,
                quoted: true,
            })
        }
    }
}

fn is_atom_token(kind: TokenType) -> bool {
    matches!(
        kind,
        TokenType::Ident
            | TokenType::String
            | TokenType::Number
            | TokenType::Boolean
            | TokenType::Null
            | TokenType::Version
            | TokenType::Variable
    )
}
