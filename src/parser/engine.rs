//! Phase 2: lenient parsing engine
//!
//! Consumes the token stream line by line and builds the document tree.
//! The parser continues after every recoverable error: bad lines are
//! skipped to the next line at the same or shallower indentation, every
//! silent repair is attached as a warning, and the result is always
//! well-typed so downstream stages can keep reporting.

use std::collections::HashMap;

use crate::ast::{
    Assignment, Block, Comment, Document, Envelope, LiteralZone, Node, SectionMarker,
};
use crate::diagnostics::{Code, Diagnostic, Position};
use crate::lexer::{self, LexOutput, Token, TokenType};
use crate::parser::bracket::parse_target_tokens;
use crate::parser::values::{parse_value, ParseCtx};

/// Nesting depth beyond which W_DEEP_NESTING fires.
pub const MAX_COMFORT_DEPTH: usize = 100;

/// Name given to content that arrives without envelope delimiters.
pub const IMPLICIT_ENVELOPE: &str = "DOC";

#[derive(Debug, Clone)]
pub struct ParseOutput {
    pub document: Document,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseOutput {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.is_error())
    }
}

/// Tokenize and parse in one step. Lexer diagnostics come first in the
/// output, in source order.
pub fn parse(text: &str) -> ParseOutput {
    let lex = lexer::tokenize(text);
    parse_tokens(lex, text)
}

pub fn parse_tokens(lex: LexOutput, source: &str) -> ParseOutput {
    let mut engine = Engine {
        lines: group_lines(&lex.tokens),
        source_lines: source.lines().map(|l| l.to_string()).collect(),
        idx: 0,
        diagnostics: lex.diagnostics,
    };
    let document = engine.parse_document();
    ParseOutput {
        document,
        diagnostics: engine.diagnostics,
    }
}

/// One logical source line: its tokens, minus newline trivia.
#[derive(Debug, Clone)]
struct Line {
    indent: usize,
    tokens: Vec<Token>,
}

fn group_lines(tokens: &[Token]) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut current: Vec<Token> = Vec::new();
    for token in tokens {
        match token.kind {
            TokenType::Newline => {
                if !current.is_empty() {
                    lines.push(Line {
                        indent: current[0].position.column.saturating_sub(1),
                        tokens: std::mem::take(&mut current),
                    });
                }
            }
            TokenType::Eof => break,
            _ => current.push(token.clone()),
        }
    }
    if !current.is_empty() {
        lines.push(Line {
            indent: current[0].position.column.saturating_sub(1),
            tokens: current,
        });
    }
    lines
}

struct Engine {
    lines: Vec<Line>,
    source_lines: Vec<String>,
    idx: usize,
    diagnostics: Vec<Diagnostic>,
}

impl Engine {
    fn parse_document(&mut self) -> Document {
        let mut envelopes = Vec::new();

        while self.idx < self.lines.len() {
            let first = self.lines[self.idx].tokens[0].clone();
            match first.kind {
                TokenType::EnvelopeStart => {
                    self.idx += 1;
                    let nodes = self.parse_nodes(0);
                    match self.current_kind() {
                        Some(TokenType::EnvelopeEnd) => self.idx += 1,
                        _ => self.diagnostics.push(
                            Diagnostic::new(
                                Code::W001,
                                format!("envelope {:?} auto-closed at end of input", first.text),
                            )
                            .at(first.position)
                            .expected_got("===END===", "end of input"),
                        ),
                    }
                    envelopes.push(Envelope {
                        name: first.text.clone(),
                        implicit: false,
                        nodes,
                        position: first.position,
                    });
                }
                TokenType::EnvelopeEnd => {
                    self.diagnostics.push(
                        Diagnostic::new(Code::W001, "===END=== without an open envelope skipped")
                            .at(first.position),
                    );
                    self.idx += 1;
                }
                _ => {
                    // Envelope-less content: wrap in an implicit envelope
                    // that emits no delimiter lines.
                    let position = first.position;
                    let nodes = self.parse_nodes(0);
                    if !nodes.is_empty() {
                        envelopes.push(Envelope {
                            name: IMPLICIT_ENVELOPE.to_string(),
                            implicit: true,
                            nodes,
                            position,
                        });
                    }
                }
            }
        }

        Document::new(envelopes)
    }

    fn current_kind(&self) -> Option<TokenType> {
        self.lines.get(self.idx).map(|l| l.tokens[0].kind)
    }

    /// Parse the ordered children at `depth`. Returns when indentation
    /// falls below the expected level or an envelope delimiter appears.
    fn parse_nodes(&mut self, depth: usize) -> Vec<Node> {
        let expected_indent = depth * 2;
        let mut nodes: Vec<Node> = Vec::new();

        while self.idx < self.lines.len() {
            let mut line = self.lines[self.idx].clone();

            // An inline trailing comment parses as its own node so values
            // never swallow it.
            let mut trailing_comment = None;
            if line.tokens.len() > 1 && line.tokens.last().map(|t| t.kind) == Some(TokenType::Comment)
            {
                let comment = line.tokens.pop().unwrap();
                trailing_comment = Some(Comment {
                    text: comment.text,
                    position: comment.position,
                });
            }

            let first = &line.tokens[0];

            if matches!(
                first.kind,
                TokenType::EnvelopeStart | TokenType::EnvelopeEnd
            ) {
                break;
            }

            let mut indent = line.indent;
            if indent % 2 == 1 {
                self.diagnostics.push(
                    Diagnostic::new(
                        Code::W001,
                        format!("odd indentation of {} spaces treated as {}", indent, indent - 1),
                    )
                    .at(first.position),
                );
                indent -= 1;
            }
            if indent < expected_indent {
                break;
            }
            if indent > expected_indent {
                self.diagnostics.push(
                    Diagnostic::new(
                        Code::W001,
                        format!(
                            "unexpected indentation ({} spaces where {} were expected)",
                            indent, expected_indent
                        ),
                    )
                    .at(first.position)
                    .with_source_line(self.source_line(first.position.line)),
                );
            }

            if let Some(node) = self.parse_line(&line, depth) {
                nodes.push(node);
            }
            if let Some(comment) = trailing_comment {
                nodes.push(Node::Comment(comment));
            }
        }

        self.resolve_duplicates(nodes)
    }

    /// Dispatch one line. Advances `self.idx` past everything consumed.
    fn parse_line(&mut self, line: &Line, depth: usize) -> Option<Node> {
        let tokens = &line.tokens;
        let first = &tokens[0];

        match first.kind {
            TokenType::Comment => {
                self.idx += 1;
                Some(Node::Comment(Comment {
                    text: first.text.clone(),
                    position: first.position,
                }))
            }
            TokenType::Section => {
                self.idx += 1;
                self.parse_section(tokens)
            }
            TokenType::Ident => self.parse_keyed_line(tokens, depth),
            _ => {
                // Number-keyed and similar lenient assignments.
                if tokens.len() >= 2 && tokens[1].kind == TokenType::Assign {
                    self.diagnostics.push(
                        Diagnostic::new(
                            Code::W001,
                            format!("non-identifier key {:?} accepted leniently", first.raw),
                        )
                        .at(first.position),
                    );
                    self.idx += 1;
                    let rhs = self.collect_rhs(tokens[2..].to_vec());
                    let value = self.with_ctx(|ctx| parse_value(ctx, &rhs, false));
                    return Some(Node::Assignment(Assignment {
                        key: first.raw.clone(),
                        value,
                        position: first.position,
                    }));
                }
                self.diagnostics.push(
                    Diagnostic::new(
                        Code::W001,
                        format!("unparseable line dropped: {:?}", self.source_line(first.position.line)),
                    )
                    .at(first.position)
                    .with_source_line(self.source_line(first.position.line)),
                );
                self.idx += 1;
                None
            }
        }
    }

    /// Lines led by an identifier: assignment, block, annotated block,
    /// literal zone, or a bare line.
    fn parse_keyed_line(&mut self, tokens: &[Token], depth: usize) -> Option<Node> {
        let first = &tokens[0];
        let key = first.text.clone();

        match tokens.get(1).map(|t| t.kind) {
            Some(TokenType::Assign) => {
                self.idx += 1;
                let rhs = self.collect_rhs(tokens[2..].to_vec());
                let value = self.with_ctx(|ctx| parse_value(ctx, &rhs, false));
                Some(Node::Assignment(Assignment {
                    key,
                    value,
                    position: first.position,
                }))
            }
            Some(TokenType::Colon) if tokens.len() == 2 => {
                self.idx += 1;
                self.open_block(key, None, depth, first.position)
            }
            Some(TokenType::Colon) => {
                // KEY: value - the single most common authoring mistake.
                self.diagnostics.push(
                    Diagnostic::new(
                        Code::E001,
                        format!(
                            "'{}: ...' uses a single colon; write '{}::value' for assignment (':' only opens a block)",
                            key, key
                        ),
                    )
                    .at(tokens[1].position)
                    .with_source_line(self.source_line(first.position.line))
                    .expected_got("::", ":"),
                );
                self.idx += 1;
                let rhs = self.collect_rhs(tokens[2..].to_vec());
                let value = self.with_ctx(|ctx| parse_value(ctx, &rhs, false));
                Some(Node::Assignment(Assignment {
                    key,
                    value,
                    position: first.position,
                }))
            }
            Some(TokenType::LBracket) => self.parse_annotated_block(tokens, depth),
            None => {
                // Bare identifier: a literal zone opener when the next
                // line is its fence, otherwise an audited drop.
                if let Some(next) = self.lines.get(self.idx + 1) {
                    if next.tokens[0].kind == TokenType::LiteralZone {
                        let zone_token = next.tokens[0].clone();
                        self.idx += 2;
                        return Some(self.literal_zone_node(key, &zone_token, first.position));
                    }
                }
                self.diagnostics.push(
                    Diagnostic::new(
                        Code::W001,
                        format!("bare line {:?} dropped (no '::' value, no block ':')", key),
                    )
                    .at(first.position)
                    .with_source_line(self.source_line(first.position.line))
                    .expected_got("KEY::value or KEY:", key.as_str()),
                );
                self.idx += 1;
                None
            }
            _ => {
                self.diagnostics.push(
                    Diagnostic::new(
                        Code::W001,
                        format!("unparseable line after {:?} dropped", key),
                    )
                    .at(first.position)
                    .with_source_line(self.source_line(first.position.line)),
                );
                self.idx += 1;
                None
            }
        }
    }

    /// `KEY[→§TARGET]:` - block with a routing annotation.
    fn parse_annotated_block(&mut self, tokens: &[Token], depth: usize) -> Option<Node> {
        let first = &tokens[0];
        let close = crate::parser::values::matching_bracket(tokens, 1);
        let shape_ok = close
            .map(|c| c + 2 == tokens.len() && tokens[c + 1].kind == TokenType::Colon)
            .unwrap_or(false);

        if !shape_ok {
            self.diagnostics.push(
                Diagnostic::new(
                    Code::W001,
                    format!("malformed target annotation on {:?} dropped", first.text),
                )
                .at(first.position)
                .with_source_line(self.source_line(first.position.line))
                .expected_got("KEY[→§TARGET]:", self.source_line(first.position.line)),
            );
            self.idx += 1;
            return None;
        }

        let close = close.unwrap();
        let annotation = &tokens[2..close];
        let target = if annotation.first().map(|t| t.kind) == Some(TokenType::Flow) {
            let target_tokens = annotation[1..].to_vec();
            let position = first.position;
            self.with_ctx(|ctx| parse_target_tokens(ctx, &target_tokens, position))
        } else {
            self.diagnostics.push(
                Diagnostic::new(
                    Code::W001,
                    "target annotation without leading → dropped",
                )
                .at(first.position),
            );
            None
        };

        self.idx += 1;
        self.open_block(first.text.clone(), target, depth, first.position)
    }

    fn open_block(
        &mut self,
        key: String,
        target: Option<crate::ast::Target>,
        depth: usize,
        position: Position,
    ) -> Option<Node> {
        if depth + 1 > MAX_COMFORT_DEPTH {
            self.diagnostics.push(
                Diagnostic::new(
                    Code::WDeepNesting,
                    format!("block {:?} nests deeper than {}", key, MAX_COMFORT_DEPTH),
                )
                .at(position),
            );
        }
        let children = self.parse_nodes(depth + 1);
        Some(Node::Block(Block {
            key,
            target,
            children,
            depth,
            position,
        }))
    }

    fn parse_section(&mut self, tokens: &[Token]) -> Option<Node> {
        let first = &tokens[0];
        let id = match tokens.get(1) {
            Some(t) if matches!(t.kind, TokenType::Ident | TokenType::Number) => t.text.clone(),
            _ => {
                self.diagnostics.push(
                    Diagnostic::new(Code::W001, "section marker without an id dropped")
                        .at(first.position)
                        .with_source_line(self.source_line(first.position.line)),
                );
                return None;
            }
        };

        let label = match tokens.get(2).map(|t| t.kind) {
            Some(TokenType::Colon) => {
                let text = tokens[3..]
                    .iter()
                    .map(|t| t.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                if text.is_empty() {
                    None
                } else {
                    Some(text)
                }
            }
            _ => None,
        };

        Some(Node::Section(SectionMarker {
            id,
            label,
            position: first.position,
        }))
    }

    fn literal_zone_node(&mut self, key: String, zone_token: &Token, position: Position) -> Node {
        // The token's raw begins with the opening fence line.
        let first_line = zone_token.raw.lines().next().unwrap_or("");
        let trimmed = first_line.trim_start();
        let fence_width = trimmed.chars().take_while(|c| *c == '`').count();
        let info = trimmed[fence_width..].trim().to_string();
        Node::LiteralZone(LiteralZone {
            key,
            info,
            content: zone_token.text.clone(),
            fence_width,
            position,
        })
    }

    /// RHS tokens, absorbing continuation lines while a bracket stays
    /// open (multi-line lists).
    fn collect_rhs(&mut self, mut tokens: Vec<Token>) -> Vec<Token> {
        let mut depth = bracket_delta(&tokens);
        while depth > 0 && self.idx < self.lines.len() {
            let line = self.lines[self.idx].clone();
            if matches!(
                line.tokens[0].kind,
                TokenType::EnvelopeStart | TokenType::EnvelopeEnd
            ) {
                break;
            }
            depth += bracket_delta(&line.tokens);
            tokens.extend(line.tokens);
            self.idx += 1;
        }
        tokens
    }

    /// Later occurrence wins; both positions are reported.
    fn resolve_duplicates(&mut self, nodes: Vec<Node>) -> Vec<Node> {
        let mut seen: HashMap<String, (usize, Position)> = HashMap::new();
        let mut drop: Vec<usize> = Vec::new();

        for (idx, node) in nodes.iter().enumerate() {
            let Some(key) = node.key() else { continue };
            if let Some((earlier_idx, earlier_pos)) = seen.get(key).copied() {
                self.diagnostics.push(
                    Diagnostic::new(
                        Code::WDuplicateKey,
                        format!(
                            "duplicate key {:?} at {} (earlier at {}); later value wins",
                            key,
                            node.position(),
                            earlier_pos
                        ),
                    )
                    .at(node.position()),
                );
                drop.push(earlier_idx);
            }
            seen.insert(key.to_string(), (idx, node.position()));
        }

        if drop.is_empty() {
            return nodes;
        }
        nodes
            .into_iter()
            .enumerate()
            .filter(|(idx, _)| !drop.contains(idx))
            .map(|(_, node)| node)
            .collect()
    }

    fn with_ctx<T>(&mut self, f: impl FnOnce(&mut ParseCtx<'_>) -> T) -> T {
        let mut ctx = ParseCtx {
            source_lines: &self.source_lines,
            diagnostics: &mut self.diagnostics,
        };
        f(&mut ctx)
    }

    fn source_line(&self, line: usize) -> &str {
        self.source_lines
            .get(line.saturating_sub(1))
            .map(|s| s.as_str())
            .unwrap_or("")
    }
}

fn bracket_delta(tokens: &[Token]) -> i32 {
    tokens.iter().fold(0i32, |depth, token| match token.kind {
        TokenType::LBracket => depth + 1,
        TokenType::RBracket => depth - 1,
        _ => depth,
    })
}
