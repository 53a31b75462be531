//! Abstract syntax tree for OCTAVE documents
//!
//! The AST is a recursive algebraic structure: a `Document` owns ordered
//! `Envelope`s, each owning ordered `Node`s. Amendment produces a new
//! `Document`; nothing here mutates in place behind the caller's back.
//!
//! ## Modules
//!
//! - [`value`] - the `Value` sum type (assignment right-hand sides)
//! - [`flow`] - flow expressions and the operator precedence table
//! - [`target`] - routing targets (builtin / file / named / multi)

pub mod flow;
pub mod target;
pub mod value;

pub use flow::{FlowExpr, FlowOp};
pub use target::{BuiltinTarget, Target};
pub use value::{ConstraintAtom, HolographicPattern, Value};

use serde::{Deserialize, Serialize};

use crate::diagnostics::Position;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub envelopes: Vec<Envelope>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Identifier as written; the normalizer canonicalizes to UPPER_SNAKE.
    pub name: String,
    /// True for content that arrived without `===NAME===` delimiters.
    /// Implicit envelopes emit no delimiter lines.
    pub implicit: bool,
    pub nodes: Vec<Node>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    Assignment(Assignment),
    Block(Block),
    Section(SectionMarker),
    Comment(Comment),
    LiteralZone(LiteralZone),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub key: String,
    pub value: Value,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub key: String,
    /// `KEY[→§TARGET]:` annotation; children inherit it unless they carry
    /// their own.
    pub target: Option<Target>,
    pub children: Vec<Node>,
    /// Nesting depth, 0 for top level. Indentation is depth * 2 spaces.
    pub depth: usize,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionMarker {
    /// Numeric or identifier section id.
    pub id: String,
    pub label: Option<String>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteralZone {
    pub key: String,
    /// Info tag after the opening fence, may be empty.
    pub info: String,
    /// Verbatim bytes between the fences.
    pub content: String,
    pub fence_width: usize,
    pub position: Position,
}

impl Node {
    pub fn key(&self) -> Option<&str> {
        match self {
            Node::Assignment(a) => Some(&a.key),
            Node::Block(b) => Some(&b.key),
            Node::LiteralZone(z) => Some(&z.key),
            Node::Section(_) | Node::Comment(_) => None,
        }
    }

    pub fn position(&self) -> Position {
        match self {
            Node::Assignment(a) => a.position,
            Node::Block(b) => b.position,
            Node::Section(s) => s.position,
            Node::Comment(c) => c.position,
            Node::LiteralZone(z) => z.position,
        }
    }
}

/// Aggregate counts reported on validate responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DocumentStats {
    pub envelope_count: usize,
    pub node_count: usize,
    pub max_depth: usize,
}

impl Document {
    pub fn new(envelopes: Vec<Envelope>) -> Self {
        Self { envelopes }
    }

    pub fn stats(&self) -> DocumentStats {
        let mut stats = DocumentStats {
            envelope_count: self.envelopes.len(),
            ..Default::default()
        };
        // Explicit work stack: document nesting may exceed recursion
        // comfort.
        let mut stack: Vec<(&Node, usize)> = Vec::new();
        for envelope in &self.envelopes {
            for node in &envelope.nodes {
                stack.push((node, 1));
            }
        }
        while let Some((node, depth)) = stack.pop() {
            stats.node_count += 1;
            stats.max_depth = stats.max_depth.max(depth);
            if let Node::Block(block) = node {
                for child in &block.children {
                    stack.push((child, depth + 1));
                }
            }
        }
        stats
    }

    /// Look up a node by dot path, e.g. `META.STATUS`. The first segment
    /// may name an envelope; otherwise all envelopes are searched.
    pub fn lookup(&self, path: &[&str]) -> Option<&Node> {
        if path.is_empty() {
            return None;
        }
        for envelope in &self.envelopes {
            if envelope.name == path[0] && path.len() > 1 {
                if let Some(node) = lookup_in(&envelope.nodes, &path[1..]) {
                    return Some(node);
                }
            }
            if let Some(node) = lookup_in(&envelope.nodes, path) {
                return Some(node);
            }
        }
        None
    }
}

fn lookup_in<'a>(nodes: &'a [Node], path: &[&str]) -> Option<&'a Node> {
    let (head, rest) = path.split_first()?;
    for node in nodes {
        if node.key() == Some(head) {
            if rest.is_empty() {
                return Some(node);
            }
            if let Node::Block(block) = node {
                return lookup_in(&block.children, rest);
            }
            return None;
        }
    }
    None
}
