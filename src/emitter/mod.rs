//! Phase 5: Emitter - canonical text and projections
//!
//! The canonical emitter prints deterministically: two-space indent, one
//! entity per line, Unicode operators, preserved numeric lexemes, a single
//! trailing newline. Emitting a canonical tree twice yields byte-identical
//! output, and re-parsing canonical text reaches a fixed point.
//!
//! ## Modules
//!
//! - [`json`] - JSON projection (section markers stripped, loss recorded)
//! - [`yaml`] - YAML projection (block style mirror of JSON)
//! - [`markdown`] - Markdown projection (headers, bullets, fenced code)

pub mod json;
pub mod markdown;
pub mod yaml;

use serde::{Deserialize, Serialize};

use crate::ast::flow::{FlowExpr, FlowOp};
use crate::ast::{Document, Envelope, Node, Value};
use crate::normalizer::is_bare_safe;

/// Every projection declares its loss tier; callers rely on `lossy` to
/// decide whether round-tripping is safe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub output: String,
    pub lossy: bool,
    pub fields_omitted: Vec<String>,
}

impl Projection {
    pub fn lossless(output: String) -> Self {
        Self {
            output,
            lossy: false,
            fields_omitted: Vec::new(),
        }
    }
}

/// Canonical OCTAVE text for a normalized document.
pub fn emit_canonical(document: &Document) -> String {
    let mut out = String::new();
    for envelope in &document.envelopes {
        emit_envelope(&mut out, envelope);
    }
    out
}

fn emit_envelope(out: &mut String, envelope: &Envelope) {
    if !envelope.implicit {
        out.push_str("===");
        out.push_str(&envelope.name);
        out.push_str("===\n");
    }

    // Explicit work stack instead of recursion: documents may nest beyond
    // depth 100.
    enum Task<'a> {
        Node(&'a Node, usize),
    }
    let mut stack: Vec<Task<'_>> = envelope
        .nodes
        .iter()
        .rev()
        .map(|n| Task::Node(n, 0))
        .collect();

    while let Some(Task::Node(node, depth)) = stack.pop() {
        let indent = "  ".repeat(depth);
        match node {
            Node::Assignment(assignment) => {
                out.push_str(&indent);
                out.push_str(&assignment.key);
                out.push_str("::");
                out.push_str(&emit_value(&assignment.value));
                out.push('\n');
            }
            Node::Block(block) => {
                out.push_str(&indent);
                out.push_str(&block.key);
                if let Some(target) = &block.target {
                    out.push_str("[→");
                    out.push_str(&target.canonical());
                    out.push(']');
                }
                out.push_str(":\n");
                for child in block.children.iter().rev() {
                    stack.push(Task::Node(child, depth + 1));
                }
            }
            Node::Section(section) => {
                out.push_str(&indent);
                out.push('§');
                out.push_str(&section.id);
                if let Some(label) = &section.label {
                    out.push_str(": ");
                    out.push_str(label);
                }
                out.push('\n');
            }
            Node::Comment(comment) => {
                out.push_str(&indent);
                out.push_str("// ");
                out.push_str(&comment.text);
                out.push('\n');
            }
            Node::LiteralZone(zone) => {
                let fence = "`".repeat(zone.fence_width.max(3));
                out.push_str(&indent);
                out.push_str(&zone.key);
                out.push('\n');
                out.push_str(&indent);
                out.push_str(&fence);
                if !zone.info.is_empty() {
                    out.push_str(&zone.info);
                }
                out.push('\n');
                out.push_str(&zone.content);
                out.push('\n');
                out.push_str(&indent);
                out.push_str(&fence);
                out.push('\n');
            }
        }
    }

    if !envelope.implicit {
        out.push_str("===END===\n");
    }
}

/// Canonical rendering of a value.
pub fn emit_value(value: &Value) -> String {
    match value {
        Value::Str { value, quoted } => {
            if *quoted || !is_bare_safe(value) {
                quote_string(value)
            } else {
                value.clone()
            }
        }
        Value::Number { raw, .. } => raw.clone(),
        Value::Boolean(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Version(v) => v.clone(),
        Value::Variable(v) => v.clone(),
        Value::SectionRef(s) => format!("§{}", s),
        Value::ColonPath(parts) => parts.join(":"),
        Value::List(items) => {
            let rendered: Vec<String> = items.iter().map(emit_value).collect();
            // A single-element list keeps its trailing comma: without it,
            // [x] would re-read as a bare bracketed scalar.
            if rendered.len() == 1 {
                format!("[{},]", rendered[0])
            } else {
                format!("[{}]", rendered.join(", "))
            }
        }
        Value::InlineMap(entries) => {
            let rendered: Vec<String> = entries
                .iter()
                .map(|(k, v)| format!("{}::{}", k, emit_value(v)))
                .collect();
            format!("[{}]", rendered.join(", "))
        }
        Value::Holographic(pattern) => {
            let mut out = String::from("[");
            out.push_str(&emit_value(&pattern.example));
            for atom in &pattern.constraints {
                out.push('∧');
                out.push_str(&atom.name);
                if let Some(args) = &atom.args {
                    out.push('[');
                    out.push_str(args);
                    out.push(']');
                }
            }
            if let Some(target) = &pattern.target {
                out.push('→');
                out.push_str(&target.canonical());
            }
            out.push(']');
            out
        }
        Value::Flow(expr) => format!("[{}]", emit_flow(expr)),
    }
}

/// Render a flow expression without its outer brackets. Sub-expressions
/// are re-bracketed exactly where precedence would otherwise reshape the
/// tree on re-parse.
fn emit_flow(expr: &FlowExpr) -> String {
    match expr {
        FlowExpr::Atom(value) => emit_value(value),
        FlowExpr::Binary { op, lhs, rhs } => {
            let lhs_text = emit_operand(lhs, *op, true);
            let rhs_text = emit_operand(rhs, *op, false);
            format!("{}{}{}", lhs_text, op.symbol(), rhs_text)
        }
    }
}

fn emit_operand(child: &FlowExpr, parent: FlowOp, is_lhs: bool) -> String {
    let needs_brackets = match child {
        FlowExpr::Atom(_) => false,
        FlowExpr::Binary { op: child_op, .. } => {
            let (parent_bp, _) = parent.binding_power();
            let (child_bp, _) = child_op.binding_power();
            let right_assoc = parent == FlowOp::Flow;
            if child_bp < parent_bp {
                true
            } else if child_bp == parent_bp {
                // Same precedence level: the associativity side re-parses
                // naturally, the other side needs explicit grouping.
                if right_assoc {
                    is_lhs
                } else {
                    !is_lhs
                }
            } else {
                false
            }
        }
    };
    let text = emit_flow(child);
    if needs_brackets {
        format!("[{}]", text)
    } else {
        text
    }
}

fn quote_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

/// Parse the emitter's own output and compare: the canonical fixed point.
/// Used by tests and by authoring-mode ejection.
pub fn verify_round_trip(canonical: &str) -> bool {
    let reparsed = crate::parser::parse(canonical);
    let normalized = crate::normalizer::normalize(reparsed.document);
    emit_canonical(&normalized.document) == canonical
}
