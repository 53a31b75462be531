//! Dot-path amendment
//!
//! Changes address fields by dot path (`META.STATUS`) and carry tri-state
//! values: a concrete value sets, the `DELETE` sentinel removes the field,
//! and JSON `null` sets the OCTAVE null literal (present, null - distinct
//! from deleted). Amendment builds a new tree state; on any failure the
//! document is left as it was.

use crate::ast::{Assignment, Block, Document, Envelope, Node, Value};
use crate::diagnostics::{Code, Diagnostic, Position};
use crate::parser::IMPLICIT_ENVELOPE;

/// The delete sentinel accepted in change sets.
pub const DELETE_SENTINEL: &str = "DELETE";

#[derive(Debug, Clone, PartialEq)]
pub enum Amendment {
    Set(Value),
    Delete,
    SetNull,
}

impl Amendment {
    /// Interpret a JSON change value: `null` -> null literal, the string
    /// `"DELETE"` -> delete, anything else -> set.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Amendment::SetNull,
            serde_json::Value::String(s) if s == DELETE_SENTINEL => Amendment::Delete,
            other => Amendment::Set(json_to_value(other)),
        }
    }
}

fn json_to_value(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::Number(n) => Value::Number {
            raw: n.to_string(),
            value: n.as_f64().unwrap_or(f64::NAN),
        },
        serde_json::Value::String(s) => Value::Str {
            value: s.clone(),
            quoted: false,
        },
        serde_json::Value::Array(items) => Value::List(items.iter().map(json_to_value).collect()),
        serde_json::Value::Object(entries) => Value::InlineMap(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), json_to_value(v)))
                .collect(),
        ),
    }
}

/// Apply one amendment at `path`. Intermediate blocks are created for
/// sets; deletes of absent fields are a no-op.
pub fn apply(document: &mut Document, path: &str, amendment: &Amendment) -> Result<(), Diagnostic> {
    let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return Err(Diagnostic::new(
            Code::E004,
            "amendment path must not be empty",
        ));
    }

    // A leading segment naming an envelope scopes the rest to it.
    let (envelope, segments) = select_envelope(document, &segments, amendment)?;
    let Some(envelope) = envelope else {
        // Delete against a document without a matching envelope.
        return Ok(());
    };

    amend_nodes(&mut envelope.nodes, &segments, path, amendment)
}

fn select_envelope<'a, 'b>(
    document: &'a mut Document,
    segments: &[&'b str],
    amendment: &Amendment,
) -> Result<(Option<&'a mut Envelope>, Vec<&'b str>), Diagnostic> {
    let named = document
        .envelopes
        .iter()
        .position(|e| e.name == segments[0]);

    if let Some(idx) = named {
        if segments.len() > 1 {
            return Ok((Some(&mut document.envelopes[idx]), segments[1..].to_vec()));
        }
        return Err(Diagnostic::new(
            Code::E004,
            format!("path {:?} names an envelope, not a field", segments[0]),
        ));
    }

    if document.envelopes.is_empty() {
        if matches!(amendment, Amendment::Delete) {
            return Ok((None, segments.to_vec()));
        }
        document.envelopes.push(Envelope {
            name: IMPLICIT_ENVELOPE.to_string(),
            implicit: true,
            nodes: Vec::new(),
            position: Position::new(1, 1),
        });
    }
    Ok((document.envelopes.first_mut(), segments.to_vec()))
}

fn amend_nodes(
    nodes: &mut Vec<Node>,
    segments: &[&str],
    full_path: &str,
    amendment: &Amendment,
) -> Result<(), Diagnostic> {
    let (head, rest) = segments.split_first().expect("segments are non-empty");

    if rest.is_empty() {
        return amend_leaf(nodes, head, full_path, amendment);
    }

    // Descend into the named block, creating it for sets.
    let position = nodes
        .iter()
        .position(|n| n.key() == Some(head));
    match position {
        Some(idx) => match &mut nodes[idx] {
            Node::Block(block) => amend_nodes(&mut block.children, rest, full_path, amendment),
            _ => Err(Diagnostic::new(
                Code::E004,
                format!("path segment {:?} in {:?} is not a block", head, full_path),
            )),
        },
        None => match amendment {
            Amendment::Delete => Ok(()),
            _ => {
                let mut block = Block {
                    key: (*head).to_string(),
                    target: None,
                    children: Vec::new(),
                    depth: 0,
                    position: Position::new(0, 0),
                };
                amend_nodes(&mut block.children, rest, full_path, amendment)?;
                nodes.push(Node::Block(block));
                Ok(())
            }
        },
    }
}

fn amend_leaf(
    nodes: &mut Vec<Node>,
    key: &str,
    full_path: &str,
    amendment: &Amendment,
) -> Result<(), Diagnostic> {
    let idx = nodes.iter().position(|n| n.key() == Some(key));

    match amendment {
        Amendment::Delete => {
            if let Some(idx) = idx {
                nodes.remove(idx);
            }
            Ok(())
        }
        Amendment::SetNull | Amendment::Set(_) => {
            let value = match amendment {
                Amendment::Set(v) => v.clone(),
                _ => Value::Null,
            };
            match idx {
                Some(idx) => match &mut nodes[idx] {
                    Node::Assignment(assignment) => {
                        assignment.value = value;
                        Ok(())
                    }
                    _ => Err(Diagnostic::new(
                        Code::E004,
                        format!("{:?} addresses a block, not a field", full_path),
                    )),
                },
                None => {
                    nodes.push(Node::Assignment(Assignment {
                        key: key.to_string(),
                        value,
                        position: Position::new(0, 0),
                    }));
                    Ok(())
                }
            }
        }
    }
}

/// APPEND_ONLY: the new list must extend the old one without rewriting
/// its prefix. Anything else - reorders, truncations, non-lists - is
/// rejected conservatively.
pub fn is_prefix_extension(old: &Value, new: &Value) -> bool {
    match (old, new) {
        (Value::List(old_items), Value::List(new_items)) => {
            new_items.len() >= old_items.len()
                && old_items
                    .iter()
                    .zip(new_items.iter())
                    .all(|(a, b)| equivalent(a, b))
        }
        _ => false,
    }
}

/// Semantic equality: quoting style and numeric lexemes do not count.
/// A parsed `[one, two]` and a JSON `["one", "two"]` are the same list.
fn equivalent(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Str { value: a, .. }, Value::Str { value: b, .. }) => a == b,
        (Value::Number { value: a, .. }, Value::Number { value: b, .. }) => a == b,
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| equivalent(x, y))
        }
        _ => a == b,
    }
}
