//! Unknown-field policy enforcement
//!
//! Runs after field-level validation. Governed keys are the top-level
//! assignments and blocks of every envelope (the schema's own POLICY and
//! FIELDS blocks are exempt), plus the children of any block governed by a
//! section schema.

use crate::ast::{Document, Node};
use crate::diagnostics::{Code, Diagnostic};
use crate::schema::{Schema, UnknownFieldsMode};

pub fn enforce(document: &Document, schema: &Schema) -> Vec<Diagnostic> {
    if schema.policy.unknown_fields == UnknownFieldsMode::Ignore {
        return Vec::new();
    }

    let mut diagnostics = Vec::new();

    for envelope in &document.envelopes {
        for node in &envelope.nodes {
            let Some(key) = node.key() else { continue };
            if key == "POLICY" || key == "FIELDS" {
                continue;
            }

            if let Node::Block(block) = node {
                if let Some(section) = schema.sections.iter().find(|s| s.name == key) {
                    // Section-governed block: check its children.
                    for child in &block.children {
                        let Some(child_key) = child.key() else { continue };
                        if !section.fields.iter().any(|f| f.key == child_key) {
                            diagnostics.push(unknown_field(
                                schema,
                                &format!("{}.{}", key, child_key),
                                child,
                            ));
                        }
                    }
                    continue;
                }
            }

            let known = schema.fields.iter().any(|f| f.key == key)
                || schema.sections.iter().any(|s| s.name == key);
            if !known {
                diagnostics.push(unknown_field(schema, key, node));
            }
        }
    }

    diagnostics
}

fn unknown_field(schema: &Schema, path: &str, node: &Node) -> Diagnostic {
    let code = match schema.policy.unknown_fields {
        UnknownFieldsMode::Reject => Code::EUnknownField,
        UnknownFieldsMode::Warn => Code::WUnknownField,
        UnknownFieldsMode::Ignore => unreachable!("ignore mode returns early"),
    };
    Diagnostic::new(code, format!("{} is not declared in FIELDS", path)).at(node.position())
}
