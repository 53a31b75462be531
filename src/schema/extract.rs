//! Schema extraction from FIELDS/POLICY blocks
//!
//! A document that carries a `POLICY` block and a `FIELDS` block declares
//! its own schema. Field definitions are holographic patterns:
//! `KEY::["example"∧REQ∧ENUM[A,B]→§TARGET]`. Nested blocks inside
//! `FIELDS` compile to section schemas governing same-named blocks of
//! governed documents. Extraction is pure: the same input always yields
//! the same schema.

use crate::ast::{Document, Node, Value};
use crate::diagnostics::{Code, Diagnostic, Position};
use crate::schema::constraints::{compile_chain, Constraint};
use crate::schema::{FieldDef, Policy, Schema, SectionSchema, UnknownFieldsMode};

#[derive(Debug, Clone)]
pub struct ExtractOutput {
    pub schema: Option<Schema>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Extract the schema declared by `document`, if any. Returns `None`
/// (without diagnostics) when the document declares no POLICY/FIELDS
/// pair; a half-declared schema is an error.
pub fn extract(document: &Document) -> ExtractOutput {
    let mut diagnostics = Vec::new();

    let policy_block = find_top_block(document, "POLICY");
    let fields_block = find_top_block(document, "FIELDS");

    let (policy_nodes, fields_nodes) = match (policy_block, fields_block) {
        (Some(p), Some(f)) => (p, f),
        (None, None) => {
            return ExtractOutput {
                schema: None,
                diagnostics,
            }
        }
        (Some(_), None) => {
            diagnostics.push(Diagnostic::new(
                Code::EMissingRequired,
                "POLICY block present but FIELDS block missing",
            ));
            return ExtractOutput {
                schema: None,
                diagnostics,
            };
        }
        (None, Some(_)) => {
            diagnostics.push(Diagnostic::new(
                Code::EMissingRequired,
                "FIELDS block present but POLICY block missing",
            ));
            return ExtractOutput {
                schema: None,
                diagnostics,
            };
        }
    };

    let policy = extract_policy(policy_nodes, &mut diagnostics);
    let (fields, sections) = extract_fields(fields_nodes, &mut diagnostics);

    ExtractOutput {
        schema: Some(Schema {
            policy,
            fields,
            sections,
        }),
        diagnostics,
    }
}

fn find_top_block<'a>(document: &'a Document, name: &str) -> Option<&'a [Node]> {
    for envelope in &document.envelopes {
        for node in &envelope.nodes {
            if let Node::Block(block) = node {
                if block.key == name {
                    return Some(&block.children);
                }
            }
        }
    }
    None
}

fn extract_policy(nodes: &[Node], diagnostics: &mut Vec<Diagnostic>) -> Policy {
    let mut policy = Policy::default();
    let mut saw_version = false;
    let mut saw_unknown = false;
    let mut saw_targets = false;

    for node in nodes {
        let Node::Assignment(assignment) = node else {
            continue;
        };
        match assignment.key.as_str() {
            "VERSION" => {
                saw_version = true;
                policy.version = assignment.value.scalar_repr();
            }
            "UNKNOWN_FIELDS" => {
                saw_unknown = true;
                match UnknownFieldsMode::from_name(&assignment.value.scalar_repr()) {
                    Some(mode) => policy.unknown_fields = mode,
                    None => diagnostics.push(
                        Diagnostic::new(
                            Code::EConstraint,
                            "UNKNOWN_FIELDS must be one of REJECT, IGNORE, WARN",
                        )
                        .at(assignment.position)
                        .expected_got(
                            "REJECT|IGNORE|WARN",
                            assignment.value.scalar_repr(),
                        ),
                    ),
                }
            }
            "TARGETS" => {
                saw_targets = true;
                policy.targets = target_names(&assignment.value, assignment.position, diagnostics);
            }
            _ => {}
        }
    }

    for (present, key) in [
        (saw_version, "VERSION"),
        (saw_unknown, "UNKNOWN_FIELDS"),
        (saw_targets, "TARGETS"),
    ] {
        if !present {
            diagnostics.push(Diagnostic::new(
                Code::EMissingRequired,
                format!("POLICY.{} is required", key),
            ));
        }
    }

    policy
}

fn target_names(
    value: &Value,
    position: Position,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<String> {
    let items: Vec<&Value> = match value {
        Value::List(items) => items.iter().collect(),
        single => vec![single],
    };
    let mut names = Vec::new();
    for item in items {
        match item {
            Value::SectionRef(name) => names.push(name.clone()),
            Value::Str { value, .. } => names.push(value.clone()),
            other => diagnostics.push(
                Diagnostic::new(
                    Code::EConstraint,
                    format!("TARGETS entries must be section refs, got {}", other.type_name()),
                )
                .at(position),
            ),
        }
    }
    names
}

fn extract_fields(
    nodes: &[Node],
    diagnostics: &mut Vec<Diagnostic>,
) -> (Vec<FieldDef>, Vec<SectionSchema>) {
    let mut fields = Vec::new();
    let mut sections = Vec::new();

    for node in nodes {
        match node {
            Node::Assignment(assignment) => {
                if let Some(field) = field_from_assignment(
                    &assignment.key,
                    &assignment.value,
                    assignment.position,
                    diagnostics,
                ) {
                    fields.push(field);
                }
            }
            Node::Block(block) => {
                let mut section_fields = Vec::new();
                for child in &block.children {
                    if let Node::Assignment(assignment) = child {
                        if let Some(field) = field_from_assignment(
                            &assignment.key,
                            &assignment.value,
                            assignment.position,
                            diagnostics,
                        ) {
                            section_fields.push(field);
                        }
                    }
                }
                sections.push(SectionSchema {
                    name: block.key.clone(),
                    fields: section_fields,
                });
            }
            _ => {}
        }
    }

    (fields, sections)
}

fn field_from_assignment(
    key: &str,
    value: &Value,
    position: Position,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<FieldDef> {
    match value {
        Value::Holographic(pattern) => {
            let constraints: Vec<Constraint> = match compile_chain(&pattern.constraints) {
                Ok(chain) => chain,
                Err(errors) => {
                    diagnostics.extend(errors);
                    return None;
                }
            };
            Some(FieldDef {
                key: key.to_string(),
                example: pattern.example.clone(),
                constraints,
                target: pattern.target.clone(),
                position,
            })
        }
        other => {
            // Example-only definition: teaches format, constrains nothing.
            diagnostics.push(
                Diagnostic::new(
                    Code::W001,
                    format!("field {:?} declared without a constraint chain", key),
                )
                .at(position),
            );
            Some(FieldDef {
                key: key.to_string(),
                example: other.clone(),
                constraints: Vec::new(),
                target: None,
                position,
            })
        }
    }
}
