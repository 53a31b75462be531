//! Target routing
//!
//! Resolves the effective delivery target for every governed field and
//! records the result in a routing manifest. Block annotations inherit
//! downward: a child without its own `[→§T]` takes the nearest ancestor's
//! target; an annotated child replaces (never merges) the inherited one.
//! Multi-broadcast is non-transactional - the manifest is how callers
//! observe which targets were addressed.

use serde::{Deserialize, Serialize};

use crate::ast::{Document, Node, Target};
use crate::diagnostics::{Code, Diagnostic};
use crate::schema::Schema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteEntry {
    /// Dot path of the routed field, block-relative (`META.STATUS`).
    pub path: String,
    /// Canonical target names, one per destination of a broadcast.
    pub targets: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RoutingOutcome {
    pub manifest: Vec<RouteEntry>,
    pub errors: Vec<Diagnostic>,
}

pub fn route(document: &Document, schema: &Schema) -> RoutingOutcome {
    let mut outcome = RoutingOutcome::default();

    // Field-definition targets route top-level assignments.
    for field in &schema.fields {
        let Some(target) = &field.target else { continue };
        check_target(target, schema, &mut outcome.errors);
        if document
            .envelopes
            .iter()
            .any(|e| e.nodes.iter().any(|n| n.key() == Some(&field.key)))
        {
            outcome.manifest.push(RouteEntry {
                path: field.key.clone(),
                targets: destination_names(target),
            });
        }
    }

    // Block annotations route their subtrees by inheritance.
    for envelope in &document.envelopes {
        walk_blocks(&envelope.nodes, None, &mut String::new(), schema, &mut outcome);
    }

    outcome
}

fn walk_blocks(
    nodes: &[Node],
    inherited: Option<&Target>,
    path: &mut String,
    schema: &Schema,
    outcome: &mut RoutingOutcome,
) {
    for node in nodes {
        match node {
            Node::Block(block) => {
                if let Some(target) = &block.target {
                    check_target(target, schema, &mut outcome.errors);
                }
                // Override replaces; absence inherits.
                let effective = block.target.as_ref().or(inherited);
                let len = path.len();
                if !path.is_empty() {
                    path.push('.');
                }
                path.push_str(&block.key);
                walk_blocks(&block.children, effective, path, schema, outcome);
                path.truncate(len);
            }
            Node::Assignment(assignment) => {
                if let Some(target) = inherited {
                    let full = if path.is_empty() {
                        assignment.key.clone()
                    } else {
                        format!("{}.{}", path, assignment.key)
                    };
                    outcome.manifest.push(RouteEntry {
                        path: full,
                        targets: destination_names(target),
                    });
                }
            }
            _ => {}
        }
    }
}

/// Builtin and file targets are always valid; named targets must be
/// declared in POLICY.TARGETS. The router never invents a destination.
fn check_target(target: &Target, schema: &Schema, errors: &mut Vec<Diagnostic>) {
    for destination in target.destinations() {
        if let Target::Named(name) = destination {
            if !schema.policy.targets.iter().any(|t| t == name) {
                errors.push(
                    Diagnostic::new(
                        Code::E004,
                        format!(
                            "target §{} is neither builtin nor declared in POLICY.TARGETS",
                            name
                        ),
                    )
                    .expected_got(
                        format!("one of §{}", schema.policy.targets.join(", §")),
                        format!("§{}", name),
                    ),
                );
            }
        }
    }
}

fn destination_names(target: &Target) -> Vec<String> {
    target
        .destinations()
        .iter()
        .map(|t| t.canonical())
        .collect()
}
