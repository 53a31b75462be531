//! Phase 4: Schema - extraction, constraints, validation
//!
//! ## Modules
//!
//! - [`extract`] - FIELDS/POLICY blocks to a [`Schema`]
//! - [`constraints`] - constraint atoms, chain compilation, conflicts
//! - [`evaluate`] - fail-fast chain evaluation (with opt-in repair)
//! - [`routing`] - target resolution, inheritance, routing manifest
//! - [`policy`] - unknown-field enforcement
//!
//! Validation never throws: [`validate`] returns the (possibly repaired)
//! document plus ordered diagnostics - constraint failures first, then
//! routing, then policy.

pub mod constraints;
pub mod evaluate;
pub mod extract;
pub mod policy;
pub mod routing;

pub use constraints::{Constraint, TypeTag};
pub use evaluate::{evaluate, ValidationError};
pub use extract::{extract, ExtractOutput};
pub use routing::{route, RouteEntry};

use serde::{Deserialize, Serialize};

use crate::ast::{Document, Node, Target, Value};
use crate::diagnostics::{Code, Diagnostic, Position};
use crate::repair::RepairAction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnknownFieldsMode {
    #[default]
    Reject,
    Ignore,
    Warn,
}

impl UnknownFieldsMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "REJECT" => Some(UnknownFieldsMode::Reject),
            "IGNORE" => Some(UnknownFieldsMode::Ignore),
            "WARN" => Some(UnknownFieldsMode::Warn),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Policy {
    pub version: String,
    pub unknown_fields: UnknownFieldsMode,
    /// Declared non-builtin target names, section sign stripped.
    pub targets: Vec<String>,
}

/// One compiled field definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub key: String,
    /// The holographic example; retained because it teaches format, but it
    /// never alters validation.
    pub example: Value,
    pub constraints: Vec<Constraint>,
    pub target: Option<Target>,
    pub position: Position,
}

impl FieldDef {
    pub fn is_required(&self) -> bool {
        self.constraints.iter().any(|c| matches!(c, Constraint::Req))
    }

    pub fn is_append_only(&self) -> bool {
        self.constraints
            .iter()
            .any(|c| matches!(c, Constraint::AppendOnly))
    }
}

/// Fields governing the children of a same-named block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionSchema {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub policy: Policy,
    pub fields: Vec<FieldDef>,
    pub sections: Vec<SectionSchema>,
}

impl Schema {
    pub fn field(&self, key: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.key == key)
    }
}

#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    /// The validated document; identical to the input unless `fix`
    /// applied REPAIR-tier rewrites.
    pub document: Document,
    /// Stage-ordered: constraint, then routing, then policy.
    pub diagnostics: Vec<Diagnostic>,
    pub validation_errors: Vec<ValidationError>,
    pub manifest: Vec<RouteEntry>,
    pub repairs: Vec<RepairAction>,
}

/// Validate `document` against `schema`. Missing REQ fields are reported,
/// never synthesized; `fix` unlocks only the REPAIR tier.
pub fn validate(mut document: Document, schema: &Schema, fix: bool) -> ValidationOutcome {
    let mut diagnostics = Vec::new();
    let mut validation_errors = Vec::new();
    let mut repairs = Vec::new();

    // Stage 1: field-level constraints.
    for field in &schema.fields {
        let slot = find_top_assignment(&mut document, &field.key);
        match slot {
            Some((value, position)) => {
                let outcome = evaluate::evaluate(value, &field.constraints, &field.key, fix);
                for error in &outcome.errors {
                    diagnostics.push(validation_diagnostic(error, Some(position)));
                }
                validation_errors.extend(outcome.errors);
                repairs.extend(outcome.repairs);
            }
            None if field.is_required() => {
                diagnostics.push(
                    Diagnostic::new(
                        Code::EMissingRequired,
                        format!("required field {:?} is missing", field.key),
                    )
                    .expected_got(format!("{}::...", field.key), "absent"),
                );
            }
            None => {}
        }
    }

    for section in &schema.sections {
        for field in &section.fields {
            let path = format!("{}.{}", section.name, field.key);
            let slot = find_block_assignment(&mut document, &section.name, &field.key);
            match slot {
                Some((value, position)) => {
                    let outcome = evaluate::evaluate(value, &field.constraints, &path, fix);
                    for error in &outcome.errors {
                        diagnostics.push(validation_diagnostic(error, Some(position)));
                    }
                    validation_errors.extend(outcome.errors);
                    repairs.extend(outcome.repairs);
                }
                None if field.is_required() => {
                    diagnostics.push(
                        Diagnostic::new(
                            Code::EMissingRequired,
                            format!("required field {:?} is missing", path),
                        )
                        .expected_got(format!("{}::...", field.key), "absent"),
                    );
                }
                None => {}
            }
        }
    }

    // Stage 2: routing.
    let routing = route(&document, schema);
    diagnostics.extend(routing.errors);

    // Stage 3: unknown-field policy.
    diagnostics.extend(policy::enforce(&document, schema));

    ValidationOutcome {
        document,
        diagnostics,
        validation_errors,
        manifest: routing.manifest,
        repairs,
    }
}

fn validation_diagnostic(error: &ValidationError, position: Option<Position>) -> Diagnostic {
    let mut diag = Diagnostic::new(
        error.code,
        format!("{}: {} failed", error.path, error.constraint),
    )
    .expected_got(error.expected.clone(), error.got.clone());
    if let Some(pos) = position {
        diag = diag.at(pos);
    }
    diag
}

fn find_top_assignment<'a>(
    document: &'a mut Document,
    key: &str,
) -> Option<(&'a mut Value, Position)> {
    for envelope in &mut document.envelopes {
        for node in &mut envelope.nodes {
            if let Node::Assignment(assignment) = node {
                if assignment.key == key {
                    let position = assignment.position;
                    return Some((&mut assignment.value, position));
                }
            }
        }
    }
    None
}

fn find_block_assignment<'a>(
    document: &'a mut Document,
    block_key: &str,
    key: &str,
) -> Option<(&'a mut Value, Position)> {
    for envelope in &mut document.envelopes {
        for node in &mut envelope.nodes {
            if let Node::Block(block) = node {
                if block.key == block_key {
                    for child in &mut block.children {
                        if let Node::Assignment(assignment) = child {
                            if assignment.key == key {
                                let position = assignment.position;
                                return Some((&mut assignment.value, position));
                            }
                        }
                    }
                }
            }
        }
    }
    None
}
