//! Staged pipeline composition
//!
//! lex -> parse -> normalize -> (extract/validate) -> emit, with the audit
//! channel threaded through. No stage throws across a boundary; each
//! returns `(value, diagnostics)` and this module assembles the single
//! response the tool layer serializes.

use serde::{Deserialize, Serialize};

use crate::ast::{Document, DocumentStats};
use crate::diagnostics::{self, Code, Diagnostic, Severity};
use crate::emitter;
use crate::normalizer;
use crate::parser;
use crate::repair::{self, RepairAction};
use crate::schema::{self, RouteEntry, Schema};
use crate::store::cas;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Parsed and validated clean.
    Success,
    /// Canonical text was produced, but errors were collected.
    Partial,
    /// Nothing canonical could be produced.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Passed,
    Failed,
    /// No schema was declared or supplied.
    Skipped,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub schema: Option<Schema>,
    /// Opt-in REPAIR tier (ENUM casefold, TYPE coercion).
    pub fix: bool,
}

#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub status: Status,
    pub validation_status: ValidationStatus,
    pub document: Document,
    pub canonical: String,
    pub canonical_hash: String,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    pub manifest: Vec<RouteEntry>,
    pub repairs: Vec<RepairAction>,
    pub stats: DocumentStats,
}

/// Run the full pipeline over source text.
pub fn run(content: &str, options: PipelineOptions) -> PipelineOutcome {
    // Phase 1+2: tokens and tree, lenient.
    let parsed = parser::parse(content);
    let mut diagnostics = parsed.diagnostics;

    // Phase 3: canonical form.
    let normalized = normalizer::normalize(parsed.document);
    diagnostics.extend(normalized.diagnostics);
    diagnostics::sort_by_position(&mut diagnostics);

    // Phase 4: schema. An explicit schema wins; otherwise the document may
    // declare its own.
    let schema = match &options.schema {
        Some(schema) => Some(schema.clone()),
        None => {
            let extracted = schema::extract(&normalized.document);
            diagnostics.extend(extracted.diagnostics);
            extracted.schema
        }
    };

    let mut repairs = repair::normalization_actions(&diagnostics);
    let (document, validation_status, manifest) = match &schema {
        Some(schema) => {
            let outcome = schema::validate(normalized.document, schema, options.fix);
            let failed = outcome.diagnostics.iter().any(|d| d.is_error());
            diagnostics.extend(outcome.diagnostics);
            repairs.extend(outcome.repairs);
            (
                outcome.document,
                if failed {
                    ValidationStatus::Failed
                } else {
                    ValidationStatus::Passed
                },
                outcome.manifest,
            )
        }
        None => (normalized.document, ValidationStatus::Skipped, Vec::new()),
    };

    // Phase 5: canonical emission over whatever survived; the tree is
    // always well-typed, so canonical text exists even for partial parses.
    let canonical = emitter::emit_canonical(&document);
    let canonical_hash = cas::canonical_hash(&canonical);
    let stats = document.stats();

    let (errors, warnings): (Vec<_>, Vec<_>) = diagnostics
        .into_iter()
        .partition(|d| d.severity == Severity::Error);

    let status = if errors.is_empty() {
        Status::Success
    } else if canonical.is_empty() {
        Status::Failed
    } else {
        Status::Partial
    };

    PipelineOutcome {
        status,
        validation_status,
        document,
        canonical,
        canonical_hash,
        errors,
        warnings,
        manifest,
        repairs,
        stats,
    }
}

/// Convenience for tests and callers that only need canonical text.
pub fn to_canonical(content: &str) -> String {
    run(content, PipelineOptions::default()).canonical
}

/// Validation demanded but no schema declarable anywhere: E002.
pub fn schema_required_error() -> Diagnostic {
    Diagnostic::new(
        Code::E002,
        "validation requested but no schema is declarable (no FIELDS/POLICY pair and no schema argument)",
    )
    .expected_got("a schema document or FIELDS/POLICY blocks", "none")
}
