//! Document-layer operations: validate, write, eject
//!
//! Wraps the pure pipeline with the content-addressed store. Reads and
//! validation are side-effect free; the only filesystem mutation anywhere
//! is the atomic replace at the end of a successful write (temp sibling
//! then rename, so a failed validation never touches the target).
//!
//! ## Modules
//!
//! - [`cas`] - canonical hashing (SHA-256, hex)
//! - [`paths`] - extension whitelist and traversal rejection
//! - [`amend`] - dot-path amendment with tri-state values

pub mod amend;
pub mod cas;
pub mod paths;

pub use amend::{apply, is_prefix_extension, Amendment, DELETE_SENTINEL};
pub use cas::canonical_hash;
pub use paths::check_path;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ast::{Assignment, Document, DocumentStats, Envelope, Node};
use crate::diagnostics::{Code, Diagnostic, Position};
use crate::emitter::{self, Projection};
use crate::normalizer;
use crate::parser;
use crate::pipeline::{self, PipelineOptions, Status, ValidationStatus};
use crate::repair::RepairAction;
use crate::schema::{self, RouteEntry, Schema};

/// A document arrives either as a whitelisted file path or as inline
/// content.
#[derive(Debug, Clone)]
pub enum DocumentSource {
    Path(String),
    Content(String),
}

impl DocumentSource {
    fn load(&self) -> Result<String, Diagnostic> {
        match self {
            DocumentSource::Content(text) => Ok(text.clone()),
            DocumentSource::Path(path) => {
                let checked = check_path(path)?;
                read_document(&checked)
            }
        }
    }
}

fn read_document(path: &Path) -> Result<String, Diagnostic> {
    let bytes = std::fs::read(path).map_err(|e| {
        Diagnostic::new(Code::EFile, format!("cannot read {}: {}", path.display(), e))
    })?;
    String::from_utf8(bytes).map_err(|e| {
        Diagnostic::new(
            Code::EEncoding,
            format!("{} is not valid UTF-8 at byte {}", path.display(), e.utf8_error().valid_up_to()),
        )
    })
}

/// Resolve a schema argument: parse the schema document and extract its
/// FIELDS/POLICY pair. A schema argument that declares no schema is E002.
pub fn load_schema(source: &DocumentSource) -> Result<Schema, Vec<Diagnostic>> {
    let text = source.load().map_err(|d| vec![d])?;
    let parsed = parser::parse(&text);
    let normalized = normalizer::normalize(parsed.document);
    let extracted = schema::extract(&normalized.document);
    match extracted.schema {
        Some(schema) if extracted.diagnostics.iter().all(|d| !d.is_error()) => Ok(schema),
        _ => {
            let mut diagnostics = extracted.diagnostics;
            diagnostics.push(pipeline::schema_required_error());
            Err(diagnostics)
        }
    }
}

// ---------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ValidateArgs {
    pub source: DocumentSource,
    pub schema: Option<DocumentSource>,
    pub fix: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateResponse {
    pub status: Status,
    pub validation_status: ValidationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_hash: Option<String>,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    pub manifest: Vec<RouteEntry>,
    pub repairs: Vec<RepairAction>,
    pub stats: DocumentStats,
}

impl ValidateResponse {
    fn failed(errors: Vec<Diagnostic>) -> Self {
        Self {
            status: Status::Failed,
            validation_status: ValidationStatus::Skipped,
            canonical: None,
            canonical_hash: None,
            errors,
            warnings: Vec::new(),
            manifest: Vec::new(),
            repairs: Vec::new(),
            stats: DocumentStats::default(),
        }
    }
}

pub fn validate(args: &ValidateArgs) -> ValidateResponse {
    let content = match args.source.load() {
        Ok(content) => content,
        Err(diag) => return ValidateResponse::failed(vec![diag]),
    };

    let schema = match &args.schema {
        Some(source) => match load_schema(source) {
            Ok(schema) => Some(schema),
            Err(diagnostics) => return ValidateResponse::failed(diagnostics),
        },
        None => None,
    };

    let outcome = pipeline::run(
        &content,
        PipelineOptions {
            schema,
            fix: args.fix,
        },
    );

    ValidateResponse {
        status: outcome.status,
        validation_status: outcome.validation_status,
        canonical: Some(outcome.canonical),
        canonical_hash: Some(outcome.canonical_hash),
        errors: outcome.errors,
        warnings: outcome.warnings,
        manifest: outcome.manifest,
        repairs: outcome.repairs,
        stats: outcome.stats,
    }
}

// ---------------------------------------------------------------------
// write
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct WriteArgs {
    /// Full-document mode: overwrites the target.
    pub content: Option<String>,
    /// Amendment mode: dot-path changes against the existing document.
    /// Strictly XOR with `content`.
    pub changes: Option<serde_json::Map<String, serde_json::Value>>,
    pub target_path: String,
    pub schema: Option<DocumentSource>,
    /// Optimistic concurrency: must equal the canonical hash of the
    /// current file state when supplied.
    pub base_hash: Option<String>,
    pub fix: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteResponse {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_hash: Option<String>,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

impl WriteResponse {
    fn failed(errors: Vec<Diagnostic>) -> Self {
        Self {
            status: Status::Failed,
            canonical_hash: None,
            errors,
            warnings: Vec::new(),
        }
    }
}

pub fn write(args: &WriteArgs) -> WriteResponse {
    // Strictly XOR: exactly one input mode.
    match (&args.content, &args.changes) {
        (Some(_), Some(_)) | (None, None) => {
            return WriteResponse::failed(vec![Diagnostic::new(
                Code::E004,
                "write takes exactly one of content or changes",
            )
            .expected_got("content XOR changes", "both or neither")]);
        }
        _ => {}
    }

    let target = match check_path(&args.target_path) {
        Ok(target) => target,
        Err(diag) => return WriteResponse::failed(vec![diag]),
    };

    let schema = match &args.schema {
        Some(source) => match load_schema(source) {
            Ok(schema) => Some(schema),
            Err(diagnostics) => return WriteResponse::failed(diagnostics),
        },
        None => None,
    };

    // CAS guard against the current file state.
    if let Some(base_hash) = &args.base_hash {
        match current_hash(&target) {
            Ok(Some(current)) if &current == base_hash => {}
            Ok(current) => {
                return WriteResponse::failed(vec![Diagnostic::new(
                    Code::EHash,
                    "base_hash does not match the current document",
                )
                .expected_got(
                    current.unwrap_or_else(|| "no existing document".to_string()),
                    base_hash.clone(),
                )]);
            }
            Err(diag) => return WriteResponse::failed(vec![diag]),
        }
    }

    let outcome = match (&args.content, &args.changes) {
        (Some(content), None) => pipeline::run(
            content,
            PipelineOptions {
                schema: schema.clone(),
                fix: args.fix,
            },
        ),
        (None, Some(changes)) => {
            let current = match read_document(&target) {
                Ok(current) => current,
                Err(diag) => return WriteResponse::failed(vec![diag]),
            };
            let parsed = parser::parse(&current);
            let normalized = normalizer::normalize(parsed.document);
            let mut document = normalized.document;

            for (path, json_value) in changes {
                let amendment = Amendment::from_json(json_value);
                if let Some(diag) =
                    check_append_only(&document, schema.as_ref(), path, &amendment)
                {
                    return WriteResponse::failed(vec![diag]);
                }
                if let Err(diag) = amend::apply(&mut document, path, &amendment) {
                    return WriteResponse::failed(vec![diag]);
                }
            }

            let amended = emitter::emit_canonical(&document);
            pipeline::run(
                &amended,
                PipelineOptions {
                    schema: schema.clone(),
                    fix: args.fix,
                },
            )
        }
        _ => unreachable!("XOR was checked above"),
    };

    if !outcome.errors.is_empty() {
        return WriteResponse {
            status: Status::Failed,
            canonical_hash: None,
            errors: outcome.errors,
            warnings: outcome.warnings,
        };
    }

    if let Err(diag) = atomic_replace(&target, &outcome.canonical) {
        return WriteResponse::failed(vec![diag]);
    }

    WriteResponse {
        status: Status::Success,
        canonical_hash: Some(outcome.canonical_hash),
        errors: Vec::new(),
        warnings: outcome.warnings,
    }
}

/// Canonical hash of the file as it stands, None when absent.
fn current_hash(target: &Path) -> Result<Option<String>, Diagnostic> {
    if !target.exists() {
        return Ok(None);
    }
    let current = read_document(target)?;
    let parsed = parser::parse(&current);
    let normalized = normalizer::normalize(parsed.document);
    Ok(Some(cas::canonical_hash(&emitter::emit_canonical(
        &normalized.document,
    ))))
}

/// APPEND_ONLY is an amend-time rule: the new list must prefix-extend the
/// prior one.
fn check_append_only(
    document: &Document,
    schema: Option<&Schema>,
    path: &str,
    amendment: &Amendment,
) -> Option<Diagnostic> {
    let schema = schema?;
    let Amendment::Set(new_value) = amendment else {
        // Deleting or nulling an append-only field rewrites history.
        let field_is_append_only = append_only_field(schema, path);
        if field_is_append_only {
            return Some(Diagnostic::new(
                Code::EConstraint,
                format!("{}: APPEND_ONLY forbids delete or null", path),
            ));
        }
        return None;
    };

    if !append_only_field(schema, path) {
        return None;
    }

    let segments: Vec<&str> = path.split('.').collect();
    let old_value = match document.lookup(&segments) {
        Some(Node::Assignment(assignment)) => &assignment.value,
        _ => return None, // first write to the field
    };

    if amend::is_prefix_extension(old_value, new_value) {
        None
    } else {
        Some(
            Diagnostic::new(
                Code::EConstraint,
                format!("{}: APPEND_ONLY requires the new list to extend the old", path),
            )
            .expected_got("a prefix-extension of the existing list", "a rewritten list"),
        )
    }
}

fn append_only_field(schema: &Schema, path: &str) -> bool {
    let last = path.rsplit('.').next().unwrap_or(path);
    if let Some(field) = schema.field(last) {
        if field.is_append_only() {
            return true;
        }
    }
    schema.sections.iter().any(|section| {
        path.starts_with(&section.name)
            && section
                .fields
                .iter()
                .any(|f| f.key == last && f.is_append_only())
    })
}

/// Write-temp-then-rename on the same filesystem. The target is replaced
/// atomically or not at all.
fn atomic_replace(target: &Path, content: &str) -> Result<(), Diagnostic> {
    let tmp = target.with_file_name(format!(
        "{}.tmp.{}",
        target
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("octave"),
        std::process::id()
    ));
    std::fs::write(&tmp, content).map_err(|e| {
        Diagnostic::new(Code::EFile, format!("cannot write {}: {}", tmp.display(), e))
    })?;
    std::fs::rename(&tmp, target).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        Diagnostic::new(
            Code::EFile,
            format!("cannot replace {}: {}", target.display(), e),
        )
    })
}

// ---------------------------------------------------------------------
// eject
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EjectFormat {
    Octave,
    Json,
    Yaml,
    Markdown,
    /// Grammar export lives outside the core; requesting it must fail
    /// explicitly rather than fall back.
    Gbnf,
}

impl std::str::FromStr for EjectFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "octave" => Ok(EjectFormat::Octave),
            "json" => Ok(EjectFormat::Json),
            "yaml" => Ok(EjectFormat::Yaml),
            "markdown" => Ok(EjectFormat::Markdown),
            "gbnf" => Ok(EjectFormat::Gbnf),
            other => Err(format!("unknown format: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EjectMode {
    Canonical,
    /// META / STATUS / RISKS / DECISIONS.
    Executive,
    /// META / TESTS / CI / DEPS.
    Developer,
    /// Lenient pass-through: normalization only, validation skipped.
    Authoring,
    /// Skeleton synthesized from a schema's field examples.
    Template,
}

impl std::str::FromStr for EjectMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "canonical" => Ok(EjectMode::Canonical),
            "executive" => Ok(EjectMode::Executive),
            "developer" => Ok(EjectMode::Developer),
            "authoring" => Ok(EjectMode::Authoring),
            "template" => Ok(EjectMode::Template),
            other => Err(format!("unknown mode: {}", other)),
        }
    }
}

const EXECUTIVE_KEYS: &[&str] = &["META", "STATUS", "RISKS", "DECISIONS"];
const DEVELOPER_KEYS: &[&str] = &["META", "TESTS", "CI", "DEPS"];

#[derive(Debug, Clone)]
pub struct EjectArgs {
    pub content: String,
    pub schema: Option<DocumentSource>,
    pub format: EjectFormat,
    pub mode: EjectMode,
}

pub fn eject(args: &EjectArgs) -> Result<Projection, Vec<Diagnostic>> {
    if args.format == EjectFormat::Gbnf {
        return Err(vec![Diagnostic::new(
            Code::E003,
            "gbnf export is not supported by the core emitter",
        )
        .expected_got("octave|json|yaml|markdown", "gbnf")]);
    }

    let schema = match &args.schema {
        Some(source) => Some(load_schema(source)?),
        None => None,
    };

    let (document, mut omitted) = match args.mode {
        EjectMode::Template => {
            let Some(schema) = schema.as_ref() else {
                return Err(vec![pipeline::schema_required_error()]);
            };
            (template_document(schema), Vec::new())
        }
        EjectMode::Authoring => {
            let parsed = parser::parse(&args.content);
            let normalized = normalizer::normalize(parsed.document);
            (normalized.document, Vec::new())
        }
        EjectMode::Canonical => {
            let outcome = pipeline::run(
                &args.content,
                PipelineOptions {
                    schema: schema.clone(),
                    fix: false,
                },
            );
            if !outcome.errors.is_empty() {
                return Err(outcome.errors);
            }
            (outcome.document, Vec::new())
        }
        EjectMode::Executive => filtered_view(&args.content, schema.clone(), EXECUTIVE_KEYS)?,
        EjectMode::Developer => filtered_view(&args.content, schema.clone(), DEVELOPER_KEYS)?,
    };

    let mut projection = match args.format {
        EjectFormat::Octave => Projection::lossless(emitter::emit_canonical(&document)),
        EjectFormat::Json => emitter::json::project(&document),
        EjectFormat::Yaml => emitter::yaml::project(&document),
        EjectFormat::Markdown => emitter::markdown::project(&document),
        EjectFormat::Gbnf => unreachable!("rejected above"),
    };

    if !omitted.is_empty() {
        projection.lossy = true;
        projection.fields_omitted.append(&mut omitted);
    }
    Ok(projection)
}

/// Executive/developer views: keep only the mode's top-level keys and
/// record everything dropped.
fn filtered_view(
    content: &str,
    schema: Option<Schema>,
    keys: &[&str],
) -> Result<(Document, Vec<String>), Vec<Diagnostic>> {
    let outcome = pipeline::run(content, PipelineOptions { schema, fix: false });
    if !outcome.errors.is_empty() {
        return Err(outcome.errors);
    }
    let mut omitted = Vec::new();
    let mut document = outcome.document;
    for envelope in &mut document.envelopes {
        envelope.nodes.retain(|node| match node.key() {
            Some(key) => {
                let keep = keys.contains(&key);
                if !keep {
                    omitted.push(key.to_string());
                }
                keep
            }
            None => true,
        });
    }
    Ok((document, omitted))
}

/// One skeleton assignment per schema field, example values verbatim.
fn template_document(schema: &Schema) -> Document {
    let position = Position::new(0, 0);
    let mut nodes: Vec<Node> = schema
        .fields
        .iter()
        .map(|field| {
            Node::Assignment(Assignment {
                key: field.key.clone(),
                value: field.example.clone(),
                position,
            })
        })
        .collect();

    for section in &schema.sections {
        nodes.push(Node::Block(crate::ast::Block {
            key: section.name.clone(),
            target: None,
            children: section
                .fields
                .iter()
                .map(|field| {
                    Node::Assignment(Assignment {
                        key: field.key.clone(),
                        value: field.example.clone(),
                        position,
                    })
                })
                .collect(),
            depth: 0,
            position,
        }));
    }

    Document::new(vec![Envelope {
        name: parser::IMPLICIT_ENVELOPE.to_string(),
        implicit: true,
        nodes,
        position,
    }])
}

