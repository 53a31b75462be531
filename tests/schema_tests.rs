//! Schema integration tests: extraction, constraint evaluation through
//! the pipeline, routing, unknown-field policy, repair tiers.

use octave::diagnostics::Code;
use octave::normalizer::normalize;
use octave::parser::parse;
use octave::pipeline::{self, PipelineOptions, ValidationStatus};
use octave::schema;

fn schema_from(text: &str) -> schema::Schema {
    let normalized = normalize(parse(text).document);
    let extracted = schema::extract(&normalized.document);
    assert!(
        extracted.diagnostics.iter().all(|d| !d.is_error()),
        "schema must compile: {:?}",
        extracted.diagnostics
    );
    extracted.schema.expect("schema declared")
}

const STATUS_SCHEMA: &str = "\
===SCHEMA===
POLICY:
  VERSION::1.0.0
  UNKNOWN_FIELDS::REJECT
  TARGETS::[§META, §ARCHIVE]
FIELDS:
  STATUS::[\"ACTIVE\"∧REQ∧ENUM[ACTIVE,DONE]→§META]
  PRIORITY::[5∧OPT∧TYPE[NUMBER]∧RANGE[1,10]]
  DUE::[\"2026-01-01\"∧OPT∧DATE]
  TAGS::[[a, b]∧OPT∧TYPE[LIST]∧APPEND_ONLY]
===END===
";

fn run_with_schema(content: &str, fix: bool) -> pipeline::PipelineOutcome {
    pipeline::run(
        content,
        PipelineOptions {
            schema: Some(schema_from(STATUS_SCHEMA)),
            fix,
        },
    )
}

#[test]
fn valid_document_passes() {
    let outcome = run_with_schema("STATUS::ACTIVE\nPRIORITY::5\nDUE::\"2026-03-01\"\n", false);
    assert_eq!(outcome.validation_status, ValidationStatus::Passed);
    assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
}

#[test]
fn missing_required_is_reported_not_synthesized() {
    let outcome = run_with_schema("PRIORITY::5\n", false);
    assert_eq!(outcome.validation_status, ValidationStatus::Failed);
    assert!(outcome
        .errors
        .iter()
        .any(|d| d.code == Code::EMissingRequired && d.message.contains("STATUS")));
    // The canonical output must not contain an invented STATUS.
    assert!(!outcome.canonical.contains("STATUS"));
}

#[test]
fn enum_violation_fails_with_expected_got() {
    let outcome = run_with_schema("STATUS::PAUSED\n", false);
    let err = outcome
        .errors
        .iter()
        .find(|d| d.code == Code::EConstraint)
        .unwrap();
    assert_eq!(err.got.as_deref(), Some("PAUSED"));
    assert!(err.expected.as_deref().unwrap().contains("ACTIVE"));
}

#[test]
fn range_and_type_violations() {
    let outcome = run_with_schema("STATUS::ACTIVE\nPRIORITY::11\n", false);
    assert!(outcome
        .errors
        .iter()
        .any(|d| d.message.contains("RANGE[1,10]")));

    let outcome = run_with_schema("STATUS::ACTIVE\nPRIORITY::high\n", false);
    assert!(outcome
        .errors
        .iter()
        .any(|d| d.message.contains("TYPE[NUMBER]")));
}

#[test]
fn date_constraint_is_strict() {
    let outcome = run_with_schema("STATUS::ACTIVE\nDUE::\"2026-3-1\"\n", false);
    assert!(outcome.errors.iter().any(|d| d.message.contains("DATE")));
}

#[test]
fn unknown_field_rejected_under_reject_policy() {
    let outcome = run_with_schema("STATUS::ACTIVE\nSURPRISE::1\n", false);
    assert!(outcome
        .errors
        .iter()
        .any(|d| d.code == Code::EUnknownField && d.message.contains("SURPRISE")));
}

#[test]
fn unknown_field_warn_policy_keeps_value() {
    let warn_schema = STATUS_SCHEMA.replace("REJECT", "WARN");
    let outcome = pipeline::run(
        "STATUS::ACTIVE\nSURPRISE::1\n",
        PipelineOptions {
            schema: Some(schema_from(&warn_schema)),
            fix: false,
        },
    );
    assert!(outcome
        .warnings
        .iter()
        .any(|d| d.code == Code::WUnknownField));
    assert!(outcome.canonical.contains("SURPRISE::1"));
}

#[test]
fn unknown_field_ignore_policy_is_silent_by_design() {
    let ignore_schema = STATUS_SCHEMA.replace("REJECT", "IGNORE");
    let outcome = pipeline::run(
        "STATUS::ACTIVE\nSURPRISE::1\n",
        PipelineOptions {
            schema: Some(schema_from(&ignore_schema)),
            fix: false,
        },
    );
    assert!(!outcome
        .warnings
        .iter()
        .any(|d| d.code == Code::WUnknownField));
    assert!(outcome.canonical.contains("SURPRISE::1"));
}

#[test]
fn routing_manifest_records_field_targets() {
    let outcome = run_with_schema("STATUS::ACTIVE\n", false);
    assert!(outcome
        .manifest
        .iter()
        .any(|entry| entry.path == "STATUS" && entry.targets == vec!["§META".to_string()]));
}

#[test]
fn block_target_inheritance_and_override() {
    let schema = schema_from(STATUS_SCHEMA);
    let text = "\
LOG[→§META]:
  FIRST::1
  NESTED[→§ARCHIVE]:
    SECOND::2
";
    let normalized = normalize(parse(text).document);
    let routing = schema::route(&normalized.document, &schema);
    assert!(routing.errors.is_empty(), "{:?}", routing.errors);
    let find = |path: &str| {
        routing
            .manifest
            .iter()
            .find(|e| e.path == path)
            .unwrap_or_else(|| panic!("no manifest entry for {}", path))
    };
    assert_eq!(find("LOG.FIRST").targets, vec!["§META".to_string()]);
    // Override replaces, never merges.
    assert_eq!(
        find("LOG.NESTED.SECOND").targets,
        vec!["§ARCHIVE".to_string()]
    );
}

#[test]
fn undeclared_target_is_an_error() {
    let schema = schema_from(STATUS_SCHEMA);
    let text = "B[→§NOWHERE]:\n  K::1\n";
    let normalized = normalize(parse(text).document);
    let routing = schema::route(&normalized.document, &schema);
    assert!(routing
        .errors
        .iter()
        .any(|d| d.code == Code::E004 && d.message.contains("NOWHERE")));
}

#[test]
fn builtin_targets_need_no_declaration() {
    let schema = schema_from(STATUS_SCHEMA);
    let text = "B[→§KNOWLEDGE_BASE]:\n  K::1\n";
    let normalized = normalize(parse(text).document);
    let routing = schema::route(&normalized.document, &schema);
    assert!(routing.errors.is_empty());
}

#[test]
fn multi_broadcast_lands_in_manifest() {
    let schema = schema_from(STATUS_SCHEMA);
    let text = "B[→§META ∨ §RISK_LOG]:\n  K::1\n";
    let normalized = normalize(parse(text).document);
    let routing = schema::route(&normalized.document, &schema);
    let entry = routing.manifest.iter().find(|e| e.path == "B.K").unwrap();
    assert_eq!(entry.targets, vec!["§META".to_string(), "§RISK_LOG".to_string()]);
}

#[test]
fn enum_casefold_requires_fix() {
    let strict = run_with_schema("STATUS::active\n", false);
    assert_eq!(strict.validation_status, ValidationStatus::Failed);

    let fixed = run_with_schema("STATUS::active\n", true);
    assert_eq!(fixed.validation_status, ValidationStatus::Passed, "{:?}", fixed.errors);
    assert!(fixed.repairs.iter().any(|r| r.rule_id == "enum_casefold"));
    assert!(fixed.canonical.contains("STATUS::ACTIVE"));
}

#[test]
fn type_coercion_requires_fix() {
    let strict = run_with_schema("STATUS::ACTIVE\nPRIORITY::\"7\"\n", false);
    assert_eq!(strict.validation_status, ValidationStatus::Failed);

    let fixed = run_with_schema("STATUS::ACTIVE\nPRIORITY::\"7\"\n", true);
    assert_eq!(fixed.validation_status, ValidationStatus::Passed, "{:?}", fixed.errors);
    assert!(fixed.canonical.contains("PRIORITY::7"));
}

#[test]
fn section_schemas_govern_same_named_blocks() {
    let schema_text = "\
===SCHEMA===
POLICY:
  VERSION::1.0.0
  UNKNOWN_FIELDS::REJECT
  TARGETS::[§META]
FIELDS:
  META:
    STATUS::[\"ACTIVE\"∧REQ]
===END===
";
    let outcome = pipeline::run(
        "META:\n  STATUS::ACTIVE\n",
        PipelineOptions {
            schema: Some(schema_from(schema_text)),
            fix: false,
        },
    );
    assert_eq!(outcome.validation_status, ValidationStatus::Passed, "{:?}", outcome.errors);

    let missing = pipeline::run(
        "META:\n  OTHER::1\n",
        PipelineOptions {
            schema: Some(schema_from(schema_text)),
            fix: false,
        },
    );
    assert!(missing
        .errors
        .iter()
        .any(|d| d.code == Code::EMissingRequired && d.message.contains("META.STATUS")));
    assert!(missing
        .errors
        .iter()
        .any(|d| d.code == Code::EUnknownField && d.message.contains("META.OTHER")));
}
