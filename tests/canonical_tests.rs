//! Canonical-form integration tests: the literal scenarios from the
//! notation contract, the canonical fixed point, and lexeme fidelity.

use proptest::prelude::*;

use octave::diagnostics::Code;
use octave::pipeline::{self, PipelineOptions};
use octave::to_canonical;

#[test]
fn unicode_tension_preserved() {
    let outcome = pipeline::run("TENSION::Speed ⇌ Quality\n", PipelineOptions::default());
    assert_eq!(outcome.canonical, "TENSION::\"Speed ⇌ Quality\"\n");
    // Only the coalescing audit, nothing else.
    assert!(outcome.errors.is_empty());
    assert!(outcome
        .warnings
        .iter()
        .all(|d| d.code == Code::WMultiword));
}

#[test]
fn triple_quotes_preserved_without_loss() {
    assert_eq!(
        to_canonical("QUOTES::\"\"\"Triple quotes test\"\"\"\n"),
        "QUOTES::\"Triple quotes test\"\n"
    );
}

#[test]
fn ascii_tension_normalized_with_w002() {
    let outcome = pipeline::run("TENSION::Speed <-> Quality\n", PipelineOptions::default());
    assert_eq!(outcome.canonical, "TENSION::\"Speed ⇌ Quality\"\n");
    assert!(outcome.warnings.iter().any(|d| d.code == Code::W002));
}

#[test]
fn bare_line_never_silent() {
    let outcome = pipeline::run("BLOCK:\n  GOOD::1\nMISSING_END\n", PipelineOptions::default());
    assert!(outcome
        .warnings
        .iter()
        .any(|d| d.code == Code::W001 && d.message.contains("MISSING_END")));
}

#[test]
fn duplicate_keys_later_wins() {
    let outcome = pipeline::run("A::1\nA::2\n", PipelineOptions::default());
    assert_eq!(outcome.canonical, "A::2\n");
    assert!(outcome
        .warnings
        .iter()
        .any(|d| d.code == Code::WDuplicateKey));
}

#[test]
fn envelope_case_normalizes_with_w003() {
    let outcome = pipeline::run("===myDoc===\nA::1\n===END===\n", PipelineOptions::default());
    assert_eq!(outcome.canonical, "===MY_DOC===\nA::1\n===END===\n");
    assert!(outcome.warnings.iter().any(|d| d.code == Code::W003));
}

#[test]
fn representative_document_snapshot() {
    let canonical = to_canonical(
        "===project_status===\n\
         META:\n\
         \x20 STATUS::Active In Progress\n\
         \x20 UPDATED::2026-08-01\n\
         RISKS::[latency, drift]\n\
         NOTE::\"\"\"Keep ⇌ balance\"\"\"\n\
         ===END===\n",
    );
    insta::assert_snapshot!(canonical, @r###"
    ===PROJECT_STATUS===
    META:
      STATUS::"Active In Progress"
      UPDATED::"2026-08-01"
    RISKS::[latency, drift]
    NOTE::"Keep ⇌ balance"
    ===END===
    "###);
}

#[test]
fn canonical_fixed_point_on_curated_inputs() {
    let inputs = [
        "A::1\n",
        "A::2\nB::\"two words\"\n",
        "===ENV===\nBLOCK:\n  K::v\n===END===\n",
        "L::[1, 2, 3]\nM::[a::1, b::2]\n",
        "F::[\"x\"∧REQ∧ENUM[A,B]→§META]\n",
        "P::[load→parse→emit]\n",
        "T::Speed <-> Quality\n",
        "S::§3\n§1: Overview\n",
        "// comment survives\nA::1\n",
        "CODE\n```python\nx = [1, 2]\n```\n",
        "EMPTY::\n",
        "NEG::-3.50\n",
        "DEEP:\n  MID:\n    LEAF::[a∨b]\n",
    ];
    for input in inputs {
        let once = to_canonical(input);
        let twice = to_canonical(&once);
        assert_eq!(once, twice, "canonical not a fixed point for {:?}", input);
        // A canonical document re-parses without warnings of its own.
        let reparse = pipeline::run(&once, PipelineOptions::default());
        assert!(
            reparse.errors.is_empty(),
            "canonical text re-parses clean for {:?}: {:?}",
            input,
            reparse.errors
        );
    }
}

#[test]
fn every_silent_transform_has_a_warning() {
    // Each input exercises one NORMALIZATION-tier rewrite; each must
    // surface in the audit channel.
    let cases: [(&str, Code); 5] = [
        ("A::x -> y\n", Code::W002),
        ("===camelCase===\nA::1\n===END===\n", Code::W003),
        ("A::two words\n", Code::WMultiword),
        ("A::1\nA::2\n", Code::WDuplicateKey),
        ("FLAG::True\n", Code::W001),
    ];
    for (input, code) in cases {
        let outcome = pipeline::run(input, PipelineOptions::default());
        assert!(
            outcome.warnings.iter().any(|d| d.code == code),
            "{:?} must audit {:?}",
            input,
            code
        );
    }
}

proptest! {
    /// emit(normalize(parse(s))) is a fixed point for generated clean
    /// documents.
    #[test]
    fn canonical_fixed_point(doc in generated_document()) {
        let once = to_canonical(&doc);
        let twice = to_canonical(&once);
        prop_assert_eq!(once, twice);
    }

    /// Number lexemes survive verbatim.
    #[test]
    fn number_raw_round_trips(int in -9999i64..9999, frac in 0u32..99) {
        let lexeme = format!("{}.{:02}", int, frac);
        let canonical = to_canonical(&format!("N::{}\n", lexeme));
        prop_assert_eq!(canonical, format!("N::{}\n", lexeme));
    }
}

fn generated_document() -> impl Strategy<Value = String> {
    let key = "[A-Z][A-Z_]{0,6}";
    let bare = "[a-df-z][a-z]{0,7}"; // avoids e-exponent-ish and literals
    let value = prop_oneof![
        (-10000i64..10000).prop_map(|n| n.to_string()),
        bare.prop_map(|w| w.to_string()),
        "[a-z ]{1,12}".prop_map(|s| format!("\"{}\"", s.trim()).replace("\"\"", "\"x\"")),
        Just("true".to_string()),
        Just("null".to_string()),
    ];
    proptest::collection::vec((key.prop_map(String::from), value), 1..6).prop_map(|pairs| {
        let mut doc = String::new();
        for (key, value) in pairs {
            doc.push_str(&key);
            doc.push_str("::");
            doc.push_str(&value);
            doc.push('\n');
        }
        doc
    })
}
