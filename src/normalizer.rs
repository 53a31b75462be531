//! Phase 3: Normalizer - canonical form
//!
//! Deterministic, ordering-preserving rewrites on the parsed tree. Most
//! lexical normalization (operator aliasing, boolean lowercasing, escape
//! handling, whitespace collapse) already happened in earlier stages with
//! their own audit records; this stage owns the structural rewrites:
//!
//! - envelope identifiers to UPPER_SNAKE (W003 when changed)
//! - string quoting recomputed from content so emission is deterministic
//!
//! Normalization is idempotent: `normalize(normalize(x)) == normalize(x)`.

use crate::ast::{Document, Node, Value};
use crate::diagnostics::{Code, Diagnostic};

#[derive(Debug, Clone)]
pub struct NormalizeOutput {
    pub document: Document,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn normalize(document: Document) -> NormalizeOutput {
    let mut diagnostics = Vec::new();
    let mut document = document;

    for envelope in &mut document.envelopes {
        if !envelope.implicit {
            let canonical = to_upper_snake(&envelope.name);
            if canonical != envelope.name {
                diagnostics.push(
                    Diagnostic::new(
                        Code::W003,
                        format!(
                            "envelope identifier {:?} normalized to {:?}",
                            envelope.name, canonical
                        ),
                    )
                    .at(envelope.position),
                );
                envelope.name = canonical;
            }
        }
        normalize_nodes(&mut envelope.nodes);
    }

    NormalizeOutput {
        document,
        diagnostics,
    }
}

fn normalize_nodes(nodes: &mut [Node]) {
    for node in nodes {
        match node {
            Node::Assignment(assignment) => normalize_value(&mut assignment.value),
            Node::Block(block) => normalize_nodes(&mut block.children),
            _ => {}
        }
    }
}

fn normalize_value(value: &mut Value) {
    match value {
        Value::Str { value, quoted } => {
            // A string that cannot re-emit bare must be quoted; a bare-safe
            // string written with quotes keeps them (fidelity).
            if !*quoted && !is_bare_safe(value) {
                *quoted = true;
            }
        }
        Value::List(items) => items.iter_mut().for_each(normalize_value),
        Value::InlineMap(entries) => {
            entries.iter_mut().for_each(|(_, v)| normalize_value(v));
        }
        Value::Holographic(pattern) => normalize_value(&mut pattern.example),
        _ => {}
    }
}

/// True when a string emits unambiguously without quotes: a bareword that
/// re-lexes to itself and collides with no literal.
pub fn is_bare_safe(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    let mut chars = text.chars();
    let first = chars.next().unwrap();
    if !(first.is_alphabetic() || first == '_') {
        return false;
    }
    if !text
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '/'))
    {
        return false;
    }
    // Words that would re-lex as literals or aliases need quotes.
    let lowered = text.to_lowercase();
    !matches!(lowered.as_str(), "true" | "false" | "null" | "vs")
}

/// CamelCase / lowercase / mixed -> UPPER_SNAKE.
pub fn to_upper_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if c.is_uppercase() && prev_lower {
            out.push('_');
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        for upper in c.to_uppercase() {
            out.push(upper);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn upper_snake_conversion() {
        assert_eq!(to_upper_snake("MyEnvelope"), "MY_ENVELOPE");
        assert_eq!(to_upper_snake("session"), "SESSION");
        assert_eq!(to_upper_snake("ALREADY_UPPER"), "ALREADY_UPPER");
        assert_eq!(to_upper_snake("v2Config"), "V2_CONFIG");
    }

    #[test]
    fn envelope_case_warns_once() {
        let parsed = parse("===MyDoc===\nA::1\n===END===\n");
        let normalized = normalize(parsed.document);
        assert_eq!(normalized.document.envelopes[0].name, "MY_DOC");
        assert_eq!(
            normalized
                .diagnostics
                .iter()
                .filter(|d| d.code == Code::W003)
                .count(),
            1
        );
    }

    #[test]
    fn canonical_name_is_untouched() {
        let parsed = parse("===ALREADY===\nA::1\n===END===\n");
        let normalized = normalize(parsed.document);
        assert!(normalized.diagnostics.is_empty());
    }

    #[test]
    fn idempotent() {
        let parsed = parse("===config===\nNAME::\"taut\"\nB::x y z\n===END===\n");
        let once = normalize(parsed.document);
        let twice = normalize(once.document.clone());
        assert_eq!(once.document, twice.document);
        assert!(twice.diagnostics.is_empty());
    }

    #[test]
    fn bare_safety() {
        assert!(is_bare_safe("ACTIVE"));
        assert!(is_bare_safe("semantic_notation"));
        assert!(!is_bare_safe("has space"));
        assert!(!is_bare_safe("true"));
        assert!(!is_bare_safe("a⇌b"));
        assert!(!is_bare_safe("3rd"));
    }
}
