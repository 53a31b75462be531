//! Parser integration tests: document structure, value resolution,
//! bracketed-value disambiguation, lenient recovery.

use octave::ast::{FlowExpr, FlowOp, Node, Target, Value};
use octave::diagnostics::Code;
use octave::parser::parse;

fn first_assignment(text: &str) -> (String, Value) {
    let parsed = parse(text);
    for envelope in &parsed.document.envelopes {
        for node in &envelope.nodes {
            if let Node::Assignment(a) = node {
                return (a.key.clone(), a.value.clone());
            }
        }
    }
    panic!("no assignment in {:?}", text);
}

#[test]
fn simple_scalars() {
    assert!(matches!(first_assignment("N::42\n").1, Value::Number { .. }));
    assert_eq!(first_assignment("B::true\n").1, Value::Boolean(true));
    assert_eq!(first_assignment("Z::null\n").1, Value::Null);
    assert_eq!(
        first_assignment("V::2.0.1\n").1,
        Value::Version("2.0.1".to_string())
    );
    assert_eq!(
        first_assignment("R::§META\n").1,
        Value::SectionRef("META".to_string())
    );
    assert_eq!(
        first_assignment("X::$ENV\n").1,
        Value::Variable("$ENV".to_string())
    );
}

#[test]
fn colon_path_requires_adjacency() {
    assert_eq!(
        first_assignment("P::A:B:C\n").1,
        Value::ColonPath(vec!["A".into(), "B".into(), "C".into()])
    );
    // Spaced colons are not a path; the run coalesces instead.
    let (_, value) = first_assignment("P::A : B\n");
    assert!(matches!(value, Value::Str { .. }));
}

#[test]
fn multiword_coalesces_with_audit() {
    let parsed = parse("TENSION::Speed ⇌ Quality\n");
    assert!(parsed
        .diagnostics
        .iter()
        .any(|d| d.code == Code::WMultiword));
    let (_, value) = first_assignment("TENSION::Speed ⇌ Quality\n");
    assert_eq!(
        value,
        Value::Str {
            value: "Speed ⇌ Quality".to_string(),
            quoted: true
        }
    );
}

#[test]
fn lists_inline_maps_and_mixtures() {
    let (_, list) = first_assignment("L::[1, two, \"three\"]\n");
    match list {
        Value::List(items) => {
            assert_eq!(items.len(), 3);
            assert!(matches!(items[0], Value::Number { .. }));
        }
        other => panic!("expected list, got {:?}", other),
    }

    let (_, map) = first_assignment("M::[a::1, b::two]\n");
    match map {
        Value::InlineMap(entries) => {
            assert_eq!(entries[0].0, "a");
            assert_eq!(entries[1].0, "b");
        }
        other => panic!("expected inline map, got {:?}", other),
    }
}

#[test]
fn trailing_comma_is_tolerated() {
    let (_, list) = first_assignment("L::[1, 2,]\n");
    match list {
        Value::List(items) => assert_eq!(items.len(), 2),
        other => panic!("expected list, got {:?}", other),
    }
}

#[test]
fn flow_expression_precedence() {
    // ⊕ binds tighter than →: a→b⊕c is a→(b⊕c).
    let (_, value) = first_assignment("F::[a→b⊕c]\n");
    match value {
        Value::Flow(expr) => match *expr {
            FlowExpr::Binary { op, ref rhs, .. } => {
                assert_eq!(op, FlowOp::Flow);
                assert!(matches!(
                    **rhs,
                    FlowExpr::Binary {
                        op: FlowOp::Synthesis,
                        ..
                    }
                ));
            }
            ref other => panic!("expected binary flow, got {:?}", other),
        },
        other => panic!("expected flow, got {:?}", other),
    }
}

#[test]
fn flow_is_right_associative() {
    let (_, value) = first_assignment("F::[a→b→c]\n");
    match value {
        Value::Flow(expr) => match *expr {
            FlowExpr::Binary { op: FlowOp::Flow, ref rhs, .. } => {
                assert!(matches!(**rhs, FlowExpr::Binary { op: FlowOp::Flow, .. }));
            }
            ref other => panic!("expected right-leaning →, got {:?}", other),
        },
        other => panic!("expected flow, got {:?}", other),
    }
}

#[test]
fn tension_chain_is_a_parse_error() {
    let parsed = parse("T::[a ⇌ b ⇌ c]\n");
    assert!(parsed
        .diagnostics
        .iter()
        .any(|d| d.code == Code::ETensionChain));
}

#[test]
fn constraint_outside_brackets_is_an_error() {
    let parsed = parse("C::a ∧ b\n");
    assert!(parsed
        .diagnostics
        .iter()
        .any(|d| d.code == Code::EConstraintOutsideBrackets));
}

#[test]
fn holographic_pattern_decomposes() {
    let (_, value) = first_assignment("F::[\"x\"∧REQ∧ENUM[A,B]→§META]\n");
    match value {
        Value::Holographic(pattern) => {
            assert_eq!(pattern.example.scalar_repr(), "x");
            let names: Vec<&str> = pattern
                .constraints
                .iter()
                .map(|a| a.name.as_str())
                .collect();
            assert_eq!(names, vec!["REQ", "ENUM"]);
            assert_eq!(pattern.constraints[1].args.as_deref(), Some("A,B"));
            assert!(matches!(
                pattern.target,
                Some(Target::Builtin(octave::ast::BuiltinTarget::Meta))
            ));
        }
        other => panic!("expected holographic, got {:?}", other),
    }
}

#[test]
fn holographic_needs_brackets_and_constraint() {
    // Comma at depth 1 always means list, even with ∧ nested deeper.
    let (_, value) = first_assignment("L::[[\"x\"∧REQ], 2]\n");
    assert!(matches!(value, Value::List(_)));
}

#[test]
fn regex_constructor_keeps_raw_metacharacters() {
    let (_, value) = first_assignment("F::[\"ab\"∧REGEX[^[a-z]+$]]\n");
    match value {
        Value::Holographic(pattern) => {
            assert_eq!(pattern.constraints[0].args.as_deref(), Some("^[a-z]+$"));
        }
        other => panic!("expected holographic, got {:?}", other),
    }
}

#[test]
fn single_colon_assignment_is_e001_with_hint() {
    let parsed = parse("KEY: value\n");
    let err = parsed
        .diagnostics
        .iter()
        .find(|d| d.code == Code::E001)
        .expect("single-colon assignment must be E001");
    assert!(err.message.contains("::"));
    assert!(err.context.as_deref().unwrap_or("").contains('^'));
    assert_eq!(err.expected.as_deref(), Some("::"));
    // Lenient recovery still produced a well-typed assignment.
    let (key, _) = first_assignment("KEY: value\n");
    assert_eq!(key, "KEY");
}

#[test]
fn blocks_nest_by_two_space_indent() {
    let parsed = parse("OUTER:\n  INNER:\n    LEAF::1\n  NEXT::2\n");
    let outer = match &parsed.document.envelopes[0].nodes[0] {
        Node::Block(block) => block,
        other => panic!("expected block, got {:?}", other),
    };
    assert_eq!(outer.children.len(), 2);
    match &outer.children[0] {
        Node::Block(inner) => {
            assert_eq!(inner.key, "INNER");
            assert_eq!(inner.children.len(), 1);
        }
        other => panic!("expected inner block, got {:?}", other),
    }
}

#[test]
fn block_target_annotation_parses() {
    let parsed = parse("LOG[→§DECISION_LOG]:\n  ENTRY::made a call\n");
    match &parsed.document.envelopes[0].nodes[0] {
        Node::Block(block) => {
            assert!(matches!(
                block.target,
                Some(Target::Builtin(octave::ast::BuiltinTarget::DecisionLog))
            ));
        }
        other => panic!("expected block, got {:?}", other),
    }
}

#[test]
fn multi_target_annotation() {
    let parsed = parse("B[→§META ∨ §RISK_LOG]:\n  K::v\n");
    match &parsed.document.envelopes[0].nodes[0] {
        Node::Block(block) => match &block.target {
            Some(Target::Multi(targets)) => assert_eq!(targets.len(), 2),
            other => panic!("expected multi target, got {:?}", other),
        },
        other => panic!("expected block, got {:?}", other),
    }
}

#[test]
fn duplicate_keys_warn_and_later_wins() {
    let parsed = parse("A::1\nA::2\n");
    let warning = parsed
        .diagnostics
        .iter()
        .find(|d| d.code == Code::WDuplicateKey)
        .unwrap();
    assert!(warning.message.contains("1:1"));
    assert!(warning.message.contains("2:1"));
    let (_, value) = first_assignment("A::1\nA::2\n");
    assert_eq!(value.scalar_repr(), "2");
}

#[test]
fn bare_line_is_audited_never_silent() {
    let parsed = parse("A::1\nMISSING_END\nB::2\n");
    assert!(parsed
        .diagnostics
        .iter()
        .any(|d| d.code == Code::W001 && d.message.contains("MISSING_END")));
    // Recovery continued: B survived.
    assert!(parsed.document.envelopes[0]
        .nodes
        .iter()
        .any(|n| n.key() == Some("B")));
}

#[test]
fn envelopes_and_implicit_content() {
    let parsed = parse("BEFORE::1\n===REAL===\nA::2\n===END===\n");
    let envelopes = &parsed.document.envelopes;
    assert_eq!(envelopes.len(), 2);
    assert!(envelopes[0].implicit);
    assert!(!envelopes[1].implicit);
    assert_eq!(envelopes[1].name, "REAL");
}

#[test]
fn comments_are_kept_in_order() {
    let parsed = parse("// leading note\nA::1\n");
    assert!(matches!(
        parsed.document.envelopes[0].nodes[0],
        Node::Comment(_)
    ));
}

#[test]
fn multiline_lists_continue_across_lines() {
    let parsed = parse("L::[1,\n  2,\n  3]\n");
    let (_, value) = match &parsed.document.envelopes[0].nodes[0] {
        Node::Assignment(a) => (a.key.clone(), a.value.clone()),
        other => panic!("expected assignment, got {:?}", other),
    };
    match value {
        Value::List(items) => assert_eq!(items.len(), 3),
        other => panic!("expected list, got {:?}", other),
    }
}

#[test]
fn deep_nesting_warns_past_one_hundred() {
    let mut text = String::new();
    for depth in 0..102 {
        text.push_str(&"  ".repeat(depth));
        text.push_str("B:\n");
    }
    text.push_str(&"  ".repeat(102));
    text.push_str("LEAF::1\n");

    let parsed = parse(&text);
    assert!(parsed
        .diagnostics
        .iter()
        .any(|d| d.code == Code::WDeepNesting));
    // The tree is still fully built.
    let mut node = &parsed.document.envelopes[0].nodes[0];
    let mut depth = 0;
    while let Node::Block(block) = node {
        depth += 1;
        match block.children.first() {
            Some(child) => node = child,
            None => break,
        }
    }
    assert_eq!(depth, 102);
}

#[test]
fn literal_zone_becomes_a_node() {
    let parsed = parse("EXAMPLE\n```octave\nINNER::1\n```\n");
    match &parsed.document.envelopes[0].nodes[0] {
        Node::LiteralZone(zone) => {
            assert_eq!(zone.key, "EXAMPLE");
            assert_eq!(zone.info, "octave");
            assert_eq!(zone.content, "INNER::1");
            assert_eq!(zone.fence_width, 3);
        }
        other => panic!("expected literal zone, got {:?}", other),
    }
}
