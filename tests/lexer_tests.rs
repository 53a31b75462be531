//! Lexer integration tests: operator aliasing, envelope identification,
//! bracket ledger, literal zones, lexeme preservation.

use rstest::rstest;

use octave::diagnostics::Code;
use octave::lexer::{tokenize, TokenType};

#[rstest]
#[case("A::x -> y", TokenType::Flow, "->", "→")]
#[case("A::x + y", TokenType::Synthesis, "+", "⊕")]
#[case("A::x ~ y", TokenType::Concat, "~", "⧺")]
#[case("A::x <-> y", TokenType::Tension, "<->", "⇌")]
#[case("A::[x & y]", TokenType::Constraint, "&", "∧")]
#[case("A::x | y", TokenType::Alternative, "|", "∨")]
#[case("A::x vs y", TokenType::Tension, "vs", "⇌")]
fn ascii_aliases_normalize_with_w002(
    #[case] input: &str,
    #[case] kind: TokenType,
    #[case] raw: &str,
    #[case] text: &str,
) {
    let out = tokenize(input);
    let token = out
        .tokens
        .iter()
        .find(|t| t.kind == kind)
        .unwrap_or_else(|| panic!("no {:?} token in {:?}", kind, input));
    assert_eq!(token.raw, raw);
    assert_eq!(token.text, text);
    assert!(
        out.diagnostics.iter().any(|d| d.code == Code::W002),
        "alias must be audited"
    );
}

#[rstest]
#[case("A::x → y", TokenType::Flow)]
#[case("A::x ⊕ y", TokenType::Synthesis)]
#[case("A::x ⧺ y", TokenType::Concat)]
#[case("A::x ⇌ y", TokenType::Tension)]
#[case("A::[x ∧ y]", TokenType::Constraint)]
#[case("A::x ∨ y", TokenType::Alternative)]
fn unicode_operators_lex_without_warnings(#[case] input: &str, #[case] kind: TokenType) {
    let out = tokenize(input);
    assert!(out.tokens.iter().any(|t| t.kind == kind));
    assert!(
        !out.diagnostics.iter().any(|d| d.code == Code::W002),
        "canonical operators need no alias audit"
    );
}

#[test]
fn vs_inside_a_word_is_not_an_alias() {
    let out = tokenize("A::vsNOT_ALIAS");
    assert!(!out.tokens.iter().any(|t| t.kind == TokenType::Tension));
    assert!(out
        .tokens
        .iter()
        .any(|t| t.kind == TokenType::Ident && t.raw == "vsNOT_ALIAS"));
}

#[test]
fn number_and_string_lexemes_round_trip() {
    let out = tokenize("N::1.50\nS::\"kept  spaces\"\nE::2e10\n");
    let raws: Vec<&str> = out
        .tokens
        .iter()
        .filter(|t| matches!(t.kind, TokenType::Number | TokenType::String))
        .map(|t| t.raw.as_str())
        .collect();
    assert_eq!(raws, vec!["1.50", "\"kept  spaces\"", "2e10"]);
}

#[test]
fn version_wins_over_number() {
    let out = tokenize("V::1.2.3\nW::1.2.3-rc.1\n");
    let versions: Vec<&str> = out
        .tokens
        .iter()
        .filter(|t| t.kind == TokenType::Version)
        .map(|t| t.raw.as_str())
        .collect();
    assert_eq!(versions, vec!["1.2.3", "1.2.3-rc.1"]);
}

#[test]
fn variables_with_roles() {
    let out = tokenize("X::$NAME\nY::$2:driver\n");
    let vars: Vec<&str> = out
        .tokens
        .iter()
        .filter(|t| t.kind == TokenType::Variable)
        .map(|t| t.raw.as_str())
        .collect();
    assert_eq!(vars, vec!["$NAME", "$2:driver"]);
}

#[test]
fn envelope_identifiers() {
    let out = tokenize("===GOOD_ONE===\n===END===\n");
    assert!(!out.has_errors());

    let out = tokenize("===BAD-ONE===\n===END===\n");
    let err = out
        .diagnostics
        .iter()
        .find(|d| d.code == Code::EInvalidEnvelopeId)
        .expect("hyphen is a hard error");
    assert!(err.message.contains("hyphen '-'"));

    // Case deviations are accepted at lex time; the normalizer rewrites.
    let out = tokenize("===lowercase===\n===END===\n");
    assert!(!out.has_errors());
}

#[test]
fn bracket_ledger_reports_first_unclosed_opener() {
    let out = tokenize("A::[1, [2, 3]\nB::2\n");
    let err = out
        .diagnostics
        .iter()
        .find(|d| d.code == Code::EUnbalancedBracket)
        .unwrap();
    let pos = err.position.unwrap();
    assert_eq!((pos.line, pos.column), (1, 4));
}

#[test]
fn closer_without_opener() {
    let out = tokenize("A::x]\n");
    let err = out
        .diagnostics
        .iter()
        .find(|d| d.code == Code::EUnexpectedBracket)
        .unwrap();
    assert_eq!(err.position.unwrap().column, 5);
}

#[test]
fn tabs_in_indentation_are_e005() {
    let out = tokenize("B:\n\tC::1\n");
    let err = out.diagnostics.iter().find(|d| d.code == Code::E005).unwrap();
    assert!(err.message.contains("tabs"));
    assert_eq!(err.position.unwrap().line, 2);
}

#[test]
fn tabs_inside_literal_zones_are_fine() {
    let out = tokenize("SNIPPET\n```\n\tindented with tab\n```\n");
    assert!(out.diagnostics.is_empty());
}

#[test]
fn literal_zone_suppresses_tokenization_and_brackets() {
    let out = tokenize("CODE\n```rust\nlet v = vec![1, 2];\n```\nAFTER::ok\n");
    let zone = out
        .tokens
        .iter()
        .find(|t| t.kind == TokenType::LiteralZone)
        .unwrap();
    assert_eq!(zone.text, "let v = vec![1, 2];");
    // The unbalanced-looking bracket inside the fence never hits the
    // ledger.
    assert!(out.diagnostics.is_empty());
    assert!(out
        .tokens
        .iter()
        .any(|t| t.kind == TokenType::Ident && t.raw == "AFTER"));
}

#[test]
fn multiline_positions_stay_accurate() {
    let out = tokenize("A::\"\"\"one\ntwo\"\"\"\nB::1\n");
    let b = out
        .tokens
        .iter()
        .find(|t| t.kind == TokenType::Ident && t.raw == "B")
        .unwrap();
    assert_eq!(b.position.line, 3);
}

#[test]
fn unknown_characters_are_reported_not_swallowed() {
    let out = tokenize("A::\u{1}\n");
    assert!(out.diagnostics.iter().any(|d| d.code == Code::ETokenize));
}

#[test]
fn invalid_utf8_is_e_encoding() {
    let err = octave::lexer::tokenize_bytes(&[0x41, 0xff, 0xfe]).unwrap_err();
    assert_eq!(err.code, Code::EEncoding);
}
