//! Bracketed values: list, inline map, holographic pattern, or flow
//! expression
//!
//! The decision is made by look-ahead over the buffered tokens at depth 1:
//! a comma means list (whose elements may be inline-map entries), a `∧`
//! means holographic pattern, anything else is a flow expression. Nested
//! brackets recurse.

use crate::ast::target::Target;
use crate::ast::value::{ConstraintAtom, HolographicPattern, Value};
use crate::diagnostics::{Code, Diagnostic, Position};
use crate::lexer::{Token, TokenType};
use crate::parser::values::{matching_bracket, parse_value, ParseCtx};

/// Parse the contents of a bracket pair (outer brackets excluded).
pub(crate) fn parse_bracketed(
    ctx: &mut ParseCtx<'_>,
    inner: &[Token],
    open_position: Position,
) -> Value {
    if inner.is_empty() {
        return Value::List(Vec::new());
    }

    let mut depth = 0usize;
    let mut has_comma = false;
    let mut has_constraint = false;
    for token in inner {
        match token.kind {
            TokenType::LBracket => depth += 1,
            TokenType::RBracket => depth = depth.saturating_sub(1),
            TokenType::Comma if depth == 0 => has_comma = true,
            TokenType::Constraint if depth == 0 => has_constraint = true,
            _ => {}
        }
    }

    if has_comma {
        parse_list_or_map(ctx, inner)
    } else if has_constraint {
        parse_holographic(ctx, inner, open_position)
    } else if let Some(entry) = try_entry(ctx, inner) {
        // Single-entry inline map: [key::atom] without a trailing comma.
        Value::InlineMap(vec![entry])
    } else {
        parse_value(ctx, inner, true)
    }
}

/// Comma-separated contents: a list, or an inline map when every element
/// is a `key::atom` entry.
fn parse_list_or_map(ctx: &mut ParseCtx<'_>, inner: &[Token]) -> Value {
    let elements = split_depth0(inner, TokenType::Comma);
    let mut values: Vec<Value> = Vec::new();
    let mut entries: Vec<(String, Value)> = Vec::new();
    let mut all_entries = true;

    for element in &elements {
        if element.is_empty() {
            // Trailing comma.
            continue;
        }
        if let Some((key, value)) = try_entry(ctx, element) {
            entries.push((key.clone(), value.clone()));
            values.push(Value::InlineMap(vec![(key, value)]));
        } else {
            all_entries = false;
            values.push(parse_value(ctx, element, true));
        }
    }

    if all_entries && !entries.is_empty() {
        Value::InlineMap(entries)
    } else {
        Value::List(values)
    }
}

/// `key::atom` inline-map entry.
fn try_entry(ctx: &mut ParseCtx<'_>, element: &[Token]) -> Option<(String, Value)> {
    if element.len() < 3
        || element[0].kind != TokenType::Ident
        || element[1].kind != TokenType::Assign
    {
        return None;
    }
    let value = parse_value(ctx, &element[2..], true);
    Some((element[0].text.clone(), value))
}

/// `example ∧ CONSTRAINT... [→ §TARGET]`.
fn parse_holographic(
    ctx: &mut ParseCtx<'_>,
    inner: &[Token],
    open_position: Position,
) -> Value {
    let mut segments = split_depth0(inner, TokenType::Constraint);

    // The routing target rides on the last segment: REQ→§META.
    let mut target = None;
    if let Some(last) = segments.last_mut() {
        if let Some(flow_idx) = find_depth0(last, TokenType::Flow) {
            let target_tokens = last[flow_idx + 1..].to_vec();
            last.truncate(flow_idx);
            target = parse_target_tokens(ctx, &target_tokens, open_position);
        }
    }

    let example = match segments.first() {
        Some(first) if !first.is_empty() => parse_value(ctx, first, true),
        _ => {
            ctx.diagnostics.push(
                Diagnostic::new(Code::W001, "holographic pattern without example value")
                    .at(open_position),
            );
            Value::Null
        }
    };

    let mut constraints = Vec::new();
    for segment in segments.iter().skip(1) {
        if segment.is_empty() {
            ctx.diagnostics.push(
                Diagnostic::new(Code::W001, "empty constraint link skipped").at(open_position),
            );
            continue;
        }
        if let Some(atom) = parse_constraint_atom(ctx, segment) {
            constraints.push(atom);
        }
    }

    Value::Holographic(Box::new(HolographicPattern {
        example,
        constraints,
        target,
    }))
}

/// One constraint link: a bare name (`REQ`) or a constructor whose raw
/// argument text is re-sliced from the source line, so `REGEX[^[a-z]+$]`
/// arrives intact. A single quoted string argument bypasses depth
/// tracking entirely.
fn parse_constraint_atom(ctx: &mut ParseCtx<'_>, segment: &[Token]) -> Option<ConstraintAtom> {
    let name_token = &segment[0];
    if name_token.kind != TokenType::Ident {
        ctx.diagnostics.push(
            Diagnostic::new(
                Code::W001,
                format!("constraint link {:?} is not an identifier; skipped", name_token.raw),
            )
            .at(name_token.position),
        );
        return None;
    }

    if segment.len() == 1 {
        return Some(ConstraintAtom::new(
            name_token.text.clone(),
            None,
            name_token.position,
        ));
    }

    if segment[1].kind == TokenType::LBracket {
        let close = matching_bracket(segment, 1)?;
        let args = if close == 3 && segment[2].kind == TokenType::String {
            // Quoted form: REGEX["^[a-z]+$"].
            segment[2].text.clone()
        } else {
            let open_tok = &segment[1];
            let close_tok = &segment[close];
            ctx.raw_slice(
                open_tok.position.line,
                open_tok.position.column + 1,
                close_tok.position.column,
            )
        };
        if close != segment.len() - 1 {
            ctx.diagnostics.push(
                Diagnostic::new(
                    Code::W001,
                    "tokens after constraint constructor dropped",
                )
                .at(segment[close].position),
            );
        }
        return Some(ConstraintAtom::new(
            name_token.text.clone(),
            Some(args),
            name_token.position,
        ));
    }

    ctx.diagnostics.push(
        Diagnostic::new(
            Code::W001,
            format!("unexpected tokens after constraint {:?}", name_token.text),
        )
        .at(segment[1].position),
    );
    Some(ConstraintAtom::new(
        name_token.text.clone(),
        None,
        name_token.position,
    ))
}

/// Target expression after `→`: `§NAME`, `§./path`, or a `∨`-joined
/// broadcast.
pub(crate) fn parse_target_tokens(
    ctx: &mut ParseCtx<'_>,
    tokens: &[Token],
    position: Position,
) -> Option<Target> {
    let alternatives = split_depth0(tokens, TokenType::Alternative);
    let mut targets = Vec::new();

    for alt in &alternatives {
        match alt.as_slice() {
            [section, name]
                if section.kind == TokenType::Section
                    && matches!(name.kind, TokenType::Ident | TokenType::Number) =>
            {
                targets.push(Target::from_section_name(&name.text));
            }
            [] => {}
            other => {
                let got: String = other
                    .iter()
                    .map(|t| t.raw.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                ctx.diagnostics.push(
                    Diagnostic::new(Code::W001, format!("unrecognized target {:?} skipped", got))
                        .at(other.first().map(|t| t.position).unwrap_or(position)),
                );
            }
        }
    }

    match targets.len() {
        0 => None,
        1 => Some(targets.into_iter().next().unwrap()),
        _ => Some(Target::Multi(targets)),
    }
}

/// Split a token run at depth-0 occurrences of `separator`.
fn split_depth0(tokens: &[Token], separator: TokenType) -> Vec<Vec<Token>> {
    let mut segments = vec![Vec::new()];
    let mut depth = 0usize;
    for token in tokens {
        match token.kind {
            TokenType::LBracket => {
                depth += 1;
                segments.last_mut().unwrap().push(token.clone());
            }
            TokenType::RBracket => {
                depth = depth.saturating_sub(1);
                segments.last_mut().unwrap().push(token.clone());
            }
            kind if kind == separator && depth == 0 => segments.push(Vec::new()),
            _ => segments.last_mut().unwrap().push(token.clone()),
        }
    }
    segments
}

/// First depth-0 index of `kind`.
fn find_depth0(tokens: &[Token], kind: TokenType) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenType::LBracket => depth += 1,
            TokenType::RBracket => depth = depth.saturating_sub(1),
            k if k == kind && depth == 0 => return Some(idx),
            _ => {}
        }
    }
    None
}
