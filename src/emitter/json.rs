//! JSON projection
//!
//! Lists become arrays, inline maps become objects, blocks become nested
//! objects. Section markers and comments have no JSON shape and are
//! stripped; every stripped field is recorded so the loss is observable.
//! Flow expressions and holographic patterns are stringified canonically.

use serde_json::{Map, Value as Json};

use crate::ast::{Document, Node, Value};
use crate::emitter::{emit_value, Projection};

pub fn project(document: &Document) -> Projection {
    let mut lossy = false;
    let mut fields_omitted = Vec::new();

    let mut root = Map::new();
    for envelope in &document.envelopes {
        let object = nodes_to_json(&envelope.nodes, "", &mut lossy, &mut fields_omitted);
        if envelope.implicit {
            // Envelope-less content projects at the top level.
            if let Json::Object(entries) = object {
                for (key, value) in entries {
                    root.insert(key, value);
                }
            }
        } else {
            root.insert(envelope.name.clone(), object);
        }
    }

    let output = serde_json::to_string_pretty(&Json::Object(root))
        .unwrap_or_else(|_| "{}".to_string());

    Projection {
        output,
        lossy,
        fields_omitted,
    }
}

fn nodes_to_json(
    nodes: &[Node],
    path: &str,
    lossy: &mut bool,
    fields_omitted: &mut Vec<String>,
) -> Json {
    let mut object = Map::new();
    for node in nodes {
        match node {
            Node::Assignment(assignment) => {
                object.insert(
                    assignment.key.clone(),
                    value_to_json(&assignment.value, lossy),
                );
            }
            Node::Block(block) => {
                let child_path = join_path(path, &block.key);
                let child = nodes_to_json(&block.children, &child_path, lossy, fields_omitted);
                object.insert(block.key.clone(), child);
            }
            Node::Section(section) => {
                *lossy = true;
                fields_omitted.push(join_path(path, &format!("§{}", section.id)));
            }
            Node::Comment(_) => {
                *lossy = true;
            }
            Node::LiteralZone(zone) => {
                // Fence metadata does not survive; content does.
                *lossy = true;
                object.insert(zone.key.clone(), Json::String(zone.content.clone()));
            }
        }
    }
    Json::Object(object)
}

fn value_to_json(value: &Value, lossy: &mut bool) -> Json {
    match value {
        Value::Str { value, .. } => Json::String(value.clone()),
        Value::Number { raw, value } => {
            // Integral lexemes stay integers.
            if let Ok(n) = raw.parse::<i64>() {
                Json::Number(n.into())
            } else {
                serde_json::Number::from_f64(*value)
                    .map(Json::Number)
                    .unwrap_or(Json::Null)
            }
        }
        Value::Boolean(b) => Json::Bool(*b),
        Value::Null => Json::Null,
        Value::Version(v) => Json::String(v.clone()),
        Value::Variable(v) => Json::String(v.clone()),
        Value::SectionRef(s) => Json::String(format!("§{}", s)),
        Value::ColonPath(parts) => Json::String(parts.join(":")),
        Value::List(items) => Json::Array(items.iter().map(|v| value_to_json(v, lossy)).collect()),
        Value::InlineMap(entries) => {
            let mut object = Map::new();
            for (key, value) in entries {
                object.insert(key.clone(), value_to_json(value, lossy));
            }
            Json::Object(object)
        }
        holo @ Value::Holographic(_) => {
            *lossy = true;
            Json::String(emit_value(holo))
        }
        flow @ Value::Flow(_) => {
            *lossy = true;
            Json::String(emit_value(flow))
        }
    }
}

fn join_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::normalize;
    use crate::parser::parse;

    fn projected(text: &str) -> Projection {
        let normalized = normalize(parse(text).document);
        project(&normalized.document)
    }

    #[test]
    fn scalars_and_lists() {
        let p = projected("A::1\nB::\"two\"\nC::[1, 2]\n");
        let json: serde_json::Value = serde_json::from_str(&p.output).unwrap();
        assert_eq!(json["A"], 1);
        assert_eq!(json["B"], "two");
        assert_eq!(json["C"], serde_json::json!([1, 2]));
        assert!(!p.lossy);
    }

    #[test]
    fn inline_map_becomes_object() {
        let p = projected("M::[a::1, b::two]\n");
        let json: serde_json::Value = serde_json::from_str(&p.output).unwrap();
        assert_eq!(json["M"]["a"], 1);
        assert_eq!(json["M"]["b"], "two");
    }

    #[test]
    fn section_markers_are_recorded_losses() {
        let p = projected("§1: Intro\nA::1\n");
        assert!(p.lossy);
        assert_eq!(p.fields_omitted, vec!["§1"]);
    }

    #[test]
    fn envelopes_become_top_level_objects() {
        let p = projected("===META===\nSTATUS::ACTIVE\n===END===\n");
        let json: serde_json::Value = serde_json::from_str(&p.output).unwrap();
        assert_eq!(json["META"]["STATUS"], "ACTIVE");
    }
}
