//! Markdown projection
//!
//! Envelopes render as headers, section markers as sub-headers, lists as
//! bullet lists (never as debug representation), literal zones as fenced
//! code. Markdown is presentation-only: the projection is always lossy.

use crate::ast::{Document, Node, Value};
use crate::emitter::{emit_value, Projection};

pub fn project(document: &Document) -> Projection {
    let mut out = String::new();
    let mut fields_omitted = Vec::new();

    for envelope in &document.envelopes {
        if !envelope.implicit {
            out.push_str("# ");
            out.push_str(&envelope.name);
            out.push_str("\n\n");
        }
        render_nodes(&mut out, &envelope.nodes, 0, &mut fields_omitted);
    }

    Projection {
        output: out,
        lossy: true,
        fields_omitted,
    }
}

fn render_nodes(out: &mut String, nodes: &[Node], depth: usize, fields_omitted: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    for node in nodes {
        match node {
            Node::Assignment(assignment) => {
                match &assignment.value {
                    Value::List(items) => {
                        out.push_str(&indent);
                        out.push_str(&format!("**{}**:\n", assignment.key));
                        for item in items {
                            out.push_str(&indent);
                            out.push_str("- ");
                            out.push_str(&render_scalar(item));
                            out.push('\n');
                        }
                    }
                    other => {
                        out.push_str(&indent);
                        out.push_str(&format!(
                            "**{}**: {}\n",
                            assignment.key,
                            render_scalar(other)
                        ));
                    }
                }
            }
            Node::Block(block) => {
                out.push_str(&indent);
                out.push_str(&format!("**{}**:\n", block.key));
                render_nodes(out, &block.children, depth + 1, fields_omitted);
            }
            Node::Section(section) => {
                out.push_str("\n## §");
                out.push_str(&section.id);
                if let Some(label) = &section.label {
                    out.push(' ');
                    out.push_str(label);
                }
                out.push_str("\n\n");
            }
            Node::Comment(comment) => {
                fields_omitted.push(format!("// {}", comment.text));
            }
            Node::LiteralZone(zone) => {
                out.push_str("```");
                out.push_str(&zone.info);
                out.push('\n');
                out.push_str(&zone.content);
                out.push_str("\n```\n");
            }
        }
    }
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::Str { value, .. } => value.clone(),
        other => emit_value(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::normalize;
    use crate::parser::parse;

    #[test]
    fn arrays_render_as_bullets() {
        let normalized = normalize(parse("RISKS::[latency, drift]\n").document);
        let p = project(&normalized.document);
        assert!(p.output.contains("- latency\n"));
        assert!(p.output.contains("- drift\n"));
        assert!(!p.output.contains("List"));
        assert!(p.lossy);
    }

    #[test]
    fn envelopes_render_as_headers() {
        let normalized = normalize(parse("===STATUS_REPORT===\nOK::true\n===END===\n").document);
        let p = project(&normalized.document);
        assert!(p.output.starts_with("# STATUS_REPORT\n"));
        assert!(p.output.contains("**OK**: true"));
    }

    #[test]
    fn literal_zones_render_fenced() {
        let normalized = normalize(parse("CODE\n```python\nprint(1)\n```\n").document);
        let p = project(&normalized.document);
        assert!(p.output.contains("```python\nprint(1)\n```\n"));
    }
}
