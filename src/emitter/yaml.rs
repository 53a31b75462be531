//! YAML projection
//!
//! Block-style mirror of the JSON projection: the same tree is built and
//! handed to `serde_yaml`, which renders nested mappings in block style
//! and multi-line strings as folded scalars. Loss accounting is identical
//! to JSON.

use crate::ast::Document;
use crate::emitter::{json, Projection};

pub fn project(document: &Document) -> Projection {
    let base = json::project(document);
    let tree: serde_json::Value =
        serde_json::from_str(&base.output).unwrap_or(serde_json::Value::Null);
    let output = serde_yaml::to_string(&tree).unwrap_or_else(|_| "{}\n".to_string());

    Projection {
        output,
        lossy: base.lossy,
        fields_omitted: base.fields_omitted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::normalize;
    use crate::parser::parse;

    #[test]
    fn block_style_mapping() {
        let normalized = normalize(parse("===META===\nSTATUS::ACTIVE\nCOUNT::3\n===END===\n").document);
        let p = project(&normalized.document);
        assert!(p.output.contains("META:"));
        assert!(p.output.contains("  STATUS: ACTIVE"));
        assert!(p.output.contains("  COUNT: 3"));
    }

    #[test]
    fn multi_line_strings_fold() {
        let normalized = normalize(parse("NOTE::\"\"\"line one\nline two\"\"\"\n").document);
        let p = project(&normalized.document);
        // serde_yaml renders embedded newlines as a block scalar.
        assert!(p.output.contains("NOTE:"));
        assert!(p.output.contains("line one"));
        assert!(p.output.contains("line two"));
    }
}
