//! Routing targets
//!
//! A target names where an extracted field is delivered: one of the
//! builtin destinations, a file-relative path (`§./path`), a name declared
//! in `POLICY.TARGETS`, or a multi-broadcast joined with `∨`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuiltinTarget {
    SelfTarget,
    Meta,
    Indexer,
    DecisionLog,
    RiskLog,
    KnowledgeBase,
}

impl BuiltinTarget {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "SELF" => Some(BuiltinTarget::SelfTarget),
            "META" => Some(BuiltinTarget::Meta),
            "INDEXER" => Some(BuiltinTarget::Indexer),
            "DECISION_LOG" => Some(BuiltinTarget::DecisionLog),
            "RISK_LOG" => Some(BuiltinTarget::RiskLog),
            "KNOWLEDGE_BASE" => Some(BuiltinTarget::KnowledgeBase),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BuiltinTarget::SelfTarget => "SELF",
            BuiltinTarget::Meta => "META",
            BuiltinTarget::Indexer => "INDEXER",
            BuiltinTarget::DecisionLog => "DECISION_LOG",
            BuiltinTarget::RiskLog => "RISK_LOG",
            BuiltinTarget::KnowledgeBase => "KNOWLEDGE_BASE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Builtin(BuiltinTarget),
    /// `§./relative/path` - delivered to a sibling document.
    File(String),
    /// Declared in `POLICY.TARGETS`, validated by the router.
    Named(String),
    /// `§A ∨ §B ∨ §C` - non-transactional broadcast.
    Multi(Vec<Target>),
}

impl Target {
    /// Parse a single (non-multi) target from its section-ref name.
    pub fn from_section_name(name: &str) -> Self {
        if let Some(builtin) = BuiltinTarget::from_name(name) {
            Target::Builtin(builtin)
        } else if name.starts_with("./") || name.starts_with('.') {
            Target::File(name.to_string())
        } else {
            Target::Named(name.to_string())
        }
    }

    /// Canonical rendering, section sign included.
    pub fn canonical(&self) -> String {
        match self {
            Target::Builtin(b) => format!("§{}", b.as_str()),
            Target::File(path) => format!("§{}", path),
            Target::Named(name) => format!("§{}", name),
            Target::Multi(targets) => targets
                .iter()
                .map(|t| t.canonical())
                .collect::<Vec<_>>()
                .join(" ∨ "),
        }
    }

    /// Flatten to the individual delivery destinations.
    pub fn destinations(&self) -> Vec<&Target> {
        match self {
            Target::Multi(targets) => targets.iter().flat_map(|t| t.destinations()).collect(),
            other => vec![other],
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical())
    }
}
