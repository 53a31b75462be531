//! Repair tiers and the repair log
//!
//! Three tiers govern what the pipeline may change:
//!
//! - NORMALIZATION: always on, always audited. Envelope case, ASCII alias
//!   rewriting, whitespace collapse, boolean lowercasing, multi-word
//!   coalescing, duplicate-key resolution. These happen in the lexer,
//!   parser and normalizer; their audit records are the W-coded warnings.
//! - REPAIR: opt-in (`fix = true`). ENUM casefold when unambiguous, and
//!   string coercion when TYPE demands it. Logged here.
//! - FORBIDDEN: inventing required fields or targets, collapsing ⇌
//!   boundaries, strengthening claims. There is deliberately no code path
//!   that constructs these: the tier exists only as documentation.

use serde::{Deserialize, Serialize};

use crate::diagnostics::{Code, Diagnostic};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepairTier {
    Normalization,
    Repair,
}

/// One logged transformation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairAction {
    pub rule_id: String,
    pub path: String,
    pub before: String,
    pub after: String,
    pub tier: RepairTier,
    pub safe: bool,
    pub semantics_changed: bool,
}

/// Project the NORMALIZATION-tier audit records out of a diagnostic list
/// so callers get one uniform repair log across both tiers.
pub fn normalization_actions(diagnostics: &[Diagnostic]) -> Vec<RepairAction> {
    diagnostics
        .iter()
        .filter_map(|diag| {
            let rule_id = match diag.code {
                Code::W001 => "normalize",
                Code::W002 => "ascii_alias",
                Code::W003 => "envelope_case",
                Code::WMultiword => "multiword_coalesce",
                Code::WDuplicateKey => "duplicate_key_last_wins",
                _ => return None,
            };
            Some(RepairAction {
                rule_id: rule_id.to_string(),
                path: diag
                    .position
                    .map(|p| p.to_string())
                    .unwrap_or_default(),
                before: diag.got.clone().unwrap_or_default(),
                after: diag.expected.clone().unwrap_or_default(),
                tier: RepairTier::Normalization,
                safe: true,
                semantics_changed: false,
            })
        })
        .collect()
}
