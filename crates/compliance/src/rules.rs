//! Tier-1 trigger tables
//!
//! Two tables feed tier 1: a fixed critical list that applies everywhere,
//! and a jurisdiction-specific table. The critical list is always checked
//! first, so a critical trigger can never be shadowed by a lower-severity
//! jurisdiction rule.

use once_cell::sync::Lazy;

use salescoach_core::{Jurisdiction, Severity};

/// One trigger-phrase rule. Phrases are stored lowercase and matched as
/// case-insensitive substrings of the utterance.
#[derive(Debug, Clone)]
pub struct TriggerRule {
    pub phrase: &'static str,
    pub category: &'static str,
    pub severity: Severity,
    pub message: &'static str,
    pub suggestion: &'static str,
}

/// Critical triggers, jurisdiction-independent. Always evaluated first.
static CRITICAL_RULES: Lazy<Vec<TriggerRule>> = Lazy::new(|| {
    vec![
        TriggerRule {
            phrase: "skip the paperwork",
            category: "disclosure_skipping",
            severity: Severity::Critical,
            message: "Offered to bypass required disclosures",
            suggestion: "Walk the customer through every required document instead",
        },
        TriggerRule {
            phrase: "keep this between us",
            category: "disclosure_skipping",
            severity: Severity::Critical,
            message: "Asked the customer to conceal part of the transaction",
            suggestion: "Everything discussed must be documented and reviewable",
        },
        TriggerRule {
            phrase: "off the record",
            category: "disclosure_skipping",
            severity: Severity::Critical,
            message: "Offered an undocumented side arrangement",
            suggestion: "Keep all terms on the record and in writing",
        },
        TriggerRule {
            phrase: "guaranteed returns",
            category: "misleading_claim",
            severity: Severity::Critical,
            message: "Promised returns that cannot be guaranteed",
            suggestion: "Describe historical performance with the required caveats",
        },
        TriggerRule {
            phrase: "you can't lose",
            category: "misleading_claim",
            severity: Severity::Critical,
            message: "Denied the existence of risk",
            suggestion: "State the risks plainly before discussing upside",
        },
        TriggerRule {
            phrase: "backdate",
            category: "falsification",
            severity: Severity::Critical,
            message: "Proposed falsifying a document date",
            suggestion: "Use the actual signing date; escalate timing problems",
        },
    ]
});

/// Standard-jurisdiction table: pressure and assurance language.
static STANDARD_RULES: Lazy<Vec<TriggerRule>> = Lazy::new(|| {
    vec![
        TriggerRule {
            phrase: "today only",
            category: "pressure_tactics",
            severity: Severity::Warning,
            message: "Applied artificial deadline pressure",
            suggestion: "Give the customer room to decide at their own pace",
        },
        TriggerRule {
            phrase: "last chance",
            category: "pressure_tactics",
            severity: Severity::Warning,
            message: "Applied scarcity pressure",
            suggestion: "Focus on fit rather than urgency",
        },
        TriggerRule {
            phrase: "everyone is buying",
            category: "pressure_tactics",
            severity: Severity::Warning,
            message: "Used herd pressure as a selling point",
            suggestion: "Anchor the pitch to this customer's situation",
        },
        TriggerRule {
            phrase: "trust me",
            category: "unsupported_assurance",
            severity: Severity::Info,
            message: "Offered a personal assurance in place of evidence",
            suggestion: "Back the claim with a document or number",
        },
    ]
});

/// Strict-jurisdiction table: the standard rules plus tighter phrasing
/// restrictions.
static STRICT_RULES: Lazy<Vec<TriggerRule>> = Lazy::new(|| {
    let mut rules = STANDARD_RULES.clone();
    rules.extend([
        TriggerRule {
            phrase: "risk free",
            category: "misleading_claim",
            severity: Severity::Warning,
            message: "Described the product as risk free",
            suggestion: "Name the risks, then the mitigations",
        },
        TriggerRule {
            phrase: "act now",
            category: "pressure_tactics",
            severity: Severity::Warning,
            message: "Demanded an immediate decision",
            suggestion: "Offer a follow-up instead of forcing the close",
        },
        TriggerRule {
            phrase: "limited time",
            category: "pressure_tactics",
            severity: Severity::Warning,
            message: "Implied an expiring offer",
            suggestion: "Only cite deadlines that actually exist in writing",
        },
    ]);
    rules
});

/// The fixed critical list.
pub fn critical_rules() -> &'static [TriggerRule] {
    &CRITICAL_RULES
}

/// The trigger table for a jurisdiction mode.
pub fn jurisdiction_rules(jurisdiction: Jurisdiction) -> &'static [TriggerRule] {
    match jurisdiction {
        Jurisdiction::Standard => &STANDARD_RULES,
        Jurisdiction::Strict => &STRICT_RULES,
    }
}
