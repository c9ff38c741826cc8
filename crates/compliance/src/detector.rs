//! Two-tier violation detector

use std::collections::HashSet;
use std::sync::Arc;

use salescoach_core::{ComplianceClassifier, ComplianceViolation, Jurisdiction};

use crate::rules::{critical_rules, jurisdiction_rules};

/// Screens trainee utterances against the trigger tables, escalating to the
/// external deep-check only when tier 1 finds nothing.
///
/// Each `(transcript_index, text)` pair is evaluated at most once; revisiting
/// an entry is a no-op. The detector never deletes a violation; dismissal
/// is an explicit session action downstream.
pub struct ViolationDetector {
    jurisdiction: Jurisdiction,
    deep_check_enabled: bool,
    classifier: Option<Arc<dyn ComplianceClassifier>>,
    seen: HashSet<(usize, String)>,
}

impl ViolationDetector {
    pub fn new(jurisdiction: Jurisdiction, deep_check_enabled: bool) -> Self {
        Self {
            jurisdiction,
            deep_check_enabled,
            classifier: None,
            seen: HashSet::new(),
        }
    }

    /// Attach the tier-2 classifier. Without one, deep checking is skipped
    /// even when enabled.
    pub fn with_classifier(mut self, classifier: Arc<dyn ComplianceClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn jurisdiction(&self) -> Jurisdiction {
        self.jurisdiction
    }

    /// Screen one utterance.
    ///
    /// `transcript_index` is a back-reference to the entry being screened;
    /// `timestamp` is seconds since session start, stamped onto any
    /// violations produced.
    pub async fn screen(
        &mut self,
        transcript_index: usize,
        text: &str,
        timestamp: f64,
    ) -> Vec<ComplianceViolation> {
        if !self.seen.insert((transcript_index, text.to_string())) {
            return Vec::new();
        }

        // Tier 1: the fixed critical list wins over the jurisdiction table;
        // the first match short-circuits everything downstream.
        let lowered = text.to_lowercase();
        let tier1 = critical_rules()
            .iter()
            .chain(jurisdiction_rules(self.jurisdiction))
            .find(|rule| lowered.contains(rule.phrase));

        if let Some(rule) = tier1 {
            tracing::debug!(
                transcript_index,
                category = rule.category,
                "tier-1 trigger matched"
            );
            return vec![ComplianceViolation::new(
                rule.severity,
                rule.category,
                format!("{} (\"{}\")", rule.message, rule.phrase),
                rule.suggestion,
                transcript_index,
                timestamp,
            )];
        }

        // Tier 2: external deep-check, only when enabled and tier 1 stayed
        // silent. Failures are swallowed; tier 1 is the safety net.
        if self.deep_check_enabled {
            if let Some(classifier) = &self.classifier {
                match classifier.classify(text, self.jurisdiction).await {
                    Ok(findings) => {
                        return findings
                            .into_iter()
                            .map(|f| {
                                ComplianceViolation::new(
                                    f.severity,
                                    f.category,
                                    f.message,
                                    f.suggestion,
                                    transcript_index,
                                    timestamp,
                                )
                            })
                            .collect();
                    },
                    Err(e) => {
                        tracing::warn!(
                            service = classifier.service_name(),
                            transcript_index,
                            "deep-check failed, continuing on tier 1 alone: {}",
                            e
                        );
                    },
                }
            }
        }

        Vec::new()
    }
}
