//! Coaching analysis and compliance deep-check clients

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use salescoach_core::{
    AnalysisRequest, CoachAnalyzer, ComplianceClassifier, DeepCheckFinding, Error, Jurisdiction,
    Result, SuggestionVerdict,
};

use crate::{build_client, map_transport};

/// Coaching analysis over HTTP: posts the transcript excerpt, phase, and
/// dedup list; the service answers with an optional suggestion verdict.
pub struct HttpCoachAnalyzer {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct AnalysisResponse {
    /// Absent or null when no suggestion is warranted this cycle
    #[serde(default)]
    suggestion: Option<SuggestionVerdict>,
}

impl HttpCoachAnalyzer {
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            client: build_client(timeout_secs),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl CoachAnalyzer for HttpCoachAnalyzer {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<Option<SuggestionVerdict>> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| map_transport("analysis", e))?;

        if !response.status().is_success() {
            return Err(Error::RemoteService(format!(
                "analysis returned {}",
                response.status()
            )));
        }

        let parsed: AnalysisResponse = response
            .json()
            .await
            .map_err(|e| Error::RemoteService(format!("analysis response: {}", e)))?;

        Ok(parsed.suggestion)
    }

    fn service_name(&self) -> &str {
        "http-coach-analyzer"
    }
}

/// Compliance deep-check over HTTP.
pub struct HttpComplianceClassifier {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Serialize)]
struct DeepCheckRequest<'a> {
    utterance: &'a str,
    jurisdiction: Jurisdiction,
}

#[derive(Debug, Deserialize)]
struct DeepCheckResponse {
    #[serde(default)]
    violations: Vec<DeepCheckFinding>,
}

impl HttpComplianceClassifier {
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            client: build_client(timeout_secs),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl ComplianceClassifier for HttpComplianceClassifier {
    async fn classify(
        &self,
        utterance: &str,
        jurisdiction: Jurisdiction,
    ) -> Result<Vec<DeepCheckFinding>> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&DeepCheckRequest {
                utterance,
                jurisdiction,
            })
            .send()
            .await
            .map_err(|e| map_transport("deep-check", e))?;

        if !response.status().is_success() {
            return Err(Error::RemoteService(format!(
                "deep-check returned {}",
                response.status()
            )));
        }

        let parsed: DeepCheckResponse = response
            .json()
            .await
            .map_err(|e| Error::RemoteService(format!("deep-check response: {}", e)))?;

        Ok(parsed.violations)
    }

    fn service_name(&self) -> &str {
        "http-compliance-classifier"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use salescoach_core::{Phase, Speaker, TranscriptEntry};

    #[test]
    fn test_analysis_request_shape() {
        let request = AnalysisRequest {
            excerpt: vec![TranscriptEntry::new(
                Speaker::Trainee,
                "so what brings you in",
                4.0,
                Phase::Rapport,
            )],
            phase: Phase::Rapport,
            already_sent: vec!["slow down".to_string()],
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["phase"], "rapport");
        assert_eq!(json["excerpt"][0]["speaker"], "trainee");
        assert_eq!(json["already_sent"][0], "slow down");
    }

    #[test]
    fn test_analysis_response_with_and_without_verdict() {
        let empty: AnalysisResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.suggestion.is_none());

        let full: AnalysisResponse = serde_json::from_str(
            r#"{
                "suggestion": {
                    "kind": "warning",
                    "hook_category": "authority",
                    "priority": "high",
                    "content": "Cite the fund's actual track record",
                    "advance_phase": false
                }
            }"#,
        )
        .unwrap();
        let verdict = full.suggestion.unwrap();
        assert_eq!(verdict.content, "Cite the fund's actual track record");
    }

    #[test]
    fn test_deep_check_wire_shapes() {
        let request = DeepCheckRequest {
            utterance: "this will definitely pay off",
            jurisdiction: Jurisdiction::Strict,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["jurisdiction"], "strict");

        let response: DeepCheckResponse = serde_json::from_str(
            r#"{
                "violations": [{
                    "severity": "warning",
                    "category": "implied_guarantee",
                    "message": "Implied certainty of outcome",
                    "suggestion": "Hedge with the required language"
                }]
            }"#,
        )
        .unwrap();
        assert_eq!(response.violations.len(), 1);

        let empty: DeepCheckResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.violations.is_empty());
    }
}
