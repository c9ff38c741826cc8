//! Counterpart token issuance client

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Deserialize;

use salescoach_config::constants::limits;
use salescoach_core::{Error, Result, SessionToken, TokenIssuer};

use crate::{build_client, map_transport};

/// Exchanges nothing for a short-lived counterpart connection token.
pub struct HttpTokenIssuer {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
    /// Seconds of validity; the issuer's default applies when absent
    #[serde(default)]
    expires_in_secs: Option<i64>,
}

impl HttpTokenIssuer {
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            client: build_client(timeout_secs),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl TokenIssuer for HttpTokenIssuer {
    async fn issue(&self) -> Result<SessionToken> {
        let response = self
            .client
            .post(&self.endpoint)
            .send()
            .await
            .map_err(|e| map_transport("token issuance", e))?;

        if !response.status().is_success() {
            return Err(Error::RemoteService(format!(
                "token issuance returned {}",
                response.status()
            )));
        }

        let parsed: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::RemoteService(format!("token response: {}", e)))?;

        let ttl = parsed.expires_in_secs.unwrap_or(limits::TOKEN_TTL_SECS);
        Ok(SessionToken::new(
            parsed.token,
            Utc::now() + Duration::seconds(ttl),
        ))
    }
}
