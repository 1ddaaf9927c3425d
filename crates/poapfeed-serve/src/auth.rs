//! Delegated credential management for the POAP API.
//!
//! The API requires a bearer token obtained through an OAuth
//! client-credentials exchange. Tokens are valid for hours while a warm
//! process may serve many requests, so the manager holds the current
//! credential and only re-exchanges when it is near expiry, the key
//! latency/cost optimization of the whole service.
//!
//! Concurrent requests may race to refresh; that is tolerated by design.
//! Refreshing is idempotent and side-effect-free beyond issuing another
//! token, so no lock is held across the network call and the last writer
//! wins.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::config::Config;
use crate::error::FeedError;

/// A credential is refreshed this many seconds before its actual expiry so
/// that in-flight upstream calls never ride a token about to lapse.
const EXPIRY_SAFETY_MARGIN_SECS: i64 = 60;

/// A delegated bearer credential with its expiry.
#[derive(Debug, Clone)]
pub struct Credential {
    /// The access token.
    pub token: String,
    /// When the token expires.
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    /// Whether the credential is still usable at `now`, honoring the
    /// safety margin.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_SAFETY_MARGIN_SECS) < self.expires_at
    }
}

/// Client-credentials exchange request body.
#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    audience: &'a str,
    grant_type: &'static str,
    client_id: &'a str,
    client_secret: &'a str,
}

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

/// Process-wide holder of the current POAP API credential.
#[derive(Clone)]
pub struct CredentialManager {
    http: reqwest::Client,
    config: Arc<Config>,
    current: Arc<RwLock<Option<Credential>>>,
}

impl CredentialManager {
    /// Create a manager with no credential; the first caller triggers an
    /// exchange.
    pub fn new(http: reqwest::Client, config: Arc<Config>) -> Self {
        Self {
            http,
            config,
            current: Arc::new(RwLock::new(None)),
        }
    }

    /// Return a bearer token valid beyond the safety margin, exchanging
    /// credentials with the authorization endpoint when needed.
    pub async fn bearer_token(&self) -> Result<String, FeedError> {
        if let Some(credential) = self.current.read().await.as_ref()
            && credential.is_valid_at(Utc::now())
        {
            return Ok(credential.token.clone());
        }

        self.refresh().await
    }

    /// Drop the held credential so the next call performs a fresh exchange.
    /// Used when the upstream rejects a token that looked valid.
    pub async fn invalidate(&self) {
        *self.current.write().await = None;
    }

    /// Perform the client-credentials exchange and store the result.
    async fn refresh(&self) -> Result<String, FeedError> {
        tracing::info!(auth_url = %self.config.auth_url, "refreshing POAP API credential");

        let request = TokenRequest {
            audience: &self.config.api_base,
            grant_type: "client_credentials",
            client_id: &self.config.client_id,
            client_secret: &self.config.client_secret,
        };

        let response = self
            .http
            .post(&self.config.auth_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| FeedError::Auth(format!("token exchange request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Auth(format!(
                "token endpoint returned status {status}"
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| FeedError::Auth(format!("malformed token response: {e}")))?;

        let credential = Credential {
            token: token_response.access_token,
            expires_at: Utc::now() + Duration::seconds(token_response.expires_in),
        };

        tracing::info!(expires_at = %credential.expires_at, "credential refreshed");

        let token = credential.token.clone();
        *self.current.write().await = Some(credential);
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn credential_valid_well_before_expiry() {
        let credential = Credential {
            token: "abc".to_string(),
            expires_at: at(10_000),
        };
        assert!(credential.is_valid_at(at(5_000)));
    }

    #[test]
    fn credential_invalid_within_safety_margin() {
        let credential = Credential {
            token: "abc".to_string(),
            expires_at: at(10_000),
        };
        // 30s to expiry: inside the 60s margin, must refresh instead.
        assert!(!credential.is_valid_at(at(9_970)));
    }

    #[test]
    fn credential_invalid_after_expiry() {
        let credential = Credential {
            token: "abc".to_string(),
            expires_at: at(10_000),
        };
        assert!(!credential.is_valid_at(at(10_001)));
    }

    #[test]
    fn token_response_parses() {
        let parsed: TokenResponse =
            serde_json::from_str(r#"{"access_token":"tok123","expires_in":7200,"token_type":"Bearer"}"#)
                .unwrap();
        assert_eq!(parsed.access_token, "tok123");
        assert_eq!(parsed.expires_in, 7200);
    }

    #[test]
    fn token_response_defaults_expiry() {
        let parsed: TokenResponse = serde_json::from_str(r#"{"access_token":"tok123"}"#).unwrap();
        assert_eq!(parsed.expires_in, 3600);
    }
}
