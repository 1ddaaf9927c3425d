//! Authenticated client for the POAP HTTP API.
//!
//! Three resource fetches (drop detail, recent claims for a drop, a
//! wallet's collection) plus the ENS lookup used by the alias resolver.
//! Every call attaches the `X-API-Key` header and a bearer credential.
//!
//! Upstream failures map to the typed [`FeedError`] taxonomy. A 401 gets
//! exactly one credential refresh-and-retry; a second 401 surfaces as an
//! auth failure. 429 and other non-2xx statuses are never retried here;
//! policy belongs to the caller, and the response cache keeps re-requests
//! from amplifying load.

use std::fmt;
use std::sync::Arc;

use poapfeed_core::{ClaimRecord, DropRecord, parse_poap_timestamp};
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::auth::CredentialManager;
use crate::config::Config;
use crate::error::FeedError;

/// Client for api.poap.tech.
#[derive(Clone)]
pub struct PoapClient {
    http: reqwest::Client,
    config: Arc<Config>,
    credentials: CredentialManager,
}

impl PoapClient {
    /// Create a client sharing the process-wide HTTP pool and credential.
    pub fn new(http: reqwest::Client, config: Arc<Config>, credentials: CredentialManager) -> Self {
        Self {
            http,
            config,
            credentials,
        }
    }

    /// Fetch drop metadata by id.
    pub async fn get_event(&self, event_id: u64) -> Result<DropRecord, FeedError> {
        let details: EventDetails = self
            .get_json(
                &format!("/events/id/{event_id}"),
                &format!("drop {event_id}"),
            )
            .await?;
        Ok(details.into_record())
    }

    /// Fetch the most recent claims for a drop.
    pub async fn get_recent_claims(
        &self,
        event_id: u64,
        limit: usize,
    ) -> Result<Vec<ClaimRecord>, FeedError> {
        let response: TokensResponse = self
            .get_json(
                &format!("/event/{event_id}/poaps?limit={limit}&offset=0"),
                &format!("claims for drop {event_id}"),
            )
            .await?;
        Ok(normalize_event_tokens(event_id, response.into_tokens()))
    }

    /// Fetch a wallet's collected POAPs. `address` may be a raw address or
    /// an ENS name; the API accepts both.
    pub async fn get_address_collection(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<Vec<ClaimRecord>, FeedError> {
        let entries: Vec<ScanEntry> = self
            .get_json(
                &format!("/actions/scan/{address}?limit={limit}&offset=0"),
                &format!("address {address}"),
            )
            .await?;
        Ok(normalize_scan_entries(entries))
    }

    /// Look up the ENS name for an address. Returns `None` when the
    /// address has no alias; transport and status errors surface so the
    /// alias resolver can decide to swallow them.
    pub async fn lookup_ens(&self, address: &str) -> Result<Option<String>, FeedError> {
        let lookup: EnsLookup = self
            .get_json(
                &format!("/actions/ens_lookup/{address}"),
                &format!("ens for {address}"),
            )
            .await?;
        Ok(lookup.valid.then_some(lookup.ens).flatten())
    }

    /// Issue an authenticated GET and deserialize the JSON body.
    ///
    /// `resource` labels the request in errors and logs.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        resource: &str,
    ) -> Result<T, FeedError> {
        let url = format!("{}{path}", self.config.api_base);
        let mut refreshed = false;

        loop {
            let token = self.credentials.bearer_token().await?;

            tracing::debug!(url = %url, "upstream request");
            let response = self
                .http
                .get(&url)
                .header("X-API-Key", self.config.api_key.as_str())
                .bearer_auth(&token)
                .send()
                .await?;

            let status = response.status();
            if status == StatusCode::UNAUTHORIZED {
                if refreshed {
                    return Err(FeedError::Auth(format!(
                        "upstream rejected a freshly exchanged credential ({resource})"
                    )));
                }
                tracing::warn!(resource, "credential rejected, refreshing once");
                self.credentials.invalidate().await;
                refreshed = true;
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(map_error_status(status.as_u16(), body, resource));
            }

            let body = response.text().await?;
            return serde_json::from_str(&body).map_err(|e| {
                // Log the shape of the problem, not the payload itself.
                FeedError::Parse(format!("{resource}: {e} (body length {})", body.len()))
            });
        }
    }
}

/// Map a non-2xx upstream status to the error taxonomy.
fn map_error_status(status: u16, body: String, resource: &str) -> FeedError {
    match status {
        404 => FeedError::NotFound(resource.to_string()),
        429 => FeedError::RateLimited,
        _ => FeedError::Upstream { status, body },
    }
}

// ---------------------------------------------------------------------------
// Upstream response shapes
// ---------------------------------------------------------------------------

/// `/events/id/{id}` response.
#[derive(Debug, Deserialize)]
struct EventDetails {
    id: u64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    image_url: String,
    #[serde(default)]
    city: String,
    #[serde(default)]
    country: String,
    #[serde(default)]
    start_date: String,
}

impl EventDetails {
    fn into_record(self) -> DropRecord {
        let start_date = parse_poap_timestamp(&self.start_date);
        if start_date.is_none() && !self.start_date.is_empty() {
            tracing::warn!(drop_id = self.id, raw = %self.start_date, "unparseable drop start date");
        }
        DropRecord {
            id: self.id,
            name: self.name,
            description: self.description,
            image_url: self.image_url,
            city: self.city,
            country: self.country,
            start_date,
        }
    }
}

/// `/event/{id}/poaps` wraps its list under `tokens`, but older deployments
/// returned a bare array; accept both.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TokensResponse {
    Wrapped { tokens: Vec<EventToken> },
    Bare(Vec<EventToken>),
}

impl TokensResponse {
    fn into_tokens(self) -> Vec<EventToken> {
        match self {
            Self::Wrapped { tokens } => tokens,
            Self::Bare(tokens) => tokens,
        }
    }
}

/// One minted token from `/event/{id}/poaps`.
#[derive(Debug, Deserialize)]
struct EventToken {
    #[serde(default)]
    id: IdValue,
    #[serde(default)]
    created: String,
    #[serde(default)]
    transfer_count: u32,
    #[serde(default)]
    owner: TokenOwner,
    #[serde(default)]
    event: EmbeddedEvent,
}

/// Token owner as embedded in claim listings.
#[derive(Debug, Default, Deserialize)]
struct TokenOwner {
    #[serde(default)]
    id: String,
    #[serde(default)]
    ens: Option<String>,
}

/// One entry from `/actions/scan/{address}`.
#[derive(Debug, Deserialize)]
struct ScanEntry {
    #[serde(default, rename = "tokenId")]
    token_id: IdValue,
    #[serde(default)]
    created: String,
    #[serde(default)]
    transfer_count: u32,
    #[serde(default)]
    owner: String,
    #[serde(default)]
    event: EmbeddedEvent,
}

/// Drop summary embedded in token/scan entries.
#[derive(Debug, Default, Deserialize)]
struct EmbeddedEvent {
    #[serde(default)]
    id: u64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    image_url: String,
}

/// `/actions/ens_lookup/{address}` response.
#[derive(Debug, Deserialize)]
struct EnsLookup {
    #[serde(default)]
    valid: bool,
    #[serde(default)]
    ens: Option<String>,
}

/// Token ids arrive as numbers or strings depending on the endpoint.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IdValue {
    Num(u64),
    Str(String),
}

impl Default for IdValue {
    fn default() -> Self {
        Self::Str(String::new())
    }
}

impl fmt::Display for IdValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(n) => write!(f, "{n}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

/// Flatten event-scoped token entries into claim records.
///
/// Entries whose mint timestamp cannot be parsed are dropped with a
/// warning: a synthetic timestamp would break guid determinism and
/// ordering stability across renders.
fn normalize_event_tokens(event_id: u64, tokens: Vec<EventToken>) -> Vec<ClaimRecord> {
    tokens
        .into_iter()
        .filter_map(|token| {
            let Some(claimed_at) = parse_poap_timestamp(&token.created) else {
                tracing::warn!(event_id, raw = %token.created, "skipping claim with unparseable mint time");
                return None;
            };
            Some(ClaimRecord {
                event_id,
                token_id: token.id.to_string(),
                claimant: token.owner.id,
                claimant_alias: token.owner.ens.filter(|ens| !ens.is_empty()),
                claimed_at,
                transfer_count: token.transfer_count,
                event_name: token.event.name,
                event_image_url: token.event.image_url,
            })
        })
        .collect()
}

/// Flatten address-scan entries into claim records.
fn normalize_scan_entries(entries: Vec<ScanEntry>) -> Vec<ClaimRecord> {
    entries
        .into_iter()
        .filter_map(|entry| {
            let Some(claimed_at) = parse_poap_timestamp(&entry.created) else {
                tracing::warn!(raw = %entry.created, "skipping collection item with unparseable mint time");
                return None;
            };
            Some(ClaimRecord {
                event_id: entry.event.id,
                token_id: entry.token_id.to_string(),
                claimant: entry.owner,
                claimant_alias: None,
                claimed_at,
                transfer_count: entry.transfer_count,
                event_name: entry.event.name,
                event_image_url: entry.event.image_url,
            })
        })
        .collect()
}
