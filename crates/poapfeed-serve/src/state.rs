//! Application state shared across all request handlers.

use std::sync::Arc;

use crate::auth::CredentialManager;
use crate::cache::{self, FeedCache};
use crate::config::Config;
use crate::poap::PoapClient;

/// Shared application state available to all request handlers.
///
/// Holds the warm-instance pieces: the upstream HTTP pool, the held
/// credential (inside the client), and the response cache. All of it is
/// initialized once and reused for the lifetime of the process.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<Config>,

    /// Upstream response cache.
    pub cache: FeedCache,

    /// Authenticated POAP API client.
    pub poap: PoapClient,
}

impl AppState {
    /// Create application state from configuration.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let config = Arc::new(config);

        let http = reqwest::Client::builder()
            .timeout(config.upstream_timeout)
            .user_agent(concat!("poapfeed/", env!("CARGO_PKG_VERSION")))
            .build()?;

        // Backstop TTL above the per-entry expiry so moka reclaims space
        // for keys that are never requested again.
        let cache = cache::new_cache(config.cache_capacity, config.cache_ttl * 2);

        let credentials = CredentialManager::new(http.clone(), Arc::clone(&config));
        let poap = PoapClient::new(http, Arc::clone(&config), credentials);

        tracing::info!(
            cache_capacity = config.cache_capacity,
            cache_ttl_secs = config.cache_ttl.as_secs(),
            "application state initialized"
        );

        Ok(Self {
            config,
            cache,
            poap,
        })
    }

    /// Per-entry cache TTL as a chrono duration.
    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.config.cache_ttl)
            .unwrap_or_else(|_| chrono::Duration::minutes(poapfeed_core::DEFAULT_CACHE_TTL_MINUTES))
    }
}
