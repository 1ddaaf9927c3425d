//! Application configuration loaded from environment variables.

use std::time::Duration;

use poapfeed_core::{
    DEFAULT_CACHE_TTL_MINUTES, DEFAULT_INACTIVITY_THRESHOLD_WEEKS, DEFAULT_RECENT_CLAIMS_LIMIT,
};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g., "0.0.0.0:8080").
    pub bind_addr: String,

    /// POAP API key, sent as the `X-API-Key` header.
    pub api_key: String,

    /// OAuth client id for the client-credentials exchange.
    pub client_id: String,

    /// OAuth client secret.
    pub client_secret: String,

    /// POAP API base URL. Also used as the OAuth audience.
    pub api_base: String,

    /// OAuth token endpoint.
    pub auth_url: String,

    /// Base URL of this service (self links, dormant-feed reference page).
    pub base_url: String,

    /// Whole weeks without claims before a feed gets an inactivity notice.
    pub inactivity_threshold_weeks: i64,

    /// Most recent claims included per feed.
    pub recent_claims_limit: usize,

    /// TTL for cached upstream responses.
    pub cache_ttl: Duration,

    /// Maximum number of cached upstream responses.
    pub cache_capacity: u64,

    /// Per-call timeout for upstream HTTP requests.
    pub upstream_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `POAP_API_KEY`: API key for api.poap.tech
    /// - `POAP_CLIENT_ID` / `POAP_CLIENT_SECRET`: OAuth client credentials
    ///
    /// Optional:
    /// - `POAPFEED_BIND_ADDR`: bind address (default: "0.0.0.0:8080")
    /// - `POAP_API_BASE`: API base URL (default: "https://api.poap.tech")
    /// - `POAP_AUTH_URL`: token endpoint
    ///   (default: "https://auth.accounts.poap.xyz/oauth/token")
    /// - `POAPFEED_BASE_URL`: public URL of this service
    ///   (default: "http://localhost:8080")
    /// - `INACTIVITY_THRESHOLD_WEEKS`: dormancy threshold (default: 4)
    /// - `RECENT_CLAIMS_LIMIT`: claims per feed (default: 20)
    /// - `CACHE_TTL_MINUTES`: upstream response TTL (default: 15)
    /// - `CACHE_CAPACITY`: max cached responses (default: 10000)
    /// - `UPSTREAM_TIMEOUT_SECS`: per-call HTTP timeout (default: 10)
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr =
            std::env::var("POAPFEED_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let api_key = std::env::var("POAP_API_KEY")
            .map_err(|_| anyhow::anyhow!("POAP_API_KEY must be set"))?;
        let client_id = std::env::var("POAP_CLIENT_ID")
            .map_err(|_| anyhow::anyhow!("POAP_CLIENT_ID must be set"))?;
        let client_secret = std::env::var("POAP_CLIENT_SECRET")
            .map_err(|_| anyhow::anyhow!("POAP_CLIENT_SECRET must be set"))?;

        let api_base = std::env::var("POAP_API_BASE")
            .unwrap_or_else(|_| "https://api.poap.tech".to_string())
            .trim_end_matches('/')
            .to_string();

        let auth_url = std::env::var("POAP_AUTH_URL")
            .unwrap_or_else(|_| "https://auth.accounts.poap.xyz/oauth/token".to_string());

        let base_url = std::env::var("POAPFEED_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8080".to_string())
            .trim_end_matches('/')
            .to_string();

        let inactivity_threshold_weeks = parse_env(
            "INACTIVITY_THRESHOLD_WEEKS",
            DEFAULT_INACTIVITY_THRESHOLD_WEEKS,
        )?;
        let recent_claims_limit = parse_env("RECENT_CLAIMS_LIMIT", DEFAULT_RECENT_CLAIMS_LIMIT)?;
        let cache_ttl_minutes: u64 = parse_env("CACHE_TTL_MINUTES", DEFAULT_CACHE_TTL_MINUTES as u64)?;
        let cache_capacity = parse_env("CACHE_CAPACITY", 10_000u64)?;
        let upstream_timeout_secs: u64 = parse_env("UPSTREAM_TIMEOUT_SECS", 10)?;

        tracing::info!(
            bind_addr = %bind_addr,
            api_base = %api_base,
            base_url = %base_url,
            inactivity_threshold_weeks,
            recent_claims_limit,
            cache_ttl_minutes,
            "configuration loaded"
        );

        Ok(Self {
            bind_addr,
            api_key,
            client_id,
            client_secret,
            api_base,
            auth_url,
            base_url,
            inactivity_threshold_weeks,
            recent_claims_limit,
            cache_ttl: Duration::from_secs(cache_ttl_minutes * 60),
            cache_capacity,
            upstream_timeout: Duration::from_secs(upstream_timeout_secs),
        })
    }
}

/// Parse an optional env var, falling back to a default when unset.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid value for {key}: '{raw}'")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mutex to serialize config tests that manipulate env vars.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const ENV_KEYS: &[&str] = &[
        "POAPFEED_BIND_ADDR",
        "POAP_API_KEY",
        "POAP_CLIENT_ID",
        "POAP_CLIENT_SECRET",
        "POAP_API_BASE",
        "POAP_AUTH_URL",
        "POAPFEED_BASE_URL",
        "INACTIVITY_THRESHOLD_WEEKS",
        "RECENT_CLAIMS_LIMIT",
        "CACHE_TTL_MINUTES",
        "CACHE_CAPACITY",
        "UPSTREAM_TIMEOUT_SECS",
    ];

    /// Helper to run config tests with isolated env vars.
    /// Uses a mutex to prevent concurrent env var races.
    fn with_env_vars<F: FnOnce()>(vars: &[(&str, &str)], f: F) {
        let _guard = ENV_MUTEX.lock().unwrap();

        let saved: Vec<_> = ENV_KEYS
            .iter()
            .map(|k| (*k, std::env::var(k).ok()))
            .collect();

        // SAFETY: Serialized by mutex; only test code touches these vars.
        unsafe {
            for k in ENV_KEYS {
                std::env::remove_var(k);
            }
            for (k, v) in vars {
                std::env::set_var(k, v);
            }
        }

        f();

        // SAFETY: Restoring original env state.
        unsafe {
            for (k, v) in &saved {
                match v {
                    Some(val) => std::env::set_var(k, val),
                    None => std::env::remove_var(k),
                }
            }
        }
    }

    const CREDS: &[(&str, &str)] = &[
        ("POAP_API_KEY", "test-key"),
        ("POAP_CLIENT_ID", "test-id"),
        ("POAP_CLIENT_SECRET", "test-secret"),
    ];

    #[test]
    fn config_defaults() {
        with_env_vars(CREDS, || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.bind_addr, "0.0.0.0:8080");
            assert_eq!(config.api_base, "https://api.poap.tech");
            assert_eq!(config.auth_url, "https://auth.accounts.poap.xyz/oauth/token");
            assert_eq!(config.base_url, "http://localhost:8080");
            assert_eq!(config.inactivity_threshold_weeks, 4);
            assert_eq!(config.recent_claims_limit, 20);
            assert_eq!(config.cache_ttl, Duration::from_secs(15 * 60));
            assert_eq!(config.upstream_timeout, Duration::from_secs(10));
        });
    }

    #[test]
    fn config_missing_api_key_rejected() {
        with_env_vars(
            &[
                ("POAP_CLIENT_ID", "test-id"),
                ("POAP_CLIENT_SECRET", "test-secret"),
            ],
            || {
                let err = Config::from_env().unwrap_err();
                assert!(err.to_string().contains("POAP_API_KEY"));
            },
        );
    }

    #[test]
    fn config_custom_values() {
        let mut vars = CREDS.to_vec();
        vars.extend_from_slice(&[
            ("POAPFEED_BIND_ADDR", "127.0.0.1:9090"),
            ("POAP_API_BASE", "http://localhost:4010"),
            ("INACTIVITY_THRESHOLD_WEEKS", "2"),
            ("RECENT_CLAIMS_LIMIT", "5"),
            ("CACHE_TTL_MINUTES", "1"),
        ]);
        with_env_vars(&vars, || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.bind_addr, "127.0.0.1:9090");
            assert_eq!(config.api_base, "http://localhost:4010");
            assert_eq!(config.inactivity_threshold_weeks, 2);
            assert_eq!(config.recent_claims_limit, 5);
            assert_eq!(config.cache_ttl, Duration::from_secs(60));
        });
    }

    #[test]
    fn config_base_urls_trailing_slash_stripped() {
        let mut vars = CREDS.to_vec();
        vars.extend_from_slice(&[
            ("POAP_API_BASE", "https://api.poap.tech/"),
            ("POAPFEED_BASE_URL", "https://feeds.example.com/"),
        ]);
        with_env_vars(&vars, || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.api_base, "https://api.poap.tech");
            assert_eq!(config.base_url, "https://feeds.example.com");
        });
    }

    #[test]
    fn config_invalid_number_rejected() {
        let mut vars = CREDS.to_vec();
        vars.push(("RECENT_CLAIMS_LIMIT", "many"));
        with_env_vars(&vars, || {
            let err = Config::from_env().unwrap_err();
            assert!(err.to_string().contains("RECENT_CLAIMS_LIMIT"));
        });
    }
}
