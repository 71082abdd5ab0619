//! Remote identity provider key set fetching and caching.
//!
//! RS256 bearer tokens are issued by an external identity provider. Their
//! public keys are published as a JSON Web Key Set, which this module fetches
//! and keeps for a freshness window (default 1 hour).
//!
//! # Concurrency
//!
//! The current key set lives behind an [`ArcSwapOption`]. Readers load it
//! without locking. A refresh fetches without holding any lock and publishes
//! the new set with a single atomic store; concurrent refreshes may both
//! fetch, and the last store wins.
//!
//! # Key Rotation
//!
//! When a token names a `kid` the cached set doesn't contain, one forced
//! refresh is attempted, at most once per `min_refresh_interval`.
//!
//! # Example
//!
//! ```ignore
//! use idm_auth::federation::{RemoteJwksCache, RemoteJwksCacheConfig};
//!
//! let config = RemoteJwksCacheConfig::new(Url::parse("https://tenant.auth0.com/.well-known/jwks.json")?);
//! let cache = RemoteJwksCache::new(config)?;
//! let jwk = cache.find_key("key-1").await?;
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwapOption;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use url::Url;

use crate::config::RemoteProviderConfig;
use crate::error::AuthError;

/// Configuration for the remote key set cache.
#[derive(Debug, Clone)]
pub struct RemoteJwksCacheConfig {
    /// Key set URL.
    pub jwks_url: Url,

    /// Freshness window (default: 1 hour).
    pub cache_ttl: Duration,

    /// HTTP request timeout (default: 10 seconds).
    pub request_timeout: Duration,

    /// Minimum age of the cached set before an unknown `kid` may force a
    /// refresh (default: 5 minutes).
    pub min_refresh_interval: Duration,

    /// Maximum response size in bytes (default: 1 MB).
    pub max_response_size: usize,

    /// Whether to allow HTTP (non-HTTPS) URLs.
    /// This should only be enabled for testing.
    pub allow_http: bool,
}

impl RemoteJwksCacheConfig {
    /// Creates a configuration with default values for `jwks_url`.
    #[must_use]
    pub fn new(jwks_url: Url) -> Self {
        Self {
            jwks_url,
            cache_ttl: Duration::from_secs(3600),             // 1 hour
            request_timeout: Duration::from_secs(10),         // 10 seconds
            min_refresh_interval: Duration::from_secs(300),   // 5 minutes
            max_response_size: 1024 * 1024,                   // 1 MB
            allow_http: false,
        }
    }

    /// Builds the cache configuration from the remote provider settings.
    ///
    /// Returns `Ok(None)` if no remote provider is configured.
    ///
    /// # Errors
    ///
    /// Returns `JwksError::InvalidUrl` if the key set URL cannot be parsed.
    pub fn from_provider(remote: &RemoteProviderConfig) -> Result<Option<Self>, JwksError> {
        let Some(url) = remote.resolved_jwks_url() else {
            return Ok(None);
        };
        let jwks_url = Url::parse(&url).map_err(|e| JwksError::InvalidUrl(e.to_string()))?;

        Ok(Some(
            Self::new(jwks_url)
                .with_cache_ttl(remote.cache_ttl)
                .with_request_timeout(remote.request_timeout)
                .with_min_refresh_interval(remote.min_refresh_interval)
                .with_max_response_size(remote.max_response_size)
                .with_allow_http(remote.allow_http),
        ))
    }

    /// Sets the freshness window.
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Sets the HTTP request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the forced refresh rate limit.
    #[must_use]
    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    /// Sets the maximum response size.
    #[must_use]
    pub fn with_max_response_size(mut self, size: usize) -> Self {
        self.max_response_size = size;
        self
    }

    /// Allows HTTP (non-HTTPS) key set URLs.
    ///
    /// # Warning
    ///
    /// This should only be used for testing.
    #[must_use]
    pub fn with_allow_http(mut self, allow: bool) -> Self {
        self.allow_http = allow;
        self
    }
}

/// Errors that can occur during key set operations.
#[derive(Debug, thiserror::Error)]
pub enum JwksError {
    /// No remote provider is configured.
    #[error("Remote identity provider not configured")]
    NotConfigured,

    /// The key set URL is malformed.
    #[error("Invalid JWKS URL: {0}")]
    InvalidUrl(String),

    /// The key set URL scheme is not allowed.
    #[error("Invalid URL scheme: only HTTPS is allowed")]
    InvalidScheme,

    /// A network error occurred while fetching the key set.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The HTTP request returned a non-success status code.
    #[error("HTTP error: status {0}")]
    HttpError(u16),

    /// The response exceeded the maximum allowed size.
    #[error("Response exceeds maximum size of {max_size} bytes")]
    ResponseTooLarge {
        /// The maximum allowed size.
        max_size: usize,
    },

    /// The response could not be parsed as a key set.
    #[error("Failed to parse JWKS: {0}")]
    ParseError(String),

    /// The requested key was not found in the key set.
    #[error("Key not found: {0}")]
    KeyNotFound(String),
}

impl JwksError {
    /// Returns `true` if the failure is about the token rather than the
    /// provider.
    #[must_use]
    pub fn is_token_error(&self) -> bool {
        matches!(self, Self::KeyNotFound(_) | Self::NotConfigured)
    }
}

impl From<JwksError> for AuthError {
    fn from(err: JwksError) -> Self {
        match err {
            JwksError::KeyNotFound(_) => AuthError::invalid_token("No matching key found"),
            JwksError::NotConfigured => {
                AuthError::invalid_token("Remote identity provider not configured")
            }
            other => AuthError::remote_key(other.to_string()),
        }
    }
}

/// A fetched key set and when it was fetched.
#[derive(Debug)]
pub struct CachedJwks {
    /// The key set.
    pub jwks: JwkSet,
    /// Fetch time.
    pub fetched_at: Instant,
}

impl CachedJwks {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

/// Cache for the remote provider's key set.
pub struct RemoteJwksCache {
    /// HTTP client for fetching the key set.
    http_client: reqwest::Client,
    /// Current key set, if fetched.
    current: ArcSwapOption<CachedJwks>,
    /// Configuration.
    config: RemoteJwksCacheConfig,
}

impl RemoteJwksCache {
    /// Creates a cache. Nothing is fetched until the first lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL scheme is not allowed or the HTTP client
    /// cannot be built.
    pub fn new(config: RemoteJwksCacheConfig) -> Result<Self, JwksError> {
        validate_scheme(&config.jwks_url, config.allow_http)?;

        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| JwksError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            current: ArcSwapOption::empty(),
            config,
        })
    }

    /// Returns the key set URL.
    #[must_use]
    pub fn jwks_url(&self) -> &Url {
        &self.config.jwks_url
    }

    /// Returns the cached key set without fetching, fresh or not.
    #[must_use]
    pub fn cached(&self) -> Option<Arc<CachedJwks>> {
        self.current.load_full()
    }

    /// Drops the cached key set.
    pub fn invalidate(&self) {
        self.current.store(None);
        tracing::debug!(url = %self.config.jwks_url, "JWKS cache invalidated");
    }

    /// Returns a fresh key set, fetching one if the cache is empty or stale.
    ///
    /// # Errors
    ///
    /// Returns an error if a fetch is needed and fails.
    pub async fn key_set(&self) -> Result<Arc<CachedJwks>, JwksError> {
        if let Some(cached) = self.current.load_full()
            && cached.is_fresh(self.config.cache_ttl)
        {
            return Ok(cached);
        }

        self.refresh().await
    }

    /// Finds a key by `kid`.
    ///
    /// A miss on a cached set older than `min_refresh_interval` triggers one
    /// forced refresh before giving up.
    ///
    /// # Errors
    ///
    /// Returns `JwksError::KeyNotFound` if the key is absent after any
    /// allowed refresh, or a fetch error.
    pub async fn find_key(&self, kid: &str) -> Result<Jwk, JwksError> {
        let cached = self.key_set().await?;
        if let Some(jwk) = cached.jwks.find(kid) {
            return Ok(jwk.clone());
        }

        if cached.fetched_at.elapsed() < self.config.min_refresh_interval {
            tracing::debug!(kid = %kid, "kid not in key set, refresh rate limited");
            return Err(JwksError::KeyNotFound(kid.to_string()));
        }

        tracing::debug!(kid = %kid, "kid not in key set, forcing refresh");
        let refreshed = self.refresh().await?;
        refreshed
            .jwks
            .find(kid)
            .cloned()
            .ok_or_else(|| JwksError::KeyNotFound(kid.to_string()))
    }

    /// Fetches the key set and publishes it.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The HTTP request fails or times out
    /// - The response status is not a success
    /// - The response is larger than `max_response_size`
    /// - The body is not a key set
    pub async fn refresh(&self) -> Result<Arc<CachedJwks>, JwksError> {
        let url = &self.config.jwks_url;
        tracing::debug!(url = %url, "fetching JWKS");

        let response = self
            .http_client
            .get(url.as_str())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(url = %url, error = %e, "failed to fetch JWKS");
                JwksError::NetworkError(e.to_string())
            })?;

        if !response.status().is_success() {
            tracing::warn!(url = %url, status = %response.status(), "JWKS endpoint returned error");
            return Err(JwksError::HttpError(response.status().as_u16()));
        }

        let max_size = self.config.max_response_size;
        if let Some(len) = response.content_length()
            && len > max_size as u64
        {
            return Err(JwksError::ResponseTooLarge { max_size });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| JwksError::NetworkError(e.to_string()))?;
        if body.len() > max_size {
            return Err(JwksError::ResponseTooLarge { max_size });
        }

        let jwks: JwkSet = serde_json::from_slice(&body).map_err(|e| {
            tracing::warn!(url = %url, error = %e, "failed to parse JWKS");
            JwksError::ParseError(e.to_string())
        })?;

        tracing::debug!(url = %url, keys = jwks.keys.len(), "JWKS cached");

        let cached = Arc::new(CachedJwks {
            jwks,
            fetched_at: Instant::now(),
        });
        self.current.store(Some(Arc::clone(&cached)));
        Ok(cached)
    }
}

fn validate_scheme(url: &Url, allow_http: bool) -> Result<(), JwksError> {
    match url.scheme() {
        "https" => Ok(()),
        "http" if allow_http => Ok(()),
        _ => Err(JwksError::InvalidScheme),
    }
}
