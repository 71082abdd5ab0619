//! Authentication and authorization configuration.
//!
//! Covers the PKCE issuer (code and token lifetimes, signing secret), the
//! remote identity provider used for RS256 verification, verifier switches,
//! and the seed data for the in-memory client registry and user directory.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::types::{Client, Principal};

/// Minimum length of the HS256 signing secret in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Root authentication configuration.
///
/// # Example (TOML)
///
/// ```toml
/// [auth]
/// issuer = "https://idm.example.com"
/// login_path = "/login"
///
/// [auth.signing]
/// secret = "change-me-to-a-long-random-value-of-32-bytes"
///
/// [auth.remote]
/// domain = "tenant.auth0.com"
/// audience = "https://api.example.com"
///
/// [[auth.clients]]
/// client_id = "demo-client"
/// redirect_uris = ["https://app.example/callback"]
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Issuer URL placed in locally issued tokens and the discovery document.
    pub issuer: String,

    /// Path of the external login step. Unauthenticated browsers are sent
    /// here with the original request preserved in `redirect`.
    pub login_path: String,

    /// OAuth 2.0 lifetimes and scopes.
    pub oauth: OAuthConfig,

    /// Local HS256 signing key.
    pub signing: SigningConfig,

    /// Remote identity provider for RS256 tokens.
    pub remote: RemoteProviderConfig,

    /// Bearer verifier switches.
    pub verifier: VerifierConfig,

    /// Clients seeded into the registry at startup.
    pub clients: Vec<Client>,

    /// Users seeded into the session user directory at startup.
    pub users: Vec<Principal>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: "http://localhost:8080".to_string(),
            login_path: "/login".to_string(),
            oauth: OAuthConfig::default(),
            signing: SigningConfig::default(),
            remote: RemoteProviderConfig::default(),
            verifier: VerifierConfig::default(),
            clients: Vec::new(),
            users: Vec::new(),
        }
    }
}

/// OAuth 2.0 configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// Authorization code lifetime.
    #[serde(with = "humantime_serde")]
    pub authorization_code_lifetime: Duration,

    /// Access token lifetime.
    #[serde(with = "humantime_serde")]
    pub access_token_lifetime: Duration,

    /// Scope stored on a code when the request carries none.
    pub default_scope: String,

    /// Scopes advertised by the PKCE configuration endpoint.
    pub supported_scopes: Vec<String>,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            authorization_code_lifetime: Duration::from_secs(600), // 10 minutes
            access_token_lifetime: Duration::from_secs(3600),      // 1 hour
            default_scope: "openid profile email".to_string(),
            supported_scopes: vec![
                "openid".to_string(),
                "profile".to_string(),
                "email".to_string(),
                "offline_access".to_string(),
            ],
        }
    }
}

/// Local HS256 signing configuration.
///
/// The secret is injected from configuration or the environment
/// (`IDM__AUTH__SIGNING__SECRET`); there is no built-in default.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Shared HMAC secret.
    pub secret: String,

    /// Key id placed in the `kid` header and the published key set.
    pub key_id: String,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            key_id: "default".to_string(),
        }
    }
}

impl std::fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningConfig")
            .field("secret", &"<redacted>")
            .field("key_id", &self.key_id)
            .finish()
    }
}

/// Remote identity provider used to verify RS256 tokens.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RemoteProviderConfig {
    /// Provider domain, e.g. `tenant.auth0.com`.
    pub domain: Option<String>,

    /// Explicit JWKS URL. Defaults to `https://{domain}/.well-known/jwks.json`.
    pub jwks_url: Option<String>,

    /// Expected `aud` value. When set, tokens must carry it.
    pub audience: Option<String>,

    /// Expected `iss` value. Defaults to `https://{domain}/`.
    pub expected_issuer: Option<String>,

    /// How long a fetched key set is considered fresh.
    #[serde(with = "humantime_serde")]
    pub cache_ttl: Duration,

    /// Timeout for a single key set fetch.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Minimum interval between forced refreshes on unknown `kid`.
    #[serde(with = "humantime_serde")]
    pub min_refresh_interval: Duration,

    /// Maximum key set response size in bytes.
    pub max_response_size: usize,

    /// Allow plain HTTP key set URLs. Testing only.
    pub allow_http: bool,
}

impl Default for RemoteProviderConfig {
    fn default() -> Self {
        Self {
            domain: None,
            jwks_url: None,
            audience: None,
            expected_issuer: None,
            cache_ttl: Duration::from_secs(3600),
            request_timeout: Duration::from_secs(10),
            min_refresh_interval: Duration::from_secs(300),
            max_response_size: 1024 * 1024,
            allow_http: false,
        }
    }
}

impl RemoteProviderConfig {
    /// Returns `true` if a remote provider is configured.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.jwks_url.is_some() || self.domain.is_some()
    }

    /// Resolves the key set URL.
    #[must_use]
    pub fn resolved_jwks_url(&self) -> Option<String> {
        self.jwks_url.clone().or_else(|| {
            self.domain
                .as_ref()
                .map(|d| format!("https://{}/.well-known/jwks.json", d.trim_end_matches('/')))
        })
    }

    /// Resolves the expected issuer.
    #[must_use]
    pub fn resolved_issuer(&self) -> Option<String> {
        self.expected_issuer.clone().or_else(|| {
            self.domain
                .as_ref()
                .map(|d| format!("https://{}/", d.trim_end_matches('/')))
        })
    }
}

/// Bearer verifier switches.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Accept the literal `test-token` as a fixed test principal.
    /// Never enable outside development.
    pub allow_test_token: bool,
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The issuer is empty
    /// - The signing secret is missing or shorter than 32 bytes
    /// - A lifetime is zero
    /// - A seeded client is invalid
    /// - The remote key set URL cannot be parsed
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.issuer.is_empty() {
            return Err(ConfigError::InvalidValue(
                "issuer cannot be empty".to_string(),
            ));
        }

        if self.signing.secret.is_empty() {
            return Err(ConfigError::Missing("auth.signing.secret".to_string()));
        }

        if self.signing.secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::InvalidValue(format!(
                "auth.signing.secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }

        if self.oauth.authorization_code_lifetime.is_zero() {
            return Err(ConfigError::InvalidValue(
                "authorization_code_lifetime must be > 0".to_string(),
            ));
        }

        if self.oauth.access_token_lifetime.is_zero() {
            return Err(ConfigError::InvalidValue(
                "access_token_lifetime must be > 0".to_string(),
            ));
        }

        if !self.login_path.starts_with('/') {
            return Err(ConfigError::InvalidValue(
                "login_path must start with '/'".to_string(),
            ));
        }

        for client in &self.clients {
            client.validate().map_err(|e| {
                ConfigError::InvalidValue(format!("client '{}': {e}", client.client_id))
            })?;
        }

        if let Some(url) = self.remote.resolved_jwks_url() {
            url::Url::parse(&url).map_err(|e| {
                ConfigError::InvalidValue(format!("remote jwks url '{url}': {e}"))
            })?;
        }

        if self.remote.request_timeout.is_zero() {
            return Err(ConfigError::InvalidValue(
                "remote.request_timeout must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AuthConfig {
        let mut config = AuthConfig::default();
        config.signing.secret = "0123456789abcdef0123456789abcdef".to_string();
        config
    }

    #[test]
    fn test_default_config_requires_secret() {
        let err = AuthConfig::default().validate().unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
        assert!(err.to_string().contains("signing.secret"));
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_short_secret_fails_validation() {
        let mut config = valid_config();
        config.signing.secret = "short".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("at least 32 bytes"));
    }

    #[test]
    fn test_empty_issuer_fails_validation() {
        let mut config = valid_config();
        config.issuer = String::new();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
        assert!(err.to_string().contains("issuer"));
    }

    #[test]
    fn test_invalid_client_fails_validation() {
        let mut config = valid_config();
        config.clients.push(Client::new("c", "C", Vec::new()));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("client 'c'"));
    }

    #[test]
    fn test_oauth_default_lifetimes() {
        let oauth = OAuthConfig::default();
        assert_eq!(oauth.authorization_code_lifetime, Duration::from_secs(600));
        assert_eq!(oauth.access_token_lifetime, Duration::from_secs(3600));
        assert_eq!(oauth.default_scope, "openid profile email");
    }

    #[test]
    fn test_test_token_disabled_by_default() {
        assert!(!AuthConfig::default().verifier.allow_test_token);
    }

    #[test]
    fn test_remote_urls_derived_from_domain() {
        let remote = RemoteProviderConfig {
            domain: Some("tenant.auth0.com".to_string()),
            ..Default::default()
        };
        assert!(remote.is_enabled());
        assert_eq!(
            remote.resolved_jwks_url().as_deref(),
            Some("https://tenant.auth0.com/.well-known/jwks.json")
        );
        assert_eq!(
            remote.resolved_issuer().as_deref(),
            Some("https://tenant.auth0.com/")
        );

        let explicit = RemoteProviderConfig {
            domain: Some("tenant.auth0.com".to_string()),
            jwks_url: Some("https://keys.example/jwks".to_string()),
            expected_issuer: Some("https://issuer.example/".to_string()),
            ..Default::default()
        };
        assert_eq!(
            explicit.resolved_jwks_url().as_deref(),
            Some("https://keys.example/jwks")
        );
        assert_eq!(
            explicit.resolved_issuer().as_deref(),
            Some("https://issuer.example/")
        );

        assert!(!RemoteProviderConfig::default().is_enabled());
    }

    #[test]
    fn test_humantime_durations() {
        let config: AuthConfig = serde_json::from_str(
            r#"{"oauth":{"authorization_code_lifetime":"5m","access_token_lifetime":"2h"}}"#,
        )
        .unwrap();
        assert_eq!(
            config.oauth.authorization_code_lifetime,
            Duration::from_secs(300)
        );
        assert_eq!(config.oauth.access_token_lifetime, Duration::from_secs(7200));
    }

    #[test]
    fn test_signing_secret_redacted_in_debug() {
        let config = valid_config();
        let debug = format!("{:?}", config.signing);
        assert!(!debug.contains("0123456789abcdef"));
        assert!(debug.contains("redacted"));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidValue("test error".to_string());
        assert_eq!(err.to_string(), "Invalid configuration value: test error");

        let err = ConfigError::Missing("required_field".to_string());
        assert_eq!(
            err.to_string(),
            "Missing required configuration: required_field"
        );
    }
}
