//! Bearer token verification.
//!
//! The verification key is chosen by the token header algorithm:
//!
//! - `HS256` tokens are checked against the local shared secret
//! - `RS256` tokens are checked against the remote provider key named by `kid`
//!
//! Every other algorithm is refused. The key found for an RS256 token must
//! itself be an RSA key declared for RS256, so a token can never steer the
//! verifier into using key material of another family.

use std::sync::Arc;

use axum::http::{HeaderMap, header::AUTHORIZATION};
use jsonwebtoken::jwk::{AlgorithmParameters, KeyAlgorithm};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};

use crate::AuthResult;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::federation::{JwksError, RemoteJwksCache, RemoteJwksCacheConfig};
use crate::token::{JwtError, TokenClaims, TokenIssuer};

use super::types::AuthenticatedPrincipal;

/// Literal token accepted when the test bypass is enabled.
pub const TEST_TOKEN: &str = "test-token";

/// Remote provider settings used for RS256 tokens.
struct RemoteVerification {
    jwks: Arc<RemoteJwksCache>,
    audience: Option<String>,
    issuer: Option<String>,
}

/// Verifies bearer tokens and produces the request principal.
pub struct BearerVerifier {
    token_issuer: Arc<TokenIssuer>,
    remote: Option<RemoteVerification>,
    allow_test_token: bool,
}

impl BearerVerifier {
    /// Creates a verifier that accepts locally issued HS256 tokens only.
    #[must_use]
    pub fn new(token_issuer: Arc<TokenIssuer>) -> Self {
        Self {
            token_issuer,
            remote: None,
            allow_test_token: false,
        }
    }

    /// Enables RS256 verification against a remote key set.
    ///
    /// When `audience` is set, tokens must carry it in `aud`. When `issuer`
    /// is set, `iss` must equal it.
    #[must_use]
    pub fn with_remote(
        mut self,
        jwks: Arc<RemoteJwksCache>,
        audience: Option<String>,
        issuer: Option<String>,
    ) -> Self {
        self.remote = Some(RemoteVerification {
            jwks,
            audience,
            issuer,
        });
        self
    }

    /// Accepts the literal `test-token`. Development only.
    #[must_use]
    pub fn with_test_token(mut self, allow: bool) -> Self {
        self.allow_test_token = allow;
        self
    }

    /// Builds the verifier described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the remote key set cannot be set up.
    pub fn from_config(config: &AuthConfig, token_issuer: Arc<TokenIssuer>) -> AuthResult<Self> {
        let mut verifier = Self::new(token_issuer);

        if let Some(jwks_config) = RemoteJwksCacheConfig::from_provider(&config.remote)
            .map_err(|e| AuthError::configuration(e.to_string()))?
        {
            tracing::info!(jwks_url = %jwks_config.jwks_url, "RS256 verification enabled");
            let jwks = RemoteJwksCache::new(jwks_config)
                .map_err(|e| AuthError::configuration(e.to_string()))?;
            verifier = verifier.with_remote(
                Arc::new(jwks),
                config.remote.audience.clone(),
                config.remote.resolved_issuer(),
            );
        }

        if config.verifier.allow_test_token {
            tracing::warn!("test-token bypass is enabled; never use this outside development");
        }

        Ok(verifier.with_test_token(config.verifier.allow_test_token))
    }

    /// Extracts and verifies the bearer token in `headers`.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` if the header is missing, not `Bearer`, or empty
    /// - see [`BearerVerifier::verify`]
    pub async fn authenticate(&self, headers: &HeaderMap) -> AuthResult<AuthenticatedPrincipal> {
        let token = extract_bearer(headers)?;
        self.verify(token).await
    }

    /// Verifies a bearer token.
    ///
    /// # Errors
    ///
    /// - `InvalidToken` for malformed tokens, unsupported algorithms, unknown
    ///   keys, bad signatures or claims
    /// - `TokenExpired` for expired tokens
    /// - `RemoteKey` if the remote key set cannot be fetched
    pub async fn verify(&self, token: &str) -> AuthResult<AuthenticatedPrincipal> {
        if self.allow_test_token && token == TEST_TOKEN {
            tracing::debug!("accepted test-token");
            return Ok(AuthenticatedPrincipal::new("test-user", "test@example.com"));
        }

        let header = decode_header(token).map_err(|e| {
            tracing::debug!(error = %e, "undecodable token header");
            AuthError::invalid_token("Invalid token format")
        })?;

        let claims = match header.alg {
            Algorithm::HS256 => self.token_issuer.verify(token).map_err(|e| {
                tracing::debug!(error = %e, "HS256 token rejected");
                AuthError::from(e)
            })?,
            Algorithm::RS256 => self.verify_remote(token, header.kid.as_deref()).await?,
            other => {
                tracing::debug!(alg = ?other, "token signed with unsupported algorithm");
                return Err(AuthError::invalid_token("Unsupported signing algorithm"));
            }
        };

        Ok(AuthenticatedPrincipal::from(claims))
    }

    async fn verify_remote(&self, token: &str, kid: Option<&str>) -> AuthResult<TokenClaims> {
        let Some(remote) = &self.remote else {
            return Err(JwksError::NotConfigured.into());
        };

        let Some(kid) = kid else {
            return Err(AuthError::invalid_token("No key ID in token"));
        };

        let jwk = remote.jwks.find_key(kid).await.map_err(|e| {
            tracing::debug!(kid = %kid, error = %e, "no usable remote key");
            AuthError::from(e)
        })?;

        if !matches!(jwk.algorithm, AlgorithmParameters::RSA(_)) {
            tracing::warn!(kid = %kid, "RS256 token names a non-RSA key");
            return Err(AuthError::invalid_token("Key type does not match token algorithm"));
        }

        if let Some(alg) = jwk.common.key_algorithm.as_ref()
            && *alg != KeyAlgorithm::RS256
        {
            tracing::warn!(kid = %kid, alg = ?alg, "RS256 token names a key declared for another algorithm");
            return Err(AuthError::invalid_token("Key algorithm does not match token algorithm"));
        }

        let key = DecodingKey::from_jwk(&jwk).map_err(JwtError::from)?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = true;
        let mut required = vec!["exp"];
        match &remote.audience {
            Some(audience) => {
                validation.set_audience(&[audience]);
                required.push("aud");
            }
            None => validation.validate_aud = false,
        }
        if let Some(issuer) = &remote.issuer {
            validation.set_issuer(&[issuer]);
            required.push("iss");
        }
        validation.set_required_spec_claims(&required[..]);

        let claims = decode::<TokenClaims>(token, &key, &validation)
            .map_err(|e| {
                tracing::debug!(kid = %kid, error = %e, "RS256 token rejected");
                JwtError::from(e)
            })?
            .claims;

        Ok(claims)
    }
}

/// Extracts the token from an `Authorization: Bearer` header.
///
/// # Errors
///
/// Returns `Unauthorized` if the header is missing, not a bearer
/// credential, or empty.
pub fn extract_bearer(headers: &HeaderMap) -> AuthResult<&str> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Err(AuthError::unauthorized("Authorization header required"));
    };

    let value = value
        .to_str()
        .map_err(|_| AuthError::unauthorized("Bearer token required"))?;

    let Some(token) = value.strip_prefix("Bearer ") else {
        return Err(AuthError::unauthorized("Bearer token required"));
    };

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::unauthorized("Bearer token required"));
    }

    Ok(token)
}
