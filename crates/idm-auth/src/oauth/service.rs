//! Authorization code flow controller.
//!
//! [`AuthorizationService`] implements the two halves of the PKCE flow:
//!
//! - **Initiate**: validate the client and redirect URI, bind a new code to
//!   the PKCE challenge and the authenticated principal
//! - **Exchange**: consume the code, check state and verifier, issue a token
//!
//! The HTTP handlers in [`crate::http`] are thin wrappers around it.

use std::sync::Arc;
use std::time::Duration;

use crate::AuthResult;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::oauth::authorize::{AuthorizationGrant, AuthorizationRequest};
use crate::oauth::code::{AuthorizationCode, DEFAULT_CODE_LIFETIME, NewAuthorizationCode};
use crate::oauth::pkce::{
    PkceChallenge, PkceChallengeMethod, PkceError, PkceVerifier, new_state,
};
use crate::oauth::token::{RefreshRequest, TokenRequest, TokenResponse};
use crate::storage::{AuthorizationCodeStorage, ClientStorage};
use crate::token::TokenIssuer;
use crate::types::Principal;

/// Error message shared by every client or redirect URI failure.
const INVALID_CLIENT_MESSAGE: &str = "invalid client or redirect_uri";

/// Error message shared by every code lookup failure.
const INVALID_CODE_MESSAGE: &str = "invalid or expired authorization code";

/// The only grant type accepted by the token endpoint.
pub const AUTHORIZATION_CODE_GRANT: &str = "authorization_code";

/// Configuration for the authorization service.
#[derive(Debug, Clone)]
pub struct AuthorizationConfig {
    /// Authorization code lifetime.
    /// Default: 10 minutes.
    pub code_lifetime: Duration,

    /// Scope stored when the request carries none.
    pub default_scope: String,
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self {
            code_lifetime: DEFAULT_CODE_LIFETIME,
            default_scope: "openid profile email".to_string(),
        }
    }
}

impl AuthorizationConfig {
    /// Sets a custom code lifetime.
    #[must_use]
    pub fn with_code_lifetime(mut self, lifetime: Duration) -> Self {
        self.code_lifetime = lifetime;
        self
    }

    /// Sets the default scope.
    #[must_use]
    pub fn with_default_scope(mut self, scope: impl Into<String>) -> Self {
        self.default_scope = scope.into();
        self
    }
}

impl From<&AuthConfig> for AuthorizationConfig {
    fn from(config: &AuthConfig) -> Self {
        Self {
            code_lifetime: config.oauth.authorization_code_lifetime,
            default_scope: config.oauth.default_scope.clone(),
        }
    }
}

/// Authorization service for the authorization code + PKCE flow.
pub struct AuthorizationService {
    /// Client storage for looking up registered clients.
    client_storage: Arc<dyn ClientStorage>,

    /// Code storage for issued authorization codes.
    code_storage: Arc<dyn AuthorizationCodeStorage>,

    /// Signs access tokens.
    token_issuer: Arc<TokenIssuer>,

    /// Service configuration.
    config: AuthorizationConfig,
}

impl AuthorizationService {
    /// Creates a new authorization service.
    #[must_use]
    pub fn new(
        client_storage: Arc<dyn ClientStorage>,
        code_storage: Arc<dyn AuthorizationCodeStorage>,
        token_issuer: Arc<TokenIssuer>,
        config: AuthorizationConfig,
    ) -> Self {
        Self {
            client_storage,
            code_storage,
            token_issuer,
            config,
        }
    }

    /// Validates an authorization request and binds a new code to it.
    ///
    /// # Errors
    ///
    /// Validation runs in this order and stops at the first failure:
    ///
    /// 1. Missing `client_id` or `redirect_uri` (`InvalidRequest`)
    /// 2. Unknown or inactive client, unregistered redirect URI
    ///    (`InvalidRequest` with a generic message)
    /// 3. Missing `code_challenge`, unsupported method, or a `plain`
    ///    challenge that is not a well-formed verifier (`InvalidRequest`)
    /// 4. No principal (`AuthenticationRequired`)
    pub async fn initiate(
        &self,
        request: &AuthorizationRequest,
        principal: Option<&Principal>,
    ) -> AuthResult<AuthorizationGrant> {
        if request.client_id.is_empty() {
            return Err(AuthError::invalid_request("client_id is required"));
        }

        if request.redirect_uri.is_empty() {
            return Err(AuthError::invalid_request("redirect_uri is required"));
        }

        self.validate_client(&request.client_id, &request.redirect_uri)
            .await?;

        if request.code_challenge.is_empty() {
            return Err(AuthError::invalid_request("code_challenge is required"));
        }

        let method = PkceChallengeMethod::parse(&request.code_challenge_method)
            .map_err(|e| AuthError::invalid_request(e.to_string()))?;

        // Under `plain` the verifier must equal the challenge, so the challenge
        // has to meet the verifier grammar or the code could never be redeemed.
        if method == PkceChallengeMethod::Plain
            && let Err(e) = PkceVerifier::new(request.code_challenge.clone())
        {
            tracing::debug!(client_id = %request.client_id, error = %e, "malformed plain code_challenge");
            return Err(AuthError::invalid_request(
                "code_challenge must be 43-128 unreserved characters with the plain method",
            ));
        }

        let Some(principal) = principal else {
            return Err(AuthError::AuthenticationRequired);
        };

        let state = match request.state.as_deref() {
            Some(state) if !state.is_empty() => state.to_string(),
            _ => new_state(),
        };

        let scope = if request.scope.trim().is_empty() {
            self.config.default_scope.clone()
        } else {
            request.scope.clone()
        };

        let record = AuthorizationCode::issue(
            NewAuthorizationCode {
                code_challenge: request.code_challenge.clone(),
                code_challenge_method: method,
                client_id: request.client_id.clone(),
                redirect_uri: request.redirect_uri.clone(),
                scope,
                state: Some(state.clone()),
                subject: Some(principal.subject.clone()),
                email: Some(principal.email.clone()).filter(|e| !e.is_empty()),
            },
            self.config.code_lifetime,
        );
        let code = record.code.clone();

        self.code_storage.create(record).await?;

        tracing::info!(
            client_id = %request.client_id,
            subject = %principal.subject,
            method = %method,
            "authorization code issued"
        );

        Ok(AuthorizationGrant {
            code,
            state,
            redirect_uri: request.redirect_uri.clone(),
        })
    }

    /// Exchanges an authorization code for an access token.
    ///
    /// The code is consumed before the verifier is checked, so a wrong
    /// verifier burns the code.
    ///
    /// # Errors
    ///
    /// - `UnsupportedGrantType` if `grant_type` is not `authorization_code`
    /// - `InvalidRequest` if a required parameter is missing or the verifier
    ///   is malformed
    /// - `InvalidGrant` if the code is unknown, used, expired or bound to
    ///   another client or redirect URI, or if state or verifier mismatch
    pub async fn exchange(&self, request: &TokenRequest) -> AuthResult<TokenResponse> {
        if request.grant_type != AUTHORIZATION_CODE_GRANT {
            return Err(AuthError::unsupported_grant_type(&request.grant_type));
        }

        for (name, value) in [
            ("code", &request.code),
            ("client_id", &request.client_id),
            ("redirect_uri", &request.redirect_uri),
            ("code_verifier", &request.code_verifier),
        ] {
            if value.is_empty() {
                return Err(AuthError::invalid_request(format!("{name} is required")));
            }
        }

        let verifier = PkceVerifier::new(request.code_verifier.clone()).map_err(|e| {
            tracing::debug!(client_id = %request.client_id, error = %e, "malformed code_verifier");
            AuthError::invalid_request("invalid code_verifier format")
        })?;

        let record = self
            .code_storage
            .consume(&request.code, &request.client_id, &request.redirect_uri)
            .await
            .map_err(|e| {
                tracing::warn!(client_id = %request.client_id, reason = %e, "code exchange rejected");
                AuthError::from(e)
            })?;

        if let Some(state) = request.state.as_deref()
            && !state.is_empty()
            && record.state.as_deref() != Some(state)
        {
            tracing::warn!(client_id = %request.client_id, "state mismatch on code exchange");
            return Err(AuthError::invalid_grant("invalid state parameter"));
        }

        let method = record.challenge_method().map_err(|e| {
            tracing::warn!(client_id = %request.client_id, error = %e, "stored code unusable");
            AuthError::invalid_grant(INVALID_CODE_MESSAGE)
        })?;

        PkceChallenge::new(record.code_challenge.clone())
            .verify(method, &verifier)
            .map_err(|e: PkceError| {
                tracing::warn!(client_id = %request.client_id, error = %e, "PKCE verification failed");
                AuthError::invalid_grant("invalid code_verifier")
            })?;

        let Some(subject) = record.subject.as_deref().filter(|s| !s.is_empty()) else {
            tracing::warn!(client_id = %request.client_id, "code has no bound subject");
            return Err(AuthError::invalid_grant(INVALID_CODE_MESSAGE));
        };

        let issued = self.token_issuer.issue(
            subject,
            record.email.as_deref(),
            Some(&record.client_id),
        )?;

        tracing::info!(
            client_id = %record.client_id,
            subject = %subject,
            "access token issued"
        );

        Ok(TokenResponse::new(
            issued.access_token,
            issued.expires_in,
            record.scope,
        ))
    }

    /// Refresh token grant. Always fails with `NotImplemented` once the
    /// request is well formed.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` if `refresh_token` or `client_id` is missing
    /// - `NotImplemented` otherwise
    pub async fn refresh(&self, request: &RefreshRequest) -> AuthResult<TokenResponse> {
        if request.refresh_token.is_empty() {
            return Err(AuthError::invalid_request("refresh_token is required"));
        }
        if request.client_id.is_empty() {
            return Err(AuthError::invalid_request("client_id is required"));
        }

        Err(AuthError::not_implemented("refresh tokens"))
    }

    async fn validate_client(&self, client_id: &str, redirect_uri: &str) -> AuthResult<()> {
        let Some(client) = self.client_storage.find_by_client_id(client_id).await? else {
            tracing::warn!(client_id = %client_id, "authorization request for unknown client");
            return Err(AuthError::invalid_request(INVALID_CLIENT_MESSAGE));
        };

        if !client.active {
            tracing::warn!(client_id = %client_id, "authorization request for inactive client");
            return Err(AuthError::invalid_request(INVALID_CLIENT_MESSAGE));
        }

        if !client.is_redirect_uri_allowed(redirect_uri) {
            tracing::warn!(
                client_id = %client_id,
                redirect_uri = %redirect_uri,
                "redirect_uri not registered for client"
            );
            return Err(AuthError::invalid_request(INVALID_CLIENT_MESSAGE));
        }

        Ok(())
    }

    /// Returns the client storage.
    #[must_use]
    pub fn client_storage(&self) -> &Arc<dyn ClientStorage> {
        &self.client_storage
    }

    /// Returns the token issuer.
    #[must_use]
    pub fn token_issuer(&self) -> &Arc<TokenIssuer> {
        &self.token_issuer
    }

    /// Returns the service configuration.
    #[must_use]
    pub fn config(&self) -> &AuthorizationConfig {
        &self.config
    }
}
