//! Authorization code records.
//!
//! A record binds a one-time code to the client, redirect URI, PKCE challenge
//! and authenticated subject of an authorization request.
//!
//! # Lifecycle
//!
//! 1. Created by Initiate with `used = false`
//! 2. Consumed exactly once by a successful Exchange (`used = true`)
//! 3. Never deleted by the issuer; expiry is checked lazily on consume

use std::time::Duration;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::Rng;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::AuthError;
use crate::oauth::pkce::PkceChallengeMethod;

/// Default authorization code lifetime.
pub const DEFAULT_CODE_LIFETIME: Duration = Duration::from_secs(600);

/// A stored authorization code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationCode {
    /// One-time code value.
    pub code: String,

    /// PKCE code challenge from the authorization request.
    pub code_challenge: String,

    /// PKCE challenge method, `S256` or `plain`.
    pub code_challenge_method: String,

    /// Client the code was issued to.
    pub client_id: String,

    /// Redirect URI the code was issued for.
    pub redirect_uri: String,

    /// Granted scope.
    pub scope: String,

    /// State from the authorization request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    /// Subject of the authenticated principal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Email of the authenticated principal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// When the code was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When the code stops being exchangeable.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// Whether the code has been exchanged.
    pub used: bool,
}

/// Parameters for [`AuthorizationCode::issue`].
#[derive(Debug, Clone)]
pub struct NewAuthorizationCode {
    /// PKCE code challenge.
    pub code_challenge: String,
    /// PKCE challenge method.
    pub code_challenge_method: PkceChallengeMethod,
    /// Client id.
    pub client_id: String,
    /// Redirect URI.
    pub redirect_uri: String,
    /// Granted scope.
    pub scope: String,
    /// Request state.
    pub state: Option<String>,
    /// Authenticated subject.
    pub subject: Option<String>,
    /// Authenticated email.
    pub email: Option<String>,
}

impl AuthorizationCode {
    /// Builds a fresh, unused record with a newly generated code.
    #[must_use]
    pub fn issue(params: NewAuthorizationCode, lifetime: Duration) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            code: Self::generate_code(),
            code_challenge: params.code_challenge,
            code_challenge_method: params.code_challenge_method.as_str().to_string(),
            client_id: params.client_id,
            redirect_uri: params.redirect_uri,
            scope: params.scope,
            state: params.state,
            subject: params.subject,
            email: params.email,
            created_at: now,
            expires_at: now + lifetime,
            used: false,
        }
    }

    /// Generates a new authorization code.
    ///
    /// The code is the base64url encoding (no padding) of 16 bytes of
    /// big-endian unix nanoseconds followed by 32 random bytes, so every code
    /// carries 256 bits of entropy plus a time component.
    #[must_use]
    pub fn generate_code() -> String {
        let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
        let random: [u8; 32] = rand::thread_rng().r#gen();

        let mut bytes = Vec::with_capacity(48);
        bytes.extend_from_slice(&nanos.to_be_bytes());
        bytes.extend_from_slice(&random);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Returns `true` if the code has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(OffsetDateTime::now_utc())
    }

    /// Returns `true` if the code is expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now > self.expires_at
    }

    /// Returns `true` if a principal was bound at authorization time.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.subject.as_deref().is_some_and(|s| !s.is_empty())
    }

    /// Parses the stored challenge method.
    ///
    /// # Errors
    ///
    /// Returns `CodeError::Corrupt` if the stored method is unknown.
    pub fn challenge_method(&self) -> Result<PkceChallengeMethod, CodeError> {
        PkceChallengeMethod::parse(&self.code_challenge_method)
            .map_err(|_| CodeError::Corrupt("unknown code_challenge_method".to_string()))
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Errors raised by authorization code storage.
#[derive(Debug, thiserror::Error)]
pub enum CodeError {
    /// No unused record matches the code, client and redirect URI.
    #[error("invalid or expired authorization code")]
    InvalidOrExpired,

    /// The matching record has expired.
    #[error("authorization code expired")]
    Expired,

    /// The generated code already exists.
    #[error("authorization code collision")]
    Collision,

    /// A stored record cannot be interpreted.
    #[error("corrupt authorization code record: {0}")]
    Corrupt(String),

    /// The backing store failed.
    #[error("authorization code storage failed: {0}")]
    Storage(String),
}

impl From<CodeError> for AuthError {
    fn from(err: CodeError) -> Self {
        match err {
            CodeError::InvalidOrExpired | CodeError::Expired => {
                AuthError::invalid_grant("invalid or expired authorization code")
            }
            CodeError::Collision | CodeError::Corrupt(_) | CodeError::Storage(_) => {
                AuthError::storage(err.to_string())
            }
        }
    }
}
