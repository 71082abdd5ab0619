//! Bearer token claims, issuance and HS256 verification.
//!
//! Locally issued access tokens are HS256 JWTs signed with the configured
//! shared secret. Tokens issued by the remote identity provider are RS256 and
//! are verified by [`crate::middleware::BearerVerifier`] against the remote
//! key set; this module only supplies their claim shape.
//!
//! ## Example
//!
//! ```ignore
//! use idm_auth::token::TokenIssuer;
//!
//! let issuer = TokenIssuer::new(secret, "default", "https://idm.example.com", lifetime)?;
//! let issued = issuer.issue("user-1", Some("alice@example.com"), Some("demo-client"))?;
//! let claims = issuer.verify(&issued.access_token)?;
//! ```

use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::config::MIN_SECRET_LEN;
use crate::error::AuthError;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during JWT operations.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to encode a token.
    #[error("Failed to encode token: {message}")]
    EncodingError {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode a token.
    #[error("Failed to decode token: {message}")]
    DecodingError {
        /// Description of the decoding error.
        message: String,
    },

    /// The token has expired.
    #[error("Token expired")]
    Expired,

    /// The signature did not verify.
    #[error("Invalid signature")]
    InvalidSignature,

    /// A registered claim failed validation.
    #[error("Invalid claims: {message}")]
    InvalidClaims {
        /// Description of the claim failure.
        message: String,
    },

    /// The key material is unusable.
    #[error("Invalid key: {message}")]
    InvalidKey {
        /// Description of the key problem.
        message: String,
    },
}

impl JwtError {
    /// Creates an `EncodingError`.
    #[must_use]
    pub fn encoding_error(message: impl Into<String>) -> Self {
        Self::EncodingError {
            message: message.into(),
        }
    }

    /// Creates a `DecodingError`.
    #[must_use]
    pub fn decoding_error(message: impl Into<String>) -> Self {
        Self::DecodingError {
            message: message.into(),
        }
    }

    /// Creates an `InvalidClaims` error.
    #[must_use]
    pub fn invalid_claims(message: impl Into<String>) -> Self {
        Self::InvalidClaims {
            message: message.into(),
        }
    }

    /// Creates an `InvalidKey` error.
    #[must_use]
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }

    /// Returns `true` if the token itself failed validation.
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Self::Expired | Self::InvalidSignature | Self::InvalidClaims { .. }
        )
    }
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::InvalidAudience
            | ErrorKind::InvalidIssuer
            | ErrorKind::InvalidSubject
            | ErrorKind::ImmatureSignature
            | ErrorKind::MissingRequiredClaim(_) => Self::invalid_claims(err.to_string()),
            ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidKeyFormat => {
                Self::invalid_key(err.to_string())
            }
            _ => Self::decoding_error(err.to_string()),
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::TokenExpired,
            JwtError::EncodingError { message } => AuthError::internal(message),
            other => AuthError::invalid_token(other.to_string()),
        }
    }
}

// ============================================================================
// Claims
// ============================================================================

/// The `aud` claim: a single string or an array of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    /// A single audience.
    Single(String),
    /// Several audiences.
    Many(Vec<String>),
}

impl Audience {
    /// Returns `true` if `expected` is one of the audiences.
    #[must_use]
    pub fn contains(&self, expected: &str) -> bool {
        match self {
            Self::Single(aud) => aud == expected,
            Self::Many(auds) => auds.iter().any(|aud| aud == expected),
        }
    }
}

/// Bearer token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject.
    #[serde(default)]
    pub sub: String,

    /// Email of the subject.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Audience.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,

    /// Issuer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Issued at (unix seconds).
    #[serde(default)]
    pub iat: i64,

    /// Expiration (unix seconds).
    pub exp: i64,
}

/// A freshly signed access token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Compact JWS.
    pub access_token: String,
    /// Lifetime in seconds.
    pub expires_in: u64,
    /// Claims that were signed.
    pub claims: TokenClaims,
}

// ============================================================================
// Token Issuer
// ============================================================================

/// Signs and verifies HS256 access tokens.
///
/// This type is `Send + Sync` and is shared behind an `Arc`.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    key_id: String,
    issuer: String,
    lifetime: Duration,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("key_id", &self.key_id)
            .field("issuer", &self.issuer)
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Creates an issuer from the shared secret.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::InvalidKey` if the secret is shorter than 32 bytes.
    pub fn new(
        secret: &[u8],
        key_id: impl Into<String>,
        issuer: impl Into<String>,
        lifetime: Duration,
    ) -> Result<Self, JwtError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(JwtError::invalid_key(format!(
                "signing secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            key_id: key_id.into(),
            issuer: issuer.into(),
            lifetime,
        })
    }

    /// Signs a token for `subject`.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::EncodingError` if signing fails.
    pub fn issue(
        &self,
        subject: &str,
        email: Option<&str>,
        audience: Option<&str>,
    ) -> Result<IssuedToken, JwtError> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let expires_in = self.lifetime.as_secs();
        let claims = TokenClaims {
            sub: subject.to_string(),
            email: email.filter(|e| !e.is_empty()).map(str::to_string),
            aud: audience.map(|aud| Audience::Single(aud.to_string())),
            iss: Some(self.issuer.clone()),
            iat: now,
            exp: now.saturating_add(i64::try_from(expires_in).unwrap_or(i64::MAX)),
        };

        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(self.key_id.clone());

        let access_token = encode(&header, &claims, &self.encoding_key)
            .map_err(|e| JwtError::encoding_error(e.to_string()))?;

        Ok(IssuedToken {
            access_token,
            expires_in,
            claims,
        })
    }

    /// Verifies an HS256 token and returns its claims.
    ///
    /// Checks the signature and `exp`. `iss` is checked when the token carries
    /// one. Audience is not checked here.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is malformed, not HS256, badly signed,
    /// expired, or issued by someone else.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_aud = false;

        let claims = decode::<TokenClaims>(token, &self.decoding_key, &validation)?.claims;

        if let Some(iss) = claims.iss.as_deref()
            && iss != self.issuer
        {
            return Err(JwtError::invalid_claims("unexpected issuer"));
        }

        Ok(claims)
    }

    /// Returns the key id placed in token headers.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Returns the issuer URL.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Returns the access token lifetime.
    #[must_use]
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }
}
