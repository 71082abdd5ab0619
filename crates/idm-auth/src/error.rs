//! Authentication and authorization error types.
//!
//! This module defines the errors surfaced by the PKCE issuer and the bearer
//! token verifier. Module-level errors (`PkceError`, `CodeError`, `JwtError`,
//! `JwksError`) convert into [`AuthError`] at the service boundary.

use std::fmt;

use axum::http::StatusCode;

/// Errors that can occur during authentication and authorization operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The authorization request is invalid or malformed.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of why the request is invalid.
        message: String,
    },

    /// The authorization code is invalid, expired, already used, or does not
    /// match the presented verifier or state.
    #[error("Invalid grant: {message}")]
    InvalidGrant {
        /// Description of why the grant is invalid.
        message: String,
    },

    /// The access token is invalid, malformed, or cannot be verified.
    #[error("Invalid token: {message}")]
    InvalidToken {
        /// Description of why the token is invalid.
        message: String,
    },

    /// The request lacks bearer credentials.
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Description of why the request is unauthorized.
        message: String,
    },

    /// The access token has expired.
    #[error("Token expired")]
    TokenExpired,

    /// No authenticated principal is attached to the authorization request.
    #[error("Authentication required")]
    AuthenticationRequired,

    /// The token endpoint does not support the requested grant type.
    #[error("Unsupported grant type: {grant_type}")]
    UnsupportedGrantType {
        /// The unsupported grant type.
        grant_type: String,
    },

    /// The operation exists but is intentionally not implemented.
    #[error("Not implemented: {feature}")]
    NotImplemented {
        /// The unimplemented feature.
        feature: String,
    },

    /// The remote key set could not be obtained.
    #[error("Remote key set error: {message}")]
    RemoteKey {
        /// Description of the fetch failure.
        message: String,
    },

    /// An error occurred while storing or retrieving auth data.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// The auth configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidGrant` error.
    #[must_use]
    pub fn invalid_grant(message: impl Into<String>) -> Self {
        Self::InvalidGrant {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidToken` error.
    #[must_use]
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    /// Creates a new `Unauthorized` error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Creates a new `UnsupportedGrantType` error.
    #[must_use]
    pub fn unsupported_grant_type(grant_type: impl Into<String>) -> Self {
        Self::UnsupportedGrantType {
            grant_type: grant_type.into(),
        }
    }

    /// Creates a new `NotImplemented` error.
    #[must_use]
    pub fn not_implemented(feature: impl Into<String>) -> Self {
        Self::NotImplemented {
            feature: feature.into(),
        }
    }

    /// Creates a new `RemoteKey` error.
    #[must_use]
    pub fn remote_key(message: impl Into<String>) -> Self {
        Self::RemoteKey {
            message: message.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a client error (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequest { .. }
                | Self::InvalidGrant { .. }
                | Self::InvalidToken { .. }
                | Self::Unauthorized { .. }
                | Self::TokenExpired
                | Self::AuthenticationRequired
                | Self::UnsupportedGrantType { .. }
        )
    }

    /// Returns `true` if this is a server error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::NotImplemented { .. }
                | Self::RemoteKey { .. }
                | Self::Storage { .. }
                | Self::Configuration { .. }
                | Self::Internal { .. }
        )
    }

    /// Returns `true` if this is a token-related error.
    #[must_use]
    pub fn is_token_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidToken { .. } | Self::TokenExpired | Self::Unauthorized { .. }
        )
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidRequest { .. } => ErrorCategory::Validation,
            Self::InvalidGrant { .. } => ErrorCategory::Grant,
            Self::InvalidToken { .. } => ErrorCategory::Token,
            Self::Unauthorized { .. } => ErrorCategory::Token,
            Self::TokenExpired => ErrorCategory::Token,
            Self::AuthenticationRequired => ErrorCategory::Authentication,
            Self::UnsupportedGrantType { .. } => ErrorCategory::Validation,
            Self::NotImplemented { .. } => ErrorCategory::Internal,
            Self::RemoteKey { .. } => ErrorCategory::Federation,
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the OAuth 2.0 error code for this error.
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "invalid_request",
            Self::InvalidGrant { .. } => "invalid_grant",
            Self::InvalidToken { .. } => "invalid_token",
            Self::Unauthorized { .. } => "unauthorized",
            Self::TokenExpired => "invalid_token",
            Self::AuthenticationRequired => "authentication_required",
            Self::UnsupportedGrantType { .. } => "unsupported_grant_type",
            Self::NotImplemented { .. } => "not_implemented",
            Self::RemoteKey { .. } => "temporarily_unavailable",
            Self::Storage { .. } => "server_error",
            Self::Configuration { .. } => "server_error",
            Self::Internal { .. } => "server_error",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest { .. }
            | Self::InvalidGrant { .. }
            | Self::UnsupportedGrantType { .. } => StatusCode::BAD_REQUEST,
            Self::InvalidToken { .. }
            | Self::Unauthorized { .. }
            | Self::TokenExpired
            | Self::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            Self::NotImplemented { .. } => StatusCode::NOT_IMPLEMENTED,
            Self::RemoteKey { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Storage { .. } | Self::Configuration { .. } | Self::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the description that is safe to send to the remote party.
    ///
    /// Token failures collapse to a single message and server-side failures
    /// never leak their cause.
    #[must_use]
    pub fn public_description(&self) -> String {
        match self {
            Self::InvalidRequest { message }
            | Self::InvalidGrant { message }
            | Self::Unauthorized { message } => message.clone(),
            Self::InvalidToken { .. } | Self::TokenExpired => "Invalid token".to_string(),
            Self::AuthenticationRequired => "User authentication required".to_string(),
            Self::UnsupportedGrantType { grant_type } => {
                format!("grant_type must be 'authorization_code', got '{grant_type}'")
            }
            Self::NotImplemented { feature } => {
                let mut chars = feature.chars();
                match chars.next() {
                    Some(first) => format!(
                        "{}{} not implemented yet",
                        first.to_uppercase(),
                        chars.as_str()
                    ),
                    None => "Not implemented yet".to_string(),
                }
            }
            Self::RemoteKey { .. } => "Unable to verify token at this time".to_string(),
            Self::Storage { .. } | Self::Configuration { .. } | Self::Internal { .. } => {
                "Internal server error".to_string()
            }
        }
    }
}

/// Categories of authentication/authorization errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Missing or unknown principal.
    Authentication,
    /// Authorization code failures.
    Grant,
    /// Bearer token failures.
    Token,
    /// Request validation errors.
    Validation,
    /// Remote identity provider key set errors.
    Federation,
    /// Infrastructure/storage errors.
    Infrastructure,
    /// Configuration errors.
    Configuration,
    /// Internal server errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::Grant => write!(f, "grant"),
            Self::Token => write!(f, "token"),
            Self::Validation => write!(f, "validation"),
            Self::Federation => write!(f, "federation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
