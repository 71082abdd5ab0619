//! # idm-auth
//!
//! OAuth 2.0 authorization code + PKCE issuer and bearer token verification
//! for the IDM service.
//!
//! This crate provides:
//! - One-time authorization codes bound to a client, redirect URI and
//!   PKCE challenge
//! - HS256 access tokens signed with a configured secret
//! - Bearer token middleware accepting local HS256 tokens and RS256 tokens
//!   from a remote identity provider
//!
//! ## Modules
//!
//! - [`config`] - Authentication configuration
//! - [`oauth`] - PKCE codec, authorization codes and the flow controller
//! - [`token`] - Token issuing and HS256 verification
//! - [`federation`] - Remote identity provider key set cache
//! - [`middleware`] - Bearer token layer and extractors
//! - [`session`] - Principal resolution for the authorize endpoint
//! - [`storage`] - Storage traits with in-memory implementations
//! - [`http`] - Axum HTTP handlers for the PKCE endpoints

pub mod config;
pub mod error;
pub mod extractors;
pub mod federation;
pub mod http;
pub mod middleware;
pub mod oauth;
pub mod session;
pub mod storage;
pub mod token;
pub mod types;

#[cfg(test)]
mod test_support;

pub use config::{AuthConfig, ConfigError};
pub use error::{AuthError, ErrorCategory};
pub use federation::{RemoteJwksCache, RemoteJwksCacheConfig};
pub use http::{OAuthState, router};
pub use middleware::{
    AuthenticatedPrincipal, BearerAuth, BearerVerifier, OptionalBearerAuth, VerifierState,
    require_bearer,
};
pub use oauth::{AuthorizationConfig, AuthorizationService};
pub use session::{PrincipalResolver, SessionCookieResolver};
pub use storage::{
    AuthorizationCodeStorage, ClientStorage, InMemoryAuthorizationCodeStorage,
    InMemoryClientStorage, InMemoryUserDirectory, UserDirectory,
};
pub use token::{TokenClaims, TokenIssuer};
pub use types::{Client, ClientValidationError, Principal};

/// Type alias for authentication/authorization results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use idm_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::config::{AuthConfig, ConfigError};
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::http::{OAuthState, router};
    pub use crate::middleware::{
        AuthenticatedPrincipal, BearerAuth, BearerVerifier, OptionalBearerAuth, VerifierState,
        require_bearer,
    };
    pub use crate::oauth::{
        AuthorizationConfig, AuthorizationRequest, AuthorizationService, TokenRequest,
        TokenResponse,
    };
    pub use crate::session::{PrincipalResolver, SessionCookieResolver};
    pub use crate::storage::{AuthorizationCodeStorage, ClientStorage, UserDirectory};
    pub use crate::token::{TokenClaims, TokenIssuer};
    pub use crate::types::{Client, Principal};
}
