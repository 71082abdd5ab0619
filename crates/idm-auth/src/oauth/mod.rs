//! OAuth 2.0 authorization code flow with PKCE.
//!
//! - [`pkce`] - challenge/verifier codec (RFC 7636)
//! - [`code`] - authorization code records
//! - [`authorize`] / [`token`] - endpoint request and response types
//! - [`service`] - the flow controller tying them together

pub mod authorize;
pub mod code;
pub mod pkce;
pub mod service;
pub mod token;

pub use authorize::{AuthorizationGrant, AuthorizationRequest, AuthorizationResponse};
pub use code::{AuthorizationCode, CodeError, NewAuthorizationCode};
pub use pkce::{
    PkceChallenge, PkceChallengeMethod, PkceError, PkceVerifier, derive_challenge, new_state,
    new_verifier,
};
pub use service::{AuthorizationConfig, AuthorizationService};
pub use token::{RefreshRequest, TokenRequest, TokenResponse};
