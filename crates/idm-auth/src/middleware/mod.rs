//! HTTP middleware for bearer token authentication.
//!
//! This module provides:
//!
//! - [`BearerVerifier`] - algorithm-dispatched token verification
//! - [`require_bearer`] - a layer that attaches [`AuthenticatedPrincipal`]
//!   to request extensions
//! - [`BearerAuth`] / [`OptionalBearerAuth`] - extractors
//! - OAuth 2.0 JSON error responses for [`crate::AuthError`]
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, middleware, routing::get};
//! use idm_auth::middleware::{BearerVerifier, VerifierState, require_bearer};
//!
//! let state = VerifierState::new(Arc::new(BearerVerifier::new(token_issuer)));
//!
//! let app = Router::new()
//!     .route("/api/v1/me", get(me))
//!     .layer(middleware::from_fn_with_state(state, require_bearer));
//! ```

pub mod auth;
pub mod error;
pub mod types;
pub mod verifier;

pub use auth::{BearerAuth, OptionalBearerAuth, VerifierState, require_bearer};
pub use error::oauth_error_json;
pub use types::AuthenticatedPrincipal;
pub use verifier::{BearerVerifier, TEST_TOKEN, extract_bearer};
