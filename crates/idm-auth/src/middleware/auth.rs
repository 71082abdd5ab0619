//! Bearer token authentication extractor and layer.
//!
//! # Example
//!
//! ```ignore
//! use axum::{Extension, Router, middleware, routing::get};
//! use idm_auth::middleware::{AuthenticatedPrincipal, VerifierState, require_bearer};
//!
//! async fn me(Extension(principal): Extension<AuthenticatedPrincipal>) -> String {
//!     format!("Hello, {}!", principal.subject)
//! }
//!
//! let protected = Router::new()
//!     .route("/api/v1/me", get(me))
//!     .layer(middleware::from_fn_with_state(verifier_state, require_bearer));
//! ```

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::error::AuthError;

use super::types::AuthenticatedPrincipal;
use super::verifier::BearerVerifier;

// =============================================================================
// Verifier State
// =============================================================================

/// State required for bearer token authentication.
///
/// Include it in your application state and expose it via `FromRef`:
///
/// ```ignore
/// impl FromRef<AppState> for VerifierState {
///     fn from_ref(state: &AppState) -> Self {
///         state.verifier.clone()
///     }
/// }
/// ```
#[derive(Clone)]
pub struct VerifierState {
    /// Shared verifier.
    pub verifier: Arc<BearerVerifier>,
}

impl VerifierState {
    /// Creates a new verifier state.
    #[must_use]
    pub fn new(verifier: Arc<BearerVerifier>) -> Self {
        Self { verifier }
    }
}

// =============================================================================
// Bearer Auth Extractor
// =============================================================================

/// Axum extractor that requires a valid bearer token.
///
/// Reuses the principal already attached by [`require_bearer`] when the
/// route sits behind that layer.
///
/// # Errors
///
/// Rejects with `AuthError` (which implements `IntoResponse`) if the header
/// is missing or malformed, or the token fails verification.
pub struct BearerAuth(pub AuthenticatedPrincipal);

impl<S> FromRequestParts<S> for BearerAuth
where
    S: Send + Sync,
    VerifierState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(principal) = parts.extensions.get::<AuthenticatedPrincipal>() {
            return Ok(BearerAuth(principal.clone()));
        }

        let verifier_state = VerifierState::from_ref(state);
        let principal = verifier_state.verifier.authenticate(&parts.headers).await?;

        tracing::debug!(subject = %principal.subject, "bearer token validated");
        Ok(BearerAuth(principal))
    }
}

// =============================================================================
// Optional Bearer Auth Extractor
// =============================================================================

/// Axum extractor that validates a bearer token if one is present.
///
/// Yields `None` when no `Authorization` header is sent. A header that is
/// present but invalid is still rejected.
pub struct OptionalBearerAuth(pub Option<AuthenticatedPrincipal>);

impl<S> FromRequestParts<S> for OptionalBearerAuth
where
    S: Send + Sync,
    VerifierState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(AUTHORIZATION) {
            return Ok(OptionalBearerAuth(None));
        }

        let BearerAuth(principal) = BearerAuth::from_request_parts(parts, state).await?;
        Ok(OptionalBearerAuth(Some(principal)))
    }
}

// =============================================================================
// Layer
// =============================================================================

/// Middleware that rejects requests without a valid bearer token.
///
/// On success the [`AuthenticatedPrincipal`] is inserted into the request
/// extensions before the inner service runs. Use with
/// `axum::middleware::from_fn_with_state`.
///
/// # Errors
///
/// Returns the verification `AuthError`; the inner service is not called.
pub async fn require_bearer(
    State(state): State<VerifierState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let principal = state.verifier.authenticate(request.headers()).await?;

    tracing::debug!(subject = %principal.subject, "bearer token validated");
    request.extensions_mut().insert(principal);

    Ok(next.run(request).await)
}
