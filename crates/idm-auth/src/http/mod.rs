//! HTTP handlers for the PKCE endpoints.
//!
//! # Available Handlers
//!
//! - [`authorize_get_handler`] / [`authorize_post_handler`] - initiate the flow
//! - [`token_handler`] - exchange a code for an access token
//! - [`refresh_handler`] - refresh stub, always 501
//! - [`pkce_config_handler`] / [`openid_configuration_handler`] - discovery
//! - [`jwks_handler`] - published key set
//!
//! [`router`] mounts all of them on their standard paths.

pub mod authorize;
pub mod discovery;
pub mod jwks;
pub mod refresh;
pub mod token;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::config::AuthConfig;
use crate::oauth::AuthorizationService;
use crate::session::PrincipalResolver;

pub use authorize::{authorize_get_handler, authorize_post_handler};
pub use discovery::{OpenIdConfiguration, openid_configuration_handler, pkce_config_handler};
pub use jwks::jwks_handler;
pub use refresh::refresh_handler;
pub use token::token_handler;

/// Base path of the PKCE endpoints.
pub const PKCE_BASE_PATH: &str = "/api/v1/auth/pkce";

/// State shared by the PKCE handlers.
#[derive(Clone)]
pub struct OAuthState {
    /// Flow controller.
    pub service: Arc<AuthorizationService>,

    /// Resolves the logged-in user at the authorize endpoint.
    pub resolver: Arc<dyn PrincipalResolver>,

    /// Where unauthenticated browsers are sent.
    pub login_path: String,

    /// Issuer advertised by the discovery documents.
    pub issuer: String,

    /// Scopes advertised by the PKCE configuration document.
    pub supported_scopes: Vec<String>,
}

impl OAuthState {
    /// Creates the handler state from the service, the resolver and config.
    #[must_use]
    pub fn new(
        service: Arc<AuthorizationService>,
        resolver: Arc<dyn PrincipalResolver>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            service,
            resolver,
            login_path: config.login_path.clone(),
            issuer: config.issuer.trim_end_matches('/').to_string(),
            supported_scopes: config.oauth.supported_scopes.clone(),
        }
    }

    /// Key id of the local signing key.
    #[must_use]
    pub fn key_id(&self) -> &str {
        self.service.token_issuer().key_id()
    }
}

/// Builds the router for the PKCE endpoints and the discovery document.
pub fn router(state: OAuthState) -> Router {
    Router::new()
        .route(
            "/api/v1/auth/pkce/authorize",
            get(authorize_get_handler).post(authorize_post_handler),
        )
        .route("/api/v1/auth/pkce/token", post(token_handler))
        .route("/api/v1/auth/pkce/refresh", post(refresh_handler))
        .route("/api/v1/auth/pkce/config", get(pkce_config_handler))
        .route("/api/v1/auth/pkce/jwks", get(jwks_handler))
        .route(
            "/.well-known/openid-configuration",
            get(openid_configuration_handler),
        )
        .with_state(state)
}
