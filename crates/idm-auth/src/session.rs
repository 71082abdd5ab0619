//! Principal resolution for authorization requests.
//!
//! The login step lives outside this crate. It leaves behind some session
//! artifact, and a [`PrincipalResolver`] turns that artifact into a verified
//! [`Principal`] when the user agent reaches the authorize endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Cookie, Key, SignedCookieJar};

use crate::AuthResult;
use crate::config::MIN_SECRET_LEN;
use crate::error::AuthError;
use crate::storage::UserDirectory;
use crate::types::Principal;

/// Cookie carrying the email of the logged-in user.
pub const SESSION_COOKIE: &str = "session_user";

/// Resolves the authenticated principal of an incoming request.
#[async_trait]
pub trait PrincipalResolver: Send + Sync {
    /// Returns the principal, or `None` if the request is unauthenticated.
    ///
    /// # Errors
    ///
    /// Returns an error only if the backing lookup fails.
    async fn resolve(&self, parts: &Parts) -> AuthResult<Option<Principal>>;
}

/// Resolves principals from the signed `session_user` cookie.
///
/// The cookie value is the user's email, signed with a key derived from
/// the configured secret. Unsigned or tampered cookies are ignored, so the
/// request is treated as unauthenticated.
pub struct SessionCookieResolver {
    users: Arc<dyn UserDirectory>,
    key: Key,
}

impl SessionCookieResolver {
    /// Creates a resolver backed by `users`, verifying cookies signed with
    /// a key derived from `secret`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if `secret` is shorter than 32 bytes.
    pub fn new(users: Arc<dyn UserDirectory>, secret: &[u8]) -> AuthResult<Self> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(AuthError::configuration(format!(
                "session secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }

        Ok(Self {
            users,
            key: Key::derive_from(secret),
        })
    }

    /// Returns a jar that signs cookies with the session key.
    ///
    /// The login step adds the session cookie to it and returns the jar as
    /// part of its response.
    #[must_use]
    pub fn cookie_jar(&self) -> SignedCookieJar {
        SignedCookieJar::new(self.key.clone())
    }

    /// Returns the signed `session_user=<value>` pair for `email`, suitable
    /// for a `Cookie` request header.
    #[must_use]
    pub fn session_cookie(&self, email: &str) -> String {
        let mut jar = cookie::CookieJar::new();
        jar.signed_mut(&self.key)
            .add(Cookie::new(SESSION_COOKIE, email.to_string()));

        jar.get(SESSION_COOKIE)
            .map(|cookie| format!("{SESSION_COOKIE}={}", cookie.value()))
            .unwrap_or_default()
    }
}

#[async_trait]
impl PrincipalResolver for SessionCookieResolver {
    async fn resolve(&self, parts: &Parts) -> AuthResult<Option<Principal>> {
        let jar = SignedCookieJar::from_headers(&parts.headers, self.key.clone());
        let Some(email) = jar
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().trim().to_string())
        else {
            if parts
                .headers
                .get_all(axum::http::header::COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .any(|v| v.contains(SESSION_COOKIE))
            {
                tracing::debug!("session cookie failed signature check");
            }
            return Ok(None);
        };

        if email.is_empty() {
            return Ok(None);
        }

        let principal = self.users.find_by_email(&email).await?;
        if principal.is_none() {
            tracing::debug!("session cookie names an unknown user");
        }
        Ok(principal)
    }
}
