//! Authorization endpoint handlers.
//!
//! `GET /api/v1/auth/pkce/authorize` takes query parameters and
//! `POST /api/v1/auth/pkce/authorize` takes the same fields as a JSON body.
//!
//! The response depends on who is asking. Browsers are redirected (`302`)
//! to the client's redirect URI, or to the login page when no user is
//! logged in. API clients get the same information as JSON.
//!
//! # Example
//!
//! ```ignore
//! GET /api/v1/auth/pkce/authorize?client_id=demo-client
//!     &redirect_uri=https://app.example/callback
//!     &code_challenge=E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM
//!     &code_challenge_method=S256
//! Accept: application/json
//! Cookie: session_user=<signed alice@example.com>
//!
//! HTTP/1.1 200 OK
//! {"authorization_url": "https://app.example/callback?code=..&state=..", "code": "..", "state": ".."}
//! ```

use axum::{
    Json,
    body::to_bytes,
    extract::{OriginalUri, Query, Request, State},
    http::{HeaderMap, Method, StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::AuthError;
use crate::oauth::{AuthorizationGrant, AuthorizationRequest, AuthorizationResponse};

use super::OAuthState;

/// Largest accepted JSON body for `POST /authorize`.
const MAX_BODY_SIZE: usize = 64 * 1024;

/// User-Agent fragments that mark a request as coming from a browser.
const BROWSER_AGENTS: [&str; 5] = ["Mozilla", "Chrome", "Safari", "Firefox", "Edge"];

/// Handler for `GET /api/v1/auth/pkce/authorize`.
///
/// # Errors
///
/// Validation failures are returned as `400` OAuth errors.
pub async fn authorize_get_handler(
    State(state): State<OAuthState>,
    request: Request,
) -> Result<Response, AuthError> {
    let (parts, _body) = request.into_parts();

    let Query(params) = Query::<AuthorizationRequest>::try_from_uri(&parts.uri).map_err(|e| {
        tracing::debug!(error = %e, "rejected authorize query");
        AuthError::invalid_request("malformed query string")
    })?;

    authorize(&state, &parts, params).await
}

/// Handler for `POST /api/v1/auth/pkce/authorize`.
///
/// # Errors
///
/// Malformed bodies and validation failures are returned as `400` OAuth
/// errors.
pub async fn authorize_post_handler(
    State(state): State<OAuthState>,
    request: Request,
) -> Result<Response, AuthError> {
    let (parts, body) = request.into_parts();

    let bytes = to_bytes(body, MAX_BODY_SIZE).await.map_err(|e| {
        tracing::debug!(error = %e, "failed to read authorize body");
        AuthError::invalid_request("request body too large or unreadable")
    })?;
    let Json(params) = Json::<AuthorizationRequest>::from_bytes(&bytes).map_err(|e| {
        tracing::debug!(error = %e, "rejected authorize body");
        AuthError::invalid_request("malformed JSON body")
    })?;

    authorize(&state, &parts, params).await
}

async fn authorize(
    state: &OAuthState,
    parts: &Parts,
    params: AuthorizationRequest,
) -> Result<Response, AuthError> {
    let principal = state.resolver.resolve(parts).await?;
    let browser = is_browser(&parts.headers);

    match state.service.initiate(&params, principal.as_ref()).await {
        Ok(grant) => grant_response(&grant, browser),
        Err(AuthError::AuthenticationRequired) => {
            let login_url = login_url(&state.login_path, &replay_uri(parts, &params));
            tracing::debug!(client_id = %params.client_id, browser, "login required");
            Ok(login_required(login_url, browser))
        }
        Err(e) => Err(e),
    }
}

fn grant_response(grant: &AuthorizationGrant, browser: bool) -> Result<Response, AuthError> {
    let response = AuthorizationResponse::from_grant(grant).map_err(|e| {
        tracing::warn!(error = %e, "registered redirect_uri is not an absolute URL");
        AuthError::invalid_request("redirect_uri must be an absolute URL")
    })?;

    if browser {
        Ok(found(response.authorization_url))
    } else {
        Ok(Json(response).into_response())
    }
}

fn login_required(login_url: String, browser: bool) -> Response {
    if browser {
        return found(login_url);
    }

    (
        StatusCode::UNAUTHORIZED,
        [(header::CACHE_CONTROL, "no-store")],
        Json(json!({
            "error": AuthError::AuthenticationRequired.oauth_error_code(),
            "error_description": AuthError::AuthenticationRequired.public_description(),
            "login_url": login_url,
        })),
    )
        .into_response()
}

/// `302 Found` with `Location`.
fn found(location: String) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

/// Returns true when the request looks like it comes from a browser.
///
/// A request is a browser request when `Accept` mentions `text/html`, when
/// the `User-Agent` names a common browser engine, or when `Accept` is
/// missing altogether.
#[must_use]
pub fn is_browser(headers: &HeaderMap) -> bool {
    let accept = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    accept.trim().is_empty()
        || accept.contains("text/html")
        || BROWSER_AGENTS.iter().any(|agent| user_agent.contains(agent))
}

/// Builds `{login_path}?redirect=<original>` with the original URI encoded.
#[must_use]
pub fn login_url(login_path: &str, original: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(original.as_bytes()).collect();
    let separator = if login_path.contains('?') { '&' } else { '?' };
    format!("{login_path}{separator}redirect={encoded}")
}

/// URI the user agent returns to after login.
///
/// A POST body does not survive the login redirect, so POST requests are
/// replayed as the equivalent GET query.
fn replay_uri(parts: &Parts, params: &AuthorizationRequest) -> String {
    let uri = parts
        .extensions
        .get::<OriginalUri>()
        .map_or(&parts.uri, |uri| &uri.0);

    if parts.method == Method::POST {
        format!("{}?{}", uri.path(), params.to_query_string())
    } else {
        uri.to_string()
    }
}
