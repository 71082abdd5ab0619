//! Token endpoint handler.
//!
//! # Example
//!
//! ```ignore
//! POST /api/v1/auth/pkce/token
//! Content-Type: application/x-www-form-urlencoded
//!
//! grant_type=authorization_code
//! &code=0000018f...
//! &redirect_uri=https://app.example/callback
//! &client_id=demo-client
//! &code_verifier=dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk
//! ```

use axum::{
    Json,
    extract::State,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::error::AuthError;
use crate::extractors::FormOrJson;
use crate::oauth::{TokenRequest, TokenResponse};

use super::OAuthState;

/// Handler for `POST /api/v1/auth/pkce/token`.
///
/// Accepts `application/x-www-form-urlencoded` or JSON. Every response,
/// success or error, carries `Cache-Control: no-store` and
/// `Pragma: no-cache`.
pub async fn token_handler(
    State(state): State<OAuthState>,
    request: Result<FormOrJson<TokenRequest>, AuthError>,
) -> Response {
    let result = match request {
        Ok(FormOrJson(request)) => state.service.exchange(&request).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(response) => token_success_response(response),
        Err(e) => no_cache(e.into_response()),
    }
}

/// Builds a successful token response.
pub(crate) fn token_success_response(response: TokenResponse) -> Response {
    (
        StatusCode::OK,
        [
            (header::CACHE_CONTROL, "no-store"),
            (header::PRAGMA, "no-cache"),
        ],
        Json(response),
    )
        .into_response()
}

/// Adds the token endpoint cache headers to an error response.
pub(crate) fn no_cache(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    response
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::Request,
    };
    use tower::ServiceExt;

    use super::*;
    use crate::http::router;
    use crate::oauth::AuthorizationRequest;
    use crate::oauth::pkce::derive_challenge;
    use crate::test_support::{TEST_CLIENT, TEST_EMAIL, TEST_REDIRECT, oauth_state};
    use crate::types::Principal;

    const VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";

    async fn issue_code(state: &OAuthState) -> String {
        let request = AuthorizationRequest {
            client_id: TEST_CLIENT.to_string(),
            redirect_uri: TEST_REDIRECT.to_string(),
            state: Some("xyz".to_string()),
            code_challenge: derive_challenge(VERIFIER),
            code_challenge_method: "S256".to_string(),
            ..AuthorizationRequest::default()
        };
        state
            .service
            .initiate(&request, Some(&Principal::new("user-1", TEST_EMAIL)))
            .await
            .unwrap()
            .code
    }

    fn form(code: &str, verifier: &str) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "authorization_code")
            .append_pair("code", code)
            .append_pair("redirect_uri", TEST_REDIRECT)
            .append_pair("client_id", TEST_CLIENT)
            .append_pair("code_verifier", verifier)
            .finish()
    }

    async fn post(app: Router, content_type: &str, body: String) -> (Response, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/auth/pkce/token")
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let (parts, body) = response.into_parts();
        let bytes = to_bytes(body, usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap();
        (Response::from_parts(parts, Body::empty()), json)
    }

    fn assert_no_cache(response: &Response) {
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
        assert_eq!(response.headers()[header::PRAGMA], "no-cache");
    }

    #[tokio::test]
    async fn test_form_exchange() {
        let state = oauth_state();
        let code = issue_code(&state).await;

        let (response, json) = post(
            router(state.clone()),
            "application/x-www-form-urlencoded",
            form(&code, VERIFIER),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_no_cache(&response);
        assert_eq!(json["token_type"], "Bearer");
        assert_eq!(json["expires_in"], 3600);
        assert_eq!(json["scope"], "openid profile email");

        let claims = state
            .service
            .token_issuer()
            .verify(json["access_token"].as_str().unwrap())
            .unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.email.as_deref(), Some(TEST_EMAIL));
    }

    #[tokio::test]
    async fn test_json_exchange_and_replay() {
        let state = oauth_state();
        let code = issue_code(&state).await;
        let body = serde_json::json!({
            "grant_type": "authorization_code",
            "code": code,
            "redirect_uri": TEST_REDIRECT,
            "client_id": TEST_CLIENT,
            "code_verifier": VERIFIER,
            "state": "xyz",
        })
        .to_string();

        let (response, _) = post(router(state.clone()), "application/json", body.clone()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let (response, json) = post(router(state), "application/json", body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_no_cache(&response);
        assert_eq!(json["error"], "invalid_grant");
        assert_eq!(json["error_description"], "invalid or expired authorization code");
    }

    #[tokio::test]
    async fn test_wrong_verifier() {
        let state = oauth_state();
        let code = issue_code(&state).await;

        let (response, json) = post(
            router(state),
            "application/x-www-form-urlencoded",
            form(&code, &"a".repeat(43)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "invalid_grant");
        assert_eq!(json["error_description"], "invalid code_verifier");
    }

    #[tokio::test]
    async fn test_unsupported_grant_type() {
        let (response, json) = post(
            router(oauth_state()),
            "application/x-www-form-urlencoded",
            "grant_type=password".to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "unsupported_grant_type");
    }

    #[tokio::test]
    async fn test_malformed_body_has_cache_headers() {
        let (response, json) =
            post(router(oauth_state()), "application/json", "{".to_string()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_no_cache(&response);
        assert_eq!(json["error"], "invalid_request");
    }
}
