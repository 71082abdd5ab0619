//! Published key set handler.
//!
//! Local tokens are signed with a shared HMAC secret, so the published set
//! names the key and algorithm without exposing key material.

use axum::{
    Json,
    extract::State,
    http::header,
    response::IntoResponse,
};
use serde_json::json;

use super::OAuthState;

/// Handler for `GET /api/v1/auth/pkce/jwks`.
///
/// # Example Response
///
/// ```json
/// {"keys": [{"kty": "oct", "kid": "default", "alg": "HS256", "use": "sig"}]}
/// ```
pub async fn jwks_handler(State(state): State<OAuthState>) -> impl IntoResponse {
    let jwks = json!({
        "keys": [{
            "kty": "oct",
            "kid": state.key_id(),
            "alg": "HS256",
            "use": "sig",
        }]
    });

    (
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        Json(jwks),
    )
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::http::router;
    use crate::test_support::oauth_state;

    #[tokio::test]
    async fn test_jwks_has_no_key_material() {
        let request = Request::builder()
            .uri("/api/v1/auth/pkce/jwks")
            .body(Body::empty())
            .unwrap();
        let response = router(oauth_state()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CACHE_CONTROL],
            "public, max-age=3600"
        );

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let key = &json["keys"][0];
        assert_eq!(key["kty"], "oct");
        assert_eq!(key["kid"], "default");
        assert_eq!(key["alg"], "HS256");
        assert!(key.get("k").is_none());
    }
}
