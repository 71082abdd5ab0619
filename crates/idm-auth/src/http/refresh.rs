//! Refresh endpoint handler.
//!
//! Refresh tokens are not issued, so a well-formed refresh request is
//! answered with `501 Not Implemented`.

use axum::{
    extract::State,
    response::{IntoResponse, Response},
};

use crate::error::AuthError;
use crate::extractors::FormOrJson;
use crate::oauth::RefreshRequest;

use super::OAuthState;
use super::token::{no_cache, token_success_response};

/// Handler for `POST /api/v1/auth/pkce/refresh`.
pub async fn refresh_handler(
    State(state): State<OAuthState>,
    request: Result<FormOrJson<RefreshRequest>, AuthError>,
) -> Response {
    let result = match request {
        Ok(FormOrJson(request)) => state.service.refresh(&request).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(response) => token_success_response(response),
        Err(e) => no_cache(e.into_response()),
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use tower::ServiceExt;

    use crate::http::router;
    use crate::test_support::oauth_state;

    async fn post(body: &'static str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/auth/pkce/refresh")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap();
        let response = router(oauth_state()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_refresh_not_implemented() {
        let (status, json) =
            post(r#"{"refresh_token":"r-1","client_id":"demo-client"}"#).await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
        assert_eq!(json["error"], "not_implemented");
        assert_eq!(json["error_description"], "Refresh tokens not implemented yet");
    }

    #[tokio::test]
    async fn test_refresh_missing_token() {
        let (status, json) = post(r#"{"client_id":"demo-client"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error_description"], "refresh_token is required");
    }
}
