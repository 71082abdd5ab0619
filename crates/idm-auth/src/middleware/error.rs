//! Error response handling.
//!
//! This module implements `IntoResponse` for `AuthError`, producing OAuth 2.0
//! style JSON bodies (`{"error": .., "error_description": ..}`). Token
//! failures carry a `WWW-Authenticate: Bearer` challenge.

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::AuthError;

// =============================================================================
// IntoResponse Implementation
// =============================================================================

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        let oauth_error = self.oauth_error_code();
        let description = self.public_description();

        if self.is_server_error() && !matches!(self, AuthError::NotImplemented { .. }) {
            tracing::error!(
                category = %self.category(),
                error = %self,
                "request failed"
            );
        } else {
            tracing::debug!(category = %self.category(), error = %self, "request rejected");
        }

        let mut headers = HeaderMap::new();
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));

        if status == StatusCode::UNAUTHORIZED {
            let www_auth = build_www_authenticate_header(oauth_error, &description);
            if let Ok(value) = HeaderValue::from_str(&www_auth) {
                headers.insert(header::WWW_AUTHENTICATE, value);
            }
        }

        (status, headers, Json(oauth_error_json(oauth_error, &description))).into_response()
    }
}

/// Builds the WWW-Authenticate header value for 401 responses.
///
/// Format: `Bearer realm="idm", error="invalid_token", error_description="..."`
fn build_www_authenticate_header(error: &str, description: &str) -> String {
    let escaped_desc = description.replace('\"', "\\\"");
    format!("Bearer realm=\"idm\", error=\"{error}\", error_description=\"{escaped_desc}\"")
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Creates an OAuth 2.0 error body.
#[must_use]
pub fn oauth_error_json(error: &str, description: &str) -> serde_json::Value {
    json!({
        "error": error,
        "error_description": description,
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_unauthorized_response() {
        let response = AuthError::unauthorized("Authorization header required").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let www_auth = response
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(www_auth.starts_with("Bearer"));
        assert!(www_auth.contains("error=\"unauthorized\""));

        let json = body_json(response).await;
        assert_eq!(json["error"], "unauthorized");
        assert_eq!(json["error_description"], "Authorization header required");
    }

    #[tokio::test]
    async fn test_invalid_token_description_collapsed() {
        let response = AuthError::invalid_token("No matching key found").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let json = body_json(response).await;
        assert_eq!(json["error"], "invalid_token");
        assert_eq!(json["error_description"], "Invalid token");
    }

    #[tokio::test]
    async fn test_token_expired_response() {
        let response = AuthError::TokenExpired.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let www_auth = response
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(www_auth.contains("error=\"invalid_token\""));
    }

    #[tokio::test]
    async fn test_invalid_grant_response() {
        let response = AuthError::invalid_grant("invalid or expired authorization code")
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(!response.headers().contains_key(header::WWW_AUTHENTICATE));

        let json = body_json(response).await;
        assert_eq!(json["error"], "invalid_grant");
        assert_eq!(
            json["error_description"],
            "invalid or expired authorization code"
        );
    }

    #[tokio::test]
    async fn test_server_error_hides_cause() {
        let response = AuthError::storage("connection reset by peer").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json["error"], "server_error");
        assert_eq!(json["error_description"], "Internal server error");
    }

    #[tokio::test]
    async fn test_remote_key_is_503() {
        let response = AuthError::remote_key("timeout").into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let json = body_json(response).await;
        assert_eq!(json["error"], "temporarily_unavailable");
    }

    #[tokio::test]
    async fn test_not_implemented_response() {
        let response = AuthError::not_implemented("refresh tokens").into_response();
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);

        let json = body_json(response).await;
        assert_eq!(json["error"], "not_implemented");
        assert_eq!(
            json["error_description"],
            "Refresh tokens not implemented yet"
        );
    }

    #[test]
    fn test_www_authenticate_header_escaping() {
        let header = build_www_authenticate_header("invalid_token", "Token contains \"quotes\"");
        assert!(header.contains("\\\"quotes\\\""));
    }
}
