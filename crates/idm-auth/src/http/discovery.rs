//! Discovery document handlers.
//!
//! - `GET /.well-known/openid-configuration` - OpenID Provider metadata
//! - `GET /api/v1/auth/pkce/config` - PKCE client configuration

use axum::{Json, extract::State, http::header, response::IntoResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::oauth::PkceChallengeMethod;

use super::{OAuthState, PKCE_BASE_PATH};

/// OpenID Provider metadata advertised at
/// `/.well-known/openid-configuration`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenIdConfiguration {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub jwks_uri: String,
    pub response_types_supported: Vec<String>,
    pub grant_types_supported: Vec<String>,
    pub subject_types_supported: Vec<String>,
    pub id_token_signing_alg_values_supported: Vec<String>,
    pub scopes_supported: Vec<String>,
    pub token_endpoint_auth_methods_supported: Vec<String>,
    pub code_challenge_methods_supported: Vec<String>,
    pub claims_supported: Vec<String>,
}

impl OpenIdConfiguration {
    /// Builds the metadata for an issuer URL (without trailing slash).
    #[must_use]
    pub fn build(issuer: &str) -> Self {
        Self {
            issuer: issuer.to_string(),
            authorization_endpoint: format!("{issuer}{PKCE_BASE_PATH}/authorize"),
            token_endpoint: format!("{issuer}{PKCE_BASE_PATH}/token"),
            jwks_uri: format!("{issuer}{PKCE_BASE_PATH}/jwks"),
            response_types_supported: strings(&["code"]),
            grant_types_supported: strings(&["authorization_code"]),
            subject_types_supported: strings(&["public"]),
            id_token_signing_alg_values_supported: strings(&["HS256"]),
            scopes_supported: strings(&["openid", "profile", "email"]),
            token_endpoint_auth_methods_supported: strings(&["none"]),
            code_challenge_methods_supported: strings(&[
                PkceChallengeMethod::S256.as_str(),
                PkceChallengeMethod::Plain.as_str(),
            ]),
            claims_supported: strings(&["sub", "email"]),
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

/// Handler for `GET /.well-known/openid-configuration`.
pub async fn openid_configuration_handler(State(state): State<OAuthState>) -> impl IntoResponse {
    let config = OpenIdConfiguration::build(&state.issuer);
    ([(header::CONTENT_TYPE, "application/json")], Json(config))
}

/// Handler for `GET /api/v1/auth/pkce/config`.
///
/// # Example Response
///
/// ```json
/// {
///   "issuer": "https://idm.example.com",
///   "pkce": {
///     "code_challenge_method": "S256",
///     "supported_methods": ["S256", "plain"],
///     "supported_scopes": ["openid", "profile", "email", "offline_access"]
///   }
/// }
/// ```
pub async fn pkce_config_handler(State(state): State<OAuthState>) -> impl IntoResponse {
    Json(json!({
        "issuer": state.issuer,
        "pkce": {
            "code_challenge_method": PkceChallengeMethod::default().as_str(),
            "supported_methods": [
                PkceChallengeMethod::S256.as_str(),
                PkceChallengeMethod::Plain.as_str(),
            ],
            "supported_scopes": state.supported_scopes,
        }
    }))
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

    async fn get(uri: &str) -> serde_json::Value {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = router(oauth_state()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_build_endpoints() {
        let config = OpenIdConfiguration::build("https://idm.example.com");
        assert_eq!(
            config.authorization_endpoint,
            "https://idm.example.com/api/v1/auth/pkce/authorize"
        );
        assert_eq!(config.jwks_uri, "https://idm.example.com/api/v1/auth/pkce/jwks");
        assert_eq!(config.code_challenge_methods_supported, vec!["S256", "plain"]);
    }

    #[tokio::test]
    async fn test_openid_configuration() {
        let json = get("/.well-known/openid-configuration").await;
        assert_eq!(json["issuer"], "https://idm.example.com");
        assert_eq!(
            json["token_endpoint"],
            "https://idm.example.com/api/v1/auth/pkce/token"
        );
        assert_eq!(json["grant_types_supported"][0], "authorization_code");
        assert_eq!(json["token_endpoint_auth_methods_supported"][0], "none");
    }

    #[tokio::test]
    async fn test_pkce_config() {
        let json = get("/api/v1/auth/pkce/config").await;
        assert_eq!(json["pkce"]["code_challenge_method"], "S256");
        assert_eq!(json["pkce"]["supported_methods"][1], "plain");
        assert_eq!(json["pkce"]["supported_scopes"][3], "offline_access");
    }
}
