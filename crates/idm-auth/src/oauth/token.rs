//! Token endpoint types.
//!
//! Only the `authorization_code` grant is supported. The refresh endpoint
//! accepts [`RefreshRequest`] so that malformed requests are still rejected
//! with `400`, but never issues tokens.

use serde::{Deserialize, Serialize};

/// Token request parameters, form-encoded or JSON.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TokenRequest {
    /// Must be `authorization_code`.
    #[serde(default)]
    pub grant_type: String,

    /// Authorization code.
    #[serde(default)]
    pub code: String,

    /// Redirect URI used at the authorize step.
    #[serde(default)]
    pub redirect_uri: String,

    /// Client identifier used at the authorize step.
    #[serde(default)]
    pub client_id: String,

    /// PKCE code verifier.
    #[serde(default)]
    pub code_verifier: String,

    /// State returned by the authorize step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// Successful token response.
///
/// ```json
/// {
///   "access_token": "eyJhbG...",
///   "token_type": "Bearer",
///   "expires_in": 3600,
///   "scope": "openid profile email"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// The access token (JWT).
    pub access_token: String,

    /// Token type, always "Bearer".
    pub token_type: String,

    /// Access token lifetime in seconds.
    pub expires_in: u64,

    /// Granted scope.
    pub scope: String,
}

impl TokenResponse {
    /// Creates a bearer token response.
    #[must_use]
    pub fn new(access_token: String, expires_in: u64, scope: String) -> Self {
        Self {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in,
            scope,
        }
    }
}

/// Refresh token request.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RefreshRequest {
    /// Refresh token.
    #[serde(default)]
    pub refresh_token: String,

    /// Client identifier.
    #[serde(default)]
    pub client_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_request_from_form() {
        let request: TokenRequest = serde_urlencoded_like(
            "grant_type=authorization_code&code=abc&redirect_uri=https%3A%2F%2Fapp.example%2Fcallback&client_id=demo-client&code_verifier=v",
        );
        assert_eq!(request.grant_type, "authorization_code");
        assert_eq!(request.redirect_uri, "https://app.example/callback");
        assert!(request.state.is_none());
    }

    #[test]
    fn test_token_response_serialization() {
        let response = TokenResponse::new("tok".to_string(), 3600, "openid".to_string());
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["token_type"], "Bearer");
        assert_eq!(json["expires_in"], 3600);
        assert_eq!(json["scope"], "openid");
    }

    fn serde_urlencoded_like(body: &str) -> TokenRequest {
        let pairs: serde_json::Map<String, serde_json::Value> =
            url::form_urlencoded::parse(body.as_bytes())
                .map(|(k, v)| (k.into_owned(), serde_json::Value::String(v.into_owned())))
                .collect();
        serde_json::from_value(serde_json::Value::Object(pairs)).unwrap()
    }
}
