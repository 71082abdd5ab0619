//! Authorization endpoint types.
//!
//! # Flow
//!
//! 1. The user logs in through the external login step
//! 2. The client sends the user agent to the authorize endpoint with a PKCE challenge
//! 3. The server binds a one-time code to the challenge and the user
//! 4. The user agent is redirected back with `code` and `state`

use serde::{Deserialize, Serialize};

/// Authorization request parameters.
///
/// Received as query parameters (`GET`) or a JSON body (`POST`).
///
/// # Example
///
/// ```ignore
/// GET /api/v1/auth/pkce/authorize?
///   client_id=demo-client
///   &redirect_uri=https://app.example/callback
///   &scope=openid
///   &state=xyz
///   &code_challenge=E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM
///   &code_challenge_method=S256
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuthorizationRequest {
    /// Client identifier.
    #[serde(default)]
    pub client_id: String,

    /// Redirect URI, must exactly match a registered URI.
    #[serde(default)]
    pub redirect_uri: String,

    /// Requested scope. Empty means the default scope.
    #[serde(default)]
    pub scope: String,

    /// Opaque client state. Generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    /// PKCE code challenge.
    #[serde(default)]
    pub code_challenge: String,

    /// PKCE challenge method, `S256` or `plain`.
    #[serde(default)]
    pub code_challenge_method: String,
}

impl AuthorizationRequest {
    /// Encodes the request as a query string, skipping empty fields.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        for (name, value) in [
            ("client_id", self.client_id.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("scope", self.scope.as_str()),
            ("state", self.state.as_deref().unwrap_or_default()),
            ("code_challenge", self.code_challenge.as_str()),
            ("code_challenge_method", self.code_challenge_method.as_str()),
        ] {
            if !value.is_empty() {
                query.append_pair(name, value);
            }
        }
        query.finish()
    }
}

/// A code bound to an authorization request.
#[derive(Debug, Clone)]
pub struct AuthorizationGrant {
    /// Authorization code to exchange at the token endpoint.
    pub code: String,

    /// State as supplied, or freshly generated.
    pub state: String,

    /// Redirect URI the code is bound to.
    pub redirect_uri: String,
}

impl AuthorizationGrant {
    /// Builds the redirect URL carrying `code` and `state`.
    ///
    /// Parameters are appended to any query the redirect URI already has.
    ///
    /// # Errors
    ///
    /// Returns an error if the redirect URI is not an absolute URL.
    pub fn to_redirect_url(&self) -> Result<String, url::ParseError> {
        let mut url = url::Url::parse(&self.redirect_uri)?;
        url.query_pairs_mut()
            .append_pair("code", &self.code)
            .append_pair("state", &self.state);
        Ok(url.to_string())
    }
}

/// JSON body returned to API clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationResponse {
    /// The redirect URL a browser would have been sent to.
    pub authorization_url: String,

    /// Authorization code.
    pub code: String,

    /// State.
    pub state: String,
}

impl AuthorizationResponse {
    /// Builds the response for `grant`.
    ///
    /// # Errors
    ///
    /// Returns an error if the redirect URI is not an absolute URL.
    pub fn from_grant(grant: &AuthorizationGrant) -> Result<Self, url::ParseError> {
        Ok(Self {
            authorization_url: grant.to_redirect_url()?,
            code: grant.code.clone(),
            state: grant.state.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(redirect_uri: &str) -> AuthorizationGrant {
        AuthorizationGrant {
            code: "abc".to_string(),
            state: "x y".to_string(),
            redirect_uri: redirect_uri.to_string(),
        }
    }

    #[test]
    fn test_redirect_url() {
        let url = grant("https://app.example/callback")
            .to_redirect_url()
            .unwrap();
        assert_eq!(url, "https://app.example/callback?code=abc&state=x+y");
    }

    #[test]
    fn test_redirect_url_with_existing_query() {
        let url = grant("https://app.example/callback?tenant=1")
            .to_redirect_url()
            .unwrap();
        assert_eq!(
            url,
            "https://app.example/callback?tenant=1&code=abc&state=x+y"
        );
    }

    #[test]
    fn test_relative_redirect_rejected() {
        assert!(grant("/callback").to_redirect_url().is_err());
    }

    #[test]
    fn test_request_defaults() {
        let request: AuthorizationRequest =
            serde_json::from_str(r#"{"client_id":"demo-client"}"#).unwrap();
        assert_eq!(request.client_id, "demo-client");
        assert!(request.redirect_uri.is_empty());
        assert!(request.state.is_none());
    }
}
