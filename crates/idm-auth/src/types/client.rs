//! OAuth 2.0 client registration.
//!
//! Clients are created administratively and are read-only to the issuer.
//! They may be seeded from configuration:
//!
//! ```toml
//! [[auth.clients]]
//! client_id = "demo-client"
//! name = "Demo"
//! redirect_uris = ["https://app.example/callback"]
//! ```

use serde::{Deserialize, Serialize};

/// OAuth 2.0 public client registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    /// Unique public client identifier.
    pub client_id: String,

    /// Client secret. Unused by the public PKCE flow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// Human-readable display name.
    #[serde(default)]
    pub name: String,

    /// Registered redirect URIs, compared by exact string match.
    #[serde(default)]
    pub redirect_uris: Vec<String>,

    /// Scopes this client may request.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// Whether this client can currently be used.
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Client {
    /// Creates an active client with the given redirect URIs.
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        name: impl Into<String>,
        redirect_uris: Vec<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            name: name.into(),
            redirect_uris,
            scopes: Vec::new(),
            active: true,
        }
    }

    /// Validates the registration.
    ///
    /// # Errors
    ///
    /// Returns an error if the client id is empty or no redirect URI is registered.
    pub fn validate(&self) -> Result<(), ClientValidationError> {
        if self.client_id.is_empty() {
            return Err(ClientValidationError::EmptyClientId);
        }

        if self.redirect_uris.is_empty() {
            return Err(ClientValidationError::NoRedirectUris);
        }

        Ok(())
    }

    /// Checks if the given redirect URI is registered for this client.
    ///
    /// No wildcard or prefix matching.
    #[must_use]
    pub fn is_redirect_uri_allowed(&self, uri: &str) -> bool {
        self.redirect_uris.iter().any(|allowed| allowed == uri)
    }
}

/// Client registration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientValidationError {
    /// Client id is empty.
    #[error("client_id cannot be empty")]
    EmptyClientId,

    /// No redirect URIs registered.
    #[error("client must register at least one redirect URI")]
    NoRedirectUris,
}
