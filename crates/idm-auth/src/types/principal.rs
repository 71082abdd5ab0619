//! Verified user identity.

use serde::{Deserialize, Serialize};

/// A verified principal supplied by the session collaborator at authorization
/// time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Stable user identifier, becomes the token `sub` claim.
    pub subject: String,

    /// User email, becomes the token `email` claim.
    #[serde(default)]
    pub email: String,
}

impl Principal {
    /// Creates a new principal.
    #[must_use]
    pub fn new(subject: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            email: email.into(),
        }
    }
}
