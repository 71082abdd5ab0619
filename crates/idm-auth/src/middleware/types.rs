//! Authentication context types.

use serde::{Deserialize, Serialize};

use crate::token::TokenClaims;

/// Principal attached to a request after bearer verification.
///
/// Inserted into request extensions by [`super::require_bearer`] and
/// returned by the [`super::BearerAuth`] extractor. Downstream handlers must
/// treat an empty `subject` as unauthenticated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedPrincipal {
    /// Token subject.
    pub subject: String,

    /// Token email claim, empty when absent.
    pub email: String,
}

impl AuthenticatedPrincipal {
    /// Creates a principal.
    #[must_use]
    pub fn new(subject: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            email: email.into(),
        }
    }

    /// Returns `true` if the principal has a subject.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        !self.subject.is_empty()
    }
}

impl From<TokenClaims> for AuthenticatedPrincipal {
    fn from(claims: TokenClaims) -> Self {
        Self {
            subject: claims.sub,
            email: claims.email.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_authenticated() {
        assert!(AuthenticatedPrincipal::new("user-1", "").is_authenticated());
        assert!(!AuthenticatedPrincipal::default().is_authenticated());
    }

    #[test]
    fn test_from_claims() {
        let principal = AuthenticatedPrincipal::from(TokenClaims {
            sub: "user-1".to_string(),
            email: None,
            aud: None,
            iss: None,
            iat: 0,
            exp: 1,
        });
        assert_eq!(principal.subject, "user-1");
        assert!(principal.email.is_empty());
    }
}
