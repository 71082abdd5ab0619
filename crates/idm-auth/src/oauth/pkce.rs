//! PKCE (Proof Key for Code Exchange) implementation
//!
//! Implements RFC 7636 with both the `S256` and `plain` methods. Comparisons
//! run in constant time over the encoded bytes.
//!
//! # Example
//!
//! ```
//! use idm_auth::oauth::{PkceChallenge, PkceChallengeMethod, PkceVerifier};
//!
//! // Client generates a verifier and challenge
//! let verifier = PkceVerifier::generate();
//! let challenge = PkceChallenge::from_verifier(&verifier);
//!
//! // Server stores the challenge, later verifies with the verifier from the token request
//! let stored = PkceChallenge::new(challenge.as_str().to_string());
//! assert!(stored.verify(PkceChallengeMethod::S256, &verifier).is_ok());
//! ```

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::Rng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during PKCE operations.
#[derive(Debug, thiserror::Error)]
pub enum PkceError {
    /// Verifier length is outside the valid range (43-128 characters).
    #[error("Invalid verifier length: must be 43-128 characters, got {0}")]
    InvalidVerifierLength(usize),

    /// Verifier contains invalid characters.
    #[error("Invalid verifier characters: must be unreserved URL characters ([A-Za-z0-9-._~])")]
    InvalidVerifierCharacters,

    /// Unsupported challenge method.
    #[error("Unsupported code_challenge_method: '{0}'. Must be S256 or plain")]
    UnsupportedMethod(String),

    /// PKCE verification failed (verifier doesn't match challenge).
    #[error("PKCE verification failed: verifier does not match challenge")]
    VerificationFailed,
}

impl PkceError {
    /// Create an `InvalidVerifierLength` error.
    #[must_use]
    pub fn invalid_verifier_length(len: usize) -> Self {
        Self::InvalidVerifierLength(len)
    }

    /// Create an `UnsupportedMethod` error.
    #[must_use]
    pub fn unsupported_method(method: impl Into<String>) -> Self {
        Self::UnsupportedMethod(method.into())
    }

    /// Returns `true` if this is a verifier syntax error.
    #[must_use]
    pub fn is_verifier_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidVerifierLength(_) | Self::InvalidVerifierCharacters
        )
    }

    /// Returns `true` if this is a verification failure.
    #[must_use]
    pub fn is_verification_error(&self) -> bool {
        matches!(self, Self::VerificationFailed)
    }

    /// Get the OAuth 2.0 error code for this error.
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        match self {
            Self::InvalidVerifierLength(_)
            | Self::InvalidVerifierCharacters
            | Self::UnsupportedMethod(_) => "invalid_request",
            Self::VerificationFailed => "invalid_grant",
        }
    }
}

// =============================================================================
// PKCE Challenge Method
// =============================================================================

/// PKCE challenge method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PkceChallengeMethod {
    /// SHA-256 hash of the verifier.
    #[default]
    S256,
    /// The challenge equals the verifier.
    Plain,
}

impl PkceChallengeMethod {
    /// Parse challenge method from string.
    ///
    /// # Errors
    ///
    /// Returns `PkceError::UnsupportedMethod` for anything other than
    /// `"S256"` or `"plain"`.
    pub fn parse(method: &str) -> Result<Self, PkceError> {
        match method {
            "S256" => Ok(Self::S256),
            "plain" => Ok(Self::Plain),
            other => Err(PkceError::unsupported_method(other)),
        }
    }

    /// Get the method as a string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::S256 => "S256",
            Self::Plain => "plain",
        }
    }
}

impl std::fmt::Display for PkceChallengeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// PKCE Verifier
// =============================================================================

/// PKCE code verifier.
///
/// From RFC 7636 Section 4.1:
/// > code_verifier = high-entropy cryptographic random STRING using the
/// > unreserved characters [A-Z] / [a-z] / [0-9] / "-" / "." / "_" / "~"
/// > from Section 2.3 of [RFC3986], with a minimum length of 43 characters
/// > and a maximum length of 128 characters.
#[derive(Debug, Clone)]
pub struct PkceVerifier(String);

impl PkceVerifier {
    /// Create a new verifier from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Length is not between 43 and 128 characters
    /// - Contains characters other than `[A-Za-z0-9-._~]`
    pub fn new(verifier: String) -> Result<Self, PkceError> {
        let len = verifier.len();

        if !(43..=128).contains(&len) {
            return Err(PkceError::invalid_verifier_length(len));
        }

        if !verifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_' || c == '~')
        {
            return Err(PkceError::InvalidVerifierCharacters);
        }

        Ok(Self(verifier))
    }

    /// Generate a cryptographically random verifier.
    ///
    /// 32 random bytes (256 bits) encoded as base64url, 43 characters.
    #[must_use]
    pub fn generate() -> Self {
        let bytes: [u8; 32] = rand::thread_rng().r#gen();
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Get the verifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the verifier and return the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for PkceVerifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// PKCE Challenge
// =============================================================================

/// PKCE code challenge as stored with an authorization code.
///
/// From RFC 7636 Section 4.2:
/// > S256
/// >    code_challenge = BASE64URL(SHA256(ASCII(code_verifier)))
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkceChallenge(String);

impl PkceChallenge {
    /// Create a challenge from a verifier using the S256 method.
    #[must_use]
    pub fn from_verifier(verifier: &PkceVerifier) -> Self {
        Self(derive_challenge(verifier.as_str()))
    }

    /// Wrap a challenge received from a client.
    #[must_use]
    pub fn new(challenge: String) -> Self {
        Self(challenge)
    }

    /// Verify that a verifier matches this challenge under `method`.
    ///
    /// # Errors
    ///
    /// Returns `PkceError::VerificationFailed` if the verifier doesn't match.
    pub fn verify(
        &self,
        method: PkceChallengeMethod,
        verifier: &PkceVerifier,
    ) -> Result<(), PkceError> {
        let matches: bool = match method {
            PkceChallengeMethod::S256 => derive_challenge(verifier.as_str())
                .as_bytes()
                .ct_eq(self.0.as_bytes())
                .into(),
            PkceChallengeMethod::Plain => verifier.as_str().as_bytes().ct_eq(self.0.as_bytes()).into(),
        };

        if matches {
            Ok(())
        } else {
            Err(PkceError::VerificationFailed)
        }
    }

    /// Get the challenge as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for PkceChallenge {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Free functions
// =============================================================================

/// Generates a new random verifier string.
#[must_use]
pub fn new_verifier() -> String {
    PkceVerifier::generate().into_inner()
}

/// Computes `BASE64URL(SHA256(verifier))`.
#[must_use]
pub fn derive_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Generates a 128-bit random state token.
#[must_use]
pub fn new_state() -> String {
    let bytes: [u8; 16] = rand::thread_rng().r#gen();
    URL_SAFE_NO_PAD.encode(bytes)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const RFC_VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
    const RFC_CHALLENGE: &str = "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM";

    // -------------------------------------------------------------------------
    // Verifier Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_verifier_generation() {
        let verifier = PkceVerifier::generate();
        assert_eq!(verifier.as_str().len(), 43);
        assert!(
            verifier
                .as_str()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
            "Generated verifier should only contain base64url characters"
        );
        assert!(PkceVerifier::new(verifier.into_inner()).is_ok());
    }

    #[test]
    fn test_verifier_generation_uniqueness() {
        let v1 = new_verifier();
        let v2 = new_verifier();
        assert_ne!(v1, v2);
    }

    #[test]
    fn test_verifier_validation_length() {
        assert!(matches!(
            PkceVerifier::new("a".repeat(42)).unwrap_err(),
            PkceError::InvalidVerifierLength(42)
        ));
        assert!(PkceVerifier::new("a".repeat(43)).is_ok());
        assert!(PkceVerifier::new("a".repeat(128)).is_ok());
        assert!(matches!(
            PkceVerifier::new("a".repeat(129)).unwrap_err(),
            PkceError::InvalidVerifierLength(129)
        ));
    }

    #[test]
    fn test_verifier_validation_characters() {
        let valid = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-._~"
            .chars()
            .cycle()
            .take(64)
            .collect::<String>();
        assert!(PkceVerifier::new(valid).is_ok());

        let invalid = "abcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*()".to_string();
        assert!(matches!(
            PkceVerifier::new(invalid).unwrap_err(),
            PkceError::InvalidVerifierCharacters
        ));
    }

    // -------------------------------------------------------------------------
    // State Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_state_is_128_bits() {
        let state = new_state();
        assert_eq!(state.len(), 22);
        assert_eq!(URL_SAFE_NO_PAD.decode(&state).unwrap().len(), 16);
        assert_ne!(state, new_state());
    }

    // -------------------------------------------------------------------------
    // Challenge Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_rfc7636_appendix_b_test_vector() {
        assert_eq!(derive_challenge(RFC_VERIFIER), RFC_CHALLENGE);

        let verifier = PkceVerifier::new(RFC_VERIFIER.to_string()).unwrap();
        let stored = PkceChallenge::new(RFC_CHALLENGE.to_string());
        assert!(stored.verify(PkceChallengeMethod::S256, &verifier).is_ok());
    }

    #[test]
    fn test_s256_rejects_wrong_verifier() {
        let verifier = PkceVerifier::generate();
        let other = PkceVerifier::generate();
        let challenge = PkceChallenge::from_verifier(&verifier);

        assert!(challenge.verify(PkceChallengeMethod::S256, &verifier).is_ok());
        assert!(matches!(
            challenge
                .verify(PkceChallengeMethod::S256, &other)
                .unwrap_err(),
            PkceError::VerificationFailed
        ));
    }

    #[test]
    fn test_plain_compares_verifier_directly() {
        let verifier = PkceVerifier::new(RFC_VERIFIER.to_string()).unwrap();
        let plain = PkceChallenge::new(RFC_VERIFIER.to_string());
        assert!(plain.verify(PkceChallengeMethod::Plain, &verifier).is_ok());

        // An S256 challenge is not accepted as a plain one
        let hashed = PkceChallenge::new(RFC_CHALLENGE.to_string());
        assert!(hashed.verify(PkceChallengeMethod::Plain, &verifier).is_err());

        // A plain challenge is not accepted under S256
        assert!(plain.verify(PkceChallengeMethod::S256, &verifier).is_err());
    }

    // -------------------------------------------------------------------------
    // Challenge Method Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_challenge_method_parse() {
        assert_eq!(
            PkceChallengeMethod::parse("S256").unwrap(),
            PkceChallengeMethod::S256
        );
        assert_eq!(
            PkceChallengeMethod::parse("plain").unwrap(),
            PkceChallengeMethod::Plain
        );
        for bad in ["", "s256", "PLAIN", "RS256"] {
            assert!(matches!(
                PkceChallengeMethod::parse(bad).unwrap_err(),
                PkceError::UnsupportedMethod(_)
            ));
        }
    }

    #[test]
    fn test_challenge_method_display() {
        assert_eq!(format!("{}", PkceChallengeMethod::S256), "S256");
        assert_eq!(PkceChallengeMethod::Plain.to_string(), "plain");
    }

    // -------------------------------------------------------------------------
    // Error Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_error_oauth_codes() {
        assert_eq!(
            PkceError::invalid_verifier_length(10).oauth_error_code(),
            "invalid_request"
        );
        assert_eq!(
            PkceError::unsupported_method("x").oauth_error_code(),
            "invalid_request"
        );
        assert_eq!(
            PkceError::VerificationFailed.oauth_error_code(),
            "invalid_grant"
        );
        assert!(PkceError::InvalidVerifierCharacters.is_verifier_error());
        assert!(PkceError::VerificationFailed.is_verification_error());
    }
}
