//! Remote identity provider integration.
//!
//! RS256 bearer tokens come from an external identity provider (for example
//! Auth0). This module fetches and caches that provider's key set.

pub mod jwks;

pub use jwks::{CachedJwks, JwksError, RemoteJwksCache, RemoteJwksCacheConfig};
