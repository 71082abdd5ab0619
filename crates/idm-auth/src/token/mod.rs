//! Bearer token claims and the local HS256 issuer.

pub mod jwt;

pub use jwt::{Audience, IssuedToken, JwtError, TokenClaims, TokenIssuer};
