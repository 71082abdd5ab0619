//! Common types shared by the issuer, the verifier and the HTTP handlers.
//!
//! ## Domain Types
//!
//! - [`Client`] - Registered public OAuth 2.0 client
//! - [`Principal`] - Verified user identity supplied by the session collaborator

pub mod client;
pub mod principal;

pub use client::{Client, ClientValidationError};
pub use principal::Principal;
