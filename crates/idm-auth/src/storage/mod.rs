//! Storage traits and in-memory implementations.
//!
//! This module defines storage interfaces for:
//!
//! - OAuth client registrations
//! - Authorization codes
//! - The user directory consulted by the session resolver
//!
//! Every trait ships with a `DashMap`-backed implementation. Persistent
//! backends implement the same traits.

pub mod client;
pub mod code;
pub mod user;

pub use client::{ClientStorage, InMemoryClientStorage};
pub use code::{AuthorizationCodeStorage, InMemoryAuthorizationCodeStorage};
pub use user::{InMemoryUserDirectory, UserDirectory};
