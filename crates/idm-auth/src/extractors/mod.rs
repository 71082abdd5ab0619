//! Axum extractors used by the OAuth endpoints.
//!
//! - [`FormOrJson`] - token and refresh request bodies, form-encoded or JSON

mod form_or_json;

pub use form_or_json::FormOrJson;
