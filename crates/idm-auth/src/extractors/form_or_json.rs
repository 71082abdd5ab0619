//! Body extractor accepting form-encoded or JSON requests.

use axum::{
    Form, Json,
    extract::{FromRequest, Request},
    http::header::CONTENT_TYPE,
};
use serde::de::DeserializeOwned;

use crate::error::AuthError;

/// Deserializes the body as JSON when `Content-Type` is `application/json`,
/// and as `application/x-www-form-urlencoded` otherwise.
///
/// Malformed bodies are rejected with `invalid_request`.
#[derive(Debug, Clone)]
pub struct FormOrJson<T>(pub T);

impl<S, T> FromRequest<S> for FormOrJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AuthError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.trim_start().starts_with("application/json"));

        if is_json {
            let Json(value) = Json::<T>::from_request(req, state).await.map_err(|e| {
                tracing::debug!(error = %e, "rejected JSON body");
                AuthError::invalid_request("malformed JSON body")
            })?;
            Ok(FormOrJson(value))
        } else {
            let Form(value) = Form::<T>::from_request(req, state).await.map_err(|e| {
                tracing::debug!(error = %e, "rejected form body");
                AuthError::invalid_request("malformed form body")
            })?;
            Ok(FormOrJson(value))
        }
    }
}
