use axum::{Extension, Json};
use idm_auth::AuthenticatedPrincipal;
use serde_json::{Value, json};

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Echoes the principal attached by the bearer layer.
pub async fn me(Extension(principal): Extension<AuthenticatedPrincipal>) -> Json<Value> {
    Json(json!({
        "subject": principal.subject,
        "email": principal.email,
    }))
}
