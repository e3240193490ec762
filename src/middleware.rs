//! Middlewares for routes.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use constant_time_eq::constant_time_eq;

use crate::AppState;
use crate::ServerError;
use crate::error::Result;

/// Header carrying the shared secret.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Paths reachable without an API key.
const PUBLIC_PATHS: &[&str] = &["/status.json", "/v3/api-docs"];

fn is_public(path: &str) -> bool {
    PUBLIC_PATHS.iter().any(|public| path.starts_with(public))
}

/// Middleware rejecting requests without the configured `x-api-key`.
pub async fn require_api_key(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response> {
    let path = req.uri().path().to_owned();
    if is_public(&path) {
        return Ok(next.run(req).await);
    }

    match req.headers().get(API_KEY_HEADER) {
        None => {
            tracing::warn!(%path, "no API key found in request headers");
            Err(ServerError::MissingApiKey)
        },
        Some(key)
            if !constant_time_eq(
                key.as_bytes(),
                state.config.api_key.as_bytes(),
            ) =>
        {
            tracing::warn!(%path, "invalid API key");
            Err(ServerError::InvalidApiKey)
        },
        Some(_) => Ok(next.run(req).await),
    }
}
