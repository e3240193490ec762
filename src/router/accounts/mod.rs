//! Accounts-related HTTP API.
pub mod balance;
pub mod get;
pub mod register;

use axum::Router;
use axum::routing::{get, post};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        // `POST /api/v1/accounts/register` goes to `register`.
        .route("/register", post(register::handler))
        // `GET /api/v1/accounts/:ID` goes to `get`.
        .route("/{id}", get(get::handler))
        // `GET /api/v1/accounts/:ID/balance` goes to `balance`.
        .route("/{id}/balance", get(balance::handler))
}
