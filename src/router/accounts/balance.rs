//! Get the balance of an active account.

use axum::Json;
use axum::extract::State;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::Result;
use crate::router::AccountId;

/// Balance rendered as a bare JSON number, digits kept as stored.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Response(
    #[serde(with = "rust_decimal::serde::arbitrary_precision")] pub Decimal,
);

#[utoipa::path(
    get,
    path = "/api/v1/accounts/{id}/balance",
    params(("id" = uuid::Uuid, Path, description = "Account id")),
    responses(
        (status = 200, description = "Current balance", body = f64),
        (status = 401, description = "Missing or invalid API key"),
        (status = 404, description = "Account not found or inactive"),
    ),
    security(("api_key" = [])),
    tag = "Accounts"
)]
pub async fn handler(
    State(state): State<AppState>,
    AccountId(id): AccountId,
) -> Result<Json<Response>> {
    Ok(Json(Response(state.accounts.get_balance(id).await?)))
}
