//! Get an active account.

use axum::Json;
use axum::extract::State;

use crate::AppState;
use crate::account::Account;
use crate::error::Result;
use crate::router::AccountId;

#[utoipa::path(
    get,
    path = "/api/v1/accounts/{id}",
    params(("id" = uuid::Uuid, Path, description = "Account id")),
    responses(
        (status = 200, description = "Account details", body = Account),
        (status = 401, description = "Missing or invalid API key"),
        (status = 404, description = "Account not found or inactive"),
    ),
    security(("api_key" = [])),
    tag = "Accounts"
)]
pub async fn handler(
    State(state): State<AppState>,
    AccountId(id): AccountId,
) -> Result<Json<Account>> {
    Ok(Json(state.accounts.get_account(id).await?))
}
