//! Open a new account.

use axum::extract::State;
use axum::{Json, http::StatusCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use crate::account::{Account, OpenAccount};
use crate::error::Result;
use crate::router::Valid;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Body {
    #[validate(length(min = 1, message = "Account type must not be empty."))]
    #[schema(example = "savings")]
    pub account_type: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    #[validate(custom(
        function = "crate::router::validate_positive",
        message = "Initial deposit must be greater than zero."
    ))]
    #[schema(value_type = f64, example = 1000.00)]
    pub initial_deposit: Decimal,
    pub customer_id: Uuid,
}

impl From<Body> for OpenAccount {
    fn from(body: Body) -> Self {
        OpenAccount {
            account_type: body.account_type,
            initial_deposit: body.initial_deposit,
            customer_id: body.customer_id,
        }
    }
}

/// Handler to open an account.
#[utoipa::path(
    post,
    path = "/api/v1/accounts/register",
    request_body = Body,
    responses(
        (status = 201, description = "Account created", body = Account),
        (status = 400, description = "Invalid request body"),
        (status = 401, description = "Missing or invalid API key"),
        (status = 409, description = "Customer already holds an account"),
    ),
    security(("api_key" = [])),
    tag = "Accounts"
)]
pub async fn handler(
    State(state): State<AppState>,
    Valid(body): Valid<Body>,
) -> Result<(StatusCode, Json<Account>)> {
    let account = state.accounts.create_account(body.into()).await?;

    Ok((StatusCode::CREATED, Json(account)))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use http_body_util::BodyExt;

    use super::*;
    use crate::account::is_account_number;
    use crate::*;

    const PATH: &str = "/api/v1/accounts/register";

    fn body(account_type: &str, deposit: &str, customer_id: Uuid) -> String {
        format!(
            r#"{{"accountType":"{account_type}","initialDeposit":{deposit},"customerId":"{customer_id}"}}"#
        )
    }

    #[tokio::test]
    async fn test_register_handler() {
        let app = app(router::state());
        let customer_id = Uuid::new_v4();

        let response = make_request(
            Some(router::TEST_API_KEY),
            app,
            Method::POST,
            PATH,
            body("savings", "1000.00", customer_id),
        )
        .await;

        assert_eq!(response.status(), StatusCode::CREATED);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let raw: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(raw["id"].is_string());
        assert!(raw["createdAt"].is_string());
        assert_eq!(raw["active"], true);

        let account: Account = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(account.account_type, "savings");
        assert_eq!(account.balance.to_string(), "1000.00");
        assert_eq!(account.customer_id, customer_id);
        assert!(is_account_number(&account.account_number));
        assert!(account.active);
    }

    #[tokio::test]
    async fn test_register_rejects_non_positive_deposit() {
        let state = router::state();

        for deposit in ["0", "-25.00"] {
            let response = make_request(
                Some(router::TEST_API_KEY),
                app(state.clone()),
                Method::POST,
                PATH,
                body("savings", deposit, Uuid::new_v4()),
            )
            .await;

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn test_register_rejects_missing_fields() {
        let app = app(router::state());

        let response = make_request(
            Some(router::TEST_API_KEY),
            app,
            Method::POST,
            PATH,
            r#"{"accountType":"savings","initialDeposit":10}"#.into(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_register_rejects_oversized_deposit() {
        let response = make_request(
            Some(router::TEST_API_KEY),
            app(router::state()),
            Method::POST,
            PATH,
            body("savings", "1e32", Uuid::new_v4()),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let raw: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(raw["detail"], "initialDeposit is not a valid decimal");
    }

    #[tokio::test]
    async fn test_register_rejects_malformed_json() {
        let response = make_request(
            Some(router::TEST_API_KEY),
            app(router::state()),
            Method::POST,
            PATH,
            r#"{"accountType":"#.into(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let raw: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(raw["detail"], "Request body is not valid JSON");
    }

    #[tokio::test]
    async fn test_register_rejects_empty_type() {
        let app = app(router::state());

        let response = make_request(
            Some(router::TEST_API_KEY),
            app,
            Method::POST,
            PATH,
            body("", "10", Uuid::new_v4()),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_register_same_customer_twice() {
        let state = router::state();
        let customer_id = Uuid::new_v4();

        let response = make_request(
            Some(router::TEST_API_KEY),
            app(state.clone()),
            Method::POST,
            PATH,
            body("savings", "10", customer_id),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = make_request(
            Some(router::TEST_API_KEY),
            app(state),
            Method::POST,
            PATH,
            body("checking", "20", customer_id),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
