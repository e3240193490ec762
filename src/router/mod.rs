pub mod accounts;
pub mod docs;
pub mod status;

use axum::extract::{FromRequest, FromRequestParts, Json, Path, Request};
use axum::http::request::Parts;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::ServerError;

/// JSON body that passed [`Validate`].
pub struct Valid<T>(pub T);

impl<T, S> FromRequest<S> for Valid<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(
        req: Request,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(Valid(value))
    }
}

/// Account `id` taken from the path.
pub struct AccountId(pub Uuid);

impl<S> FromRequestParts<S> for AccountId
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<Uuid>::from_request_parts(parts, state)
            .await
            .map_err(|_| ServerError::InvalidId)?;
        Ok(AccountId(id))
    }
}

/// Amount must be strictly greater than zero.
pub fn validate_positive(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount > Decimal::ZERO {
        Ok(())
    } else {
        Err(ValidationError::new("positive"))
    }
}

#[cfg(test)]
pub const TEST_API_KEY: &str = "test-api-key";

/// State backed by an empty in-memory storage.
#[cfg(test)]
pub fn state() -> crate::AppState {
    state_with(crate::account::MemoryAccountRepository::new())
}

/// State backed by `repo`.
#[cfg(test)]
pub fn state_with(
    repo: crate::account::MemoryAccountRepository,
) -> crate::AppState {
    use std::sync::Arc;

    let config = crate::config::Configuration::with_api_key(TEST_API_KEY);

    crate::AppState {
        config: Arc::new(config),
        accounts: crate::account::AccountService::new(Arc::new(repo)),
    }
}
