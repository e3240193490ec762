//! Account core: number generation, creation and active-only lookups.
mod memory;
mod number;
mod postgres;
mod repository;
mod service;

pub use memory::*;
pub use number::*;
pub use postgres::*;
pub use repository::*;
pub use service::*;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Account as saved on database.
#[derive(
    Clone,
    Debug,
    PartialEq,
    Serialize,
    Deserialize,
    sqlx::FromRow,
    ToSchema,
)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: Uuid,
    /// Ten decimal digits, customer-facing.
    #[schema(example = "0483920175")]
    pub account_number: String,
    #[schema(example = "savings")]
    pub account_type: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    #[schema(value_type = f64, example = 1000.00)]
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub active: bool,
    pub customer_id: Uuid,
}

/// Account record ready to be inserted. Storage assigns the `id`.
#[derive(Clone, Debug, PartialEq)]
pub struct NewAccount {
    pub account_number: String,
    pub account_type: String,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub active: bool,
    pub customer_id: Uuid,
}

impl NewAccount {
    /// Attach the storage-assigned `id`.
    pub fn with_id(self, id: Uuid) -> Account {
        Account {
            id,
            account_number: self.account_number,
            account_type: self.account_type,
            balance: self.balance,
            created_at: self.created_at,
            active: self.active,
            customer_id: self.customer_id,
        }
    }
}

/// Caller-supplied data to open an account.
#[derive(Clone, Debug, PartialEq)]
pub struct OpenAccount {
    pub account_type: String,
    pub initial_deposit: Decimal,
    pub customer_id: Uuid,
}
