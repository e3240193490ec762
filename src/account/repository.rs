//! Storage port for accounts.

use async_trait::async_trait;
use uuid::Uuid;

use crate::account::{Account, NewAccount};
use crate::error::Result;

/// Port for account persistence operations.
///
/// Implementations must enforce uniqueness of `account_number` and
/// `customer_id` at insert time and report violations as
/// [`ServerError::AccountNumberTaken`] and
/// [`ServerError::CustomerAlreadyHasAccount`].
///
/// [`ServerError::AccountNumberTaken`]: crate::error::ServerError::AccountNumberTaken
/// [`ServerError::CustomerAlreadyHasAccount`]: crate::error::ServerError::CustomerAlreadyHasAccount
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Insert a new account and return it with its assigned `id`.
    async fn insert(&self, account: &NewAccount) -> Result<Account>;

    /// Find an account by `id`, only if it is active.
    async fn find_active_by_id(&self, id: Uuid) -> Result<Option<Account>>;

    /// Check whether an account number is already used.
    async fn exists_by_account_number(&self, account_number: &str)
    -> Result<bool>;
}
