//! In-memory account storage.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::account::{Account, AccountRepository, NewAccount};
use crate::error::{Result, ServerError};

/// Account storage kept in process memory.
///
/// Uniqueness checks and the insert happen under one write lock, so an
/// insert is atomic like a single database statement.
#[derive(Clone, Default)]
pub struct MemoryAccountRepository {
    accounts: Arc<RwLock<HashMap<Uuid, Account>>>,
}

impl MemoryAccountRepository {
    /// Create an empty [`MemoryAccountRepository`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a [`MemoryAccountRepository`] preloaded with `accounts`.
    pub fn with_accounts(accounts: impl IntoIterator<Item = Account>) -> Self {
        let accounts = accounts
            .into_iter()
            .map(|account| (account.id, account))
            .collect();

        Self {
            accounts: Arc::new(RwLock::new(accounts)),
        }
    }

    /// Number of stored accounts, active or not.
    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }
}

#[async_trait]
impl AccountRepository for MemoryAccountRepository {
    async fn insert(&self, account: &NewAccount) -> Result<Account> {
        let mut accounts = self.accounts.write().await;

        for stored in accounts.values() {
            if stored.account_number == account.account_number {
                return Err(ServerError::AccountNumberTaken);
            }
            if stored.customer_id == account.customer_id {
                return Err(ServerError::CustomerAlreadyHasAccount);
            }
        }

        let account = account.clone().with_id(Uuid::new_v4());
        accounts.insert(account.id, account.clone());

        Ok(account)
    }

    async fn find_active_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        Ok(self
            .accounts
            .read()
            .await
            .get(&id)
            .filter(|account| account.active)
            .cloned())
    }

    async fn exists_by_account_number(
        &self,
        account_number: &str,
    ) -> Result<bool> {
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .any(|account| account.account_number == account_number))
    }
}
