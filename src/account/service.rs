use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::account::{
    Account, AccountRepository, NewAccount, OpenAccount, draw_account_number,
};
use crate::error::{Result, ServerError};
use crate::telemetry::{self, CollisionStage, CreationOutcome};

/// Default cap on account number draws for one creation.
pub const DEFAULT_MAX_NUMBER_ATTEMPTS: u32 = 10;

/// Account manager.
///
/// Built once at start-up and shared between requests. It holds no mutable
/// state: every guarantee on concurrent writes comes from storage.
#[derive(Clone)]
pub struct AccountService {
    repo: Arc<dyn AccountRepository>,
    max_number_attempts: u32,
}

impl AccountService {
    /// Create a new [`AccountService`].
    pub fn new(repo: Arc<dyn AccountRepository>) -> Self {
        Self {
            repo,
            max_number_attempts: DEFAULT_MAX_NUMBER_ATTEMPTS,
        }
    }

    /// Update the number of draws allowed before giving up a creation.
    pub fn max_number_attempts(mut self, attempts: u32) -> Self {
        self.max_number_attempts = attempts.max(1);
        self
    }

    /// Draw numbers until one is not used by any stored account.
    ///
    /// The check is only a hint: nothing is reserved, so the insert can still
    /// collide with a concurrent creation.
    async fn unused_account_number(&self) -> Result<String> {
        for attempt in 1..=self.max_number_attempts {
            let number = draw_account_number();
            if !self.repo.exists_by_account_number(&number).await? {
                return Ok(number);
            }

            tracing::debug!(attempt, "account number already used");
            telemetry::record_number_collision(CollisionStage::Lookup);
        }

        Err(ServerError::AccountNumberExhausted {
            attempts: self.max_number_attempts,
        })
    }

    /// Open a new active account and persist it.
    pub async fn create_account(&self, request: OpenAccount) -> Result<Account> {
        let result = self.open_account(request).await;
        telemetry::record_account_creation(CreationOutcome::of(&result));

        result
    }

    async fn open_account(&self, request: OpenAccount) -> Result<Account> {
        if request.initial_deposit <= Decimal::ZERO {
            return Err(ServerError::InvalidDeposit(request.initial_deposit));
        }
        if request.account_type.trim().is_empty() {
            return Err(ServerError::InvalidAccountType);
        }

        tracing::info!(customer_id = %request.customer_id, "account creation started");

        for attempt in 1..=self.max_number_attempts {
            let account = NewAccount {
                account_number: self.unused_account_number().await?,
                account_type: request.account_type.clone(),
                balance: request.initial_deposit,
                created_at: Utc::now(),
                active: true,
                customer_id: request.customer_id,
            };

            match self.repo.insert(&account).await {
                Ok(account) => {
                    tracing::info!(
                        account_id = %account.id,
                        account_number = %account.account_number,
                        "account created"
                    );
                    return Ok(account);
                },
                Err(ServerError::AccountNumberTaken) => {
                    tracing::warn!(
                        attempt,
                        "account number taken by a concurrent creation"
                    );
                    telemetry::record_number_collision(CollisionStage::Insert);
                },
                Err(err) => return Err(err),
            }
        }

        Err(ServerError::AccountNumberExhausted {
            attempts: self.max_number_attempts,
        })
    }

    /// Find an active account.
    ///
    /// Missing and inactive accounts both give
    /// [`ServerError::AccountNotFound`].
    pub async fn get_account(&self, id: Uuid) -> Result<Account> {
        tracing::info!(account_id = %id, "looking up account");

        self.repo
            .find_active_by_id(id)
            .await?
            .ok_or(ServerError::AccountNotFound)
    }

    /// Balance of an active account.
    pub async fn get_balance(&self, id: Uuid) -> Result<Decimal> {
        tracing::info!(account_id = %id, "looking up balance");

        self.repo
            .find_active_by_id(id)
            .await?
            .map(|account| account.balance)
            .ok_or(ServerError::AccountNotFound)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::account::{MemoryAccountRepository, is_account_number};

    fn open(account_type: &str, deposit: &str) -> OpenAccount {
        OpenAccount {
            account_type: account_type.into(),
            initial_deposit: Decimal::from_str(deposit).unwrap(),
            customer_id: Uuid::new_v4(),
        }
    }

    fn service() -> (AccountService, MemoryAccountRepository) {
        let repo = MemoryAccountRepository::new();
        (AccountService::new(Arc::new(repo.clone())), repo)
    }

    /// Storage where every number is already used.
    struct FullRepository {
        checks: AtomicU32,
    }

    #[async_trait]
    impl AccountRepository for FullRepository {
        async fn insert(&self, _account: &NewAccount) -> Result<Account> {
            panic!("insert must not be reached");
        }

        async fn find_active_by_id(&self, _id: Uuid) -> Result<Option<Account>> {
            Ok(None)
        }

        async fn exists_by_account_number(&self, _number: &str) -> Result<bool> {
            self.checks.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        }
    }

    /// Storage whose first inserts lose a race on the account number.
    struct RacingRepository {
        inner: MemoryAccountRepository,
        collisions: AtomicU32,
    }

    #[async_trait]
    impl AccountRepository for RacingRepository {
        async fn insert(&self, account: &NewAccount) -> Result<Account> {
            if self.collisions.load(Ordering::SeqCst) > 0 {
                self.collisions.fetch_sub(1, Ordering::SeqCst);
                return Err(ServerError::AccountNumberTaken);
            }
            self.inner.insert(account).await
        }

        async fn find_active_by_id(&self, id: Uuid) -> Result<Option<Account>> {
            self.inner.find_active_by_id(id).await
        }

        async fn exists_by_account_number(&self, number: &str) -> Result<bool> {
            self.inner.exists_by_account_number(number).await
        }
    }

    #[tokio::test]
    async fn test_create_account() {
        let (service, repo) = service();
        let request = open("savings", "1000.00");

        let account = service.create_account(request.clone()).await.unwrap();

        assert!(is_account_number(&account.account_number));
        assert_eq!(account.account_type, "savings");
        assert_eq!(account.balance, request.initial_deposit);
        assert_eq!(account.balance.to_string(), "1000.00");
        assert_eq!(account.customer_id, request.customer_id);
        assert!(account.active);
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_create_rejects_non_positive_deposit() {
        let (service, repo) = service();

        for deposit in ["0", "0.00", "-10.50"] {
            let err = service
                .create_account(open("savings", deposit))
                .await
                .unwrap_err();
            assert!(matches!(err, ServerError::InvalidDeposit(_)));
        }

        assert_eq!(repo.len().await, 0);
    }

    #[tokio::test]
    async fn test_create_rejects_blank_type() {
        let (service, repo) = service();
        let err = service.create_account(open("  ", "10")).await.unwrap_err();

        assert!(matches!(err, ServerError::InvalidAccountType));
        assert_eq!(repo.len().await, 0);
    }

    #[tokio::test]
    async fn test_one_account_per_customer() {
        let (service, _) = service();
        let first = open("savings", "10");
        let mut second = open("checking", "20");
        second.customer_id = first.customer_id;

        service.create_account(first).await.unwrap();
        let err = service.create_account(second).await.unwrap_err();

        assert!(matches!(err, ServerError::CustomerAlreadyHasAccount));
    }

    #[tokio::test]
    async fn test_account_numbers_are_unique() {
        let (service, _) = service();
        let mut numbers = HashSet::new();

        for _ in 0..200 {
            let account =
                service.create_account(open("savings", "1")).await.unwrap();
            assert!(numbers.insert(account.account_number));
        }
    }

    #[tokio::test]
    async fn test_concurrent_creations_get_distinct_numbers() {
        let (service, repo) = service();

        let handles = (0..32)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move {
                    service.create_account(open("savings", "5")).await
                })
            })
            .collect::<Vec<_>>();

        let mut numbers = HashSet::new();
        for handle in handles {
            let account = handle.await.unwrap().unwrap();
            assert!(numbers.insert(account.account_number));
        }
        assert_eq!(repo.len().await, 32);
    }

    #[tokio::test]
    async fn test_insert_collision_is_retried() {
        let repo = Arc::new(RacingRepository {
            inner: MemoryAccountRepository::new(),
            collisions: AtomicU32::new(2),
        });
        let service = AccountService::new(repo.clone());

        let account = service.create_account(open("savings", "1")).await.unwrap();

        assert_eq!(repo.collisions.load(Ordering::SeqCst), 0);
        assert_eq!(repo.inner.len().await, 1);
        assert!(is_account_number(&account.account_number));
    }

    #[tokio::test]
    async fn test_insert_collisions_are_capped() {
        let repo = Arc::new(RacingRepository {
            inner: MemoryAccountRepository::new(),
            collisions: AtomicU32::new(u32::MAX),
        });
        let service = AccountService::new(repo.clone()).max_number_attempts(3);

        let err = service.create_account(open("savings", "1")).await.unwrap_err();

        assert!(matches!(
            err,
            ServerError::AccountNumberExhausted { attempts: 3 }
        ));
        assert_eq!(repo.inner.len().await, 0);
    }

    #[tokio::test]
    async fn test_creation_metrics() {
        use metrics_exporter_prometheus::PrometheusBuilder;

        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let _guard = metrics::set_default_local_recorder(&recorder);

        let repo = Arc::new(RacingRepository {
            inner: MemoryAccountRepository::new(),
            collisions: AtomicU32::new(1),
        });
        let service = AccountService::new(repo);

        service.create_account(open("savings", "1")).await.unwrap();
        service.create_account(open("", "1")).await.unwrap_err();

        let rendered = handle.render();
        assert!(rendered.contains(r#"account_creations_total{outcome="created"} 1"#));
        assert!(rendered.contains(r#"account_creations_total{outcome="rejected"} 1"#));
        assert!(rendered.contains(r#"account_number_collisions_total{stage="insert"} 1"#));
    }

    #[tokio::test]
    async fn test_generator_gives_up() {
        let repo = Arc::new(FullRepository {
            checks: AtomicU32::new(0),
        });
        let service = AccountService::new(repo.clone()).max_number_attempts(4);

        let err = service.create_account(open("savings", "1")).await.unwrap_err();

        assert!(matches!(
            err,
            ServerError::AccountNumberExhausted { attempts: 4 }
        ));
        assert_eq!(repo.checks.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_get_account_and_balance() {
        let (service, _) = service();
        let created = service
            .create_account(open("checking", "2500"))
            .await
            .unwrap();

        let first = service.get_account(created.id).await.unwrap();
        let second = service.get_account(created.id).await.unwrap();
        assert_eq!(first, created);
        assert_eq!(first, second);

        let balance = service.get_balance(created.id).await.unwrap();
        assert_eq!(balance, Decimal::from(2500));
        assert_eq!(service.get_balance(created.id).await.unwrap(), balance);
    }

    #[tokio::test]
    async fn test_unknown_and_inactive_are_not_found() {
        let inactive = NewAccount {
            account_number: "0000000007".into(),
            account_type: "savings".into(),
            balance: Decimal::from(10),
            created_at: Utc::now(),
            active: false,
            customer_id: Uuid::new_v4(),
        }
        .with_id(Uuid::new_v4());
        let repo = MemoryAccountRepository::with_accounts([inactive.clone()]);
        let service = AccountService::new(Arc::new(repo));

        for id in [inactive.id, Uuid::new_v4()] {
            assert!(matches!(
                service.get_account(id).await,
                Err(ServerError::AccountNotFound)
            ));
            assert!(matches!(
                service.get_balance(id).await,
                Err(ServerError::AccountNotFound)
            ));
        }
    }
}
