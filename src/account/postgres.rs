//! PostgreSQL implementation for account repository.

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::account::{Account, AccountRepository, NewAccount};
use crate::error::{Result, ServerError};

const ACCOUNT_NUMBER_CONSTRAINT: &str = "accounts_account_number_key";
const CUSTOMER_ID_CONSTRAINT: &str = "accounts_customer_id_key";

/// PostgreSQL account repository.
#[derive(Clone)]
pub struct PgAccountRepository {
    pool: Pool<Postgres>,
}

impl PgAccountRepository {
    /// Create a new [`PgAccountRepository`].
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

/// Turn unique constraint violations into their domain errors.
fn map_insert_error(err: sqlx::Error) -> ServerError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            match db.constraint() {
                Some(ACCOUNT_NUMBER_CONSTRAINT) => {
                    return ServerError::AccountNumberTaken;
                },
                Some(CUSTOMER_ID_CONSTRAINT) => {
                    return ServerError::CustomerAlreadyHasAccount;
                },
                _ => (),
            }
        }
    }

    ServerError::Sql(err)
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn insert(&self, account: &NewAccount) -> Result<Account> {
        sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (
                account_number, account_type, balance,
                created_at, active, customer_id
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING
                id, account_number, account_type, balance,
                created_at, active, customer_id
            "#,
        )
        .bind(&account.account_number)
        .bind(&account.account_type)
        .bind(account.balance)
        .bind(account.created_at)
        .bind(account.active)
        .bind(account.customer_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_insert_error)
    }

    async fn find_active_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT
                id, account_number, account_type, balance,
                created_at, active, customer_id
            FROM accounts
            WHERE id = $1 AND active = TRUE
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn exists_by_account_number(
        &self,
        account_number: &str,
    ) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"SELECT EXISTS(SELECT 1 FROM accounts WHERE account_number = $1)"#,
        )
        .bind(account_number)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}
