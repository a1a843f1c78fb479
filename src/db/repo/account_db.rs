use crate::db::repo::account::AccountRepo;
use crate::db::{Db, DbResult, map_row_opt};
use crate::models::account::{Account, AccountCredentials};
use crate::models::types::AccountId;
use std::sync::Arc;

pub struct AccountRepository {
    db: Arc<Db>,
}

impl AccountRepository {
    pub fn new(db: Arc<Db>) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl AccountRepo for AccountRepository {
    async fn insert_account(&self, username: &str, password_hash: &str) -> DbResult<Account> {
        let client = self.db.get_client().await?;

        let stmt = client
            .prepare_cached(
                r#"
                INSERT INTO users (username, password_hash)
                VALUES ($1, $2)
                RETURNING id, username
                "#,
            )
            .await?;

        let row = client.query_one(&stmt, &[&username, &password_hash]).await?;
        Account::try_from_row(&row)
    }

    async fn get_credentials(&self, username: &str) -> DbResult<Option<AccountCredentials>> {
        let client = self.db.get_client().await?;

        let stmt = client
            .prepare_cached("SELECT id, username, password_hash FROM users WHERE username = $1")
            .await?;

        let row_opt = client.query_opt(&stmt, &[&username]).await?;
        map_row_opt(
            row_opt,
            AccountCredentials::try_from_row,
            &format!("AccountRepo::get_credentials username={}", username),
        )
    }

    async fn get_by_id(&self, account_id: AccountId) -> DbResult<Option<Account>> {
        let client = self.db.get_client().await?;

        let stmt = client
            .prepare_cached("SELECT id, username FROM users WHERE id = $1")
            .await?;

        let row_opt = client.query_opt(&stmt, &[&account_id]).await?;
        map_row_opt(
            row_opt,
            Account::try_from_row,
            &format!("AccountRepo::get_by_id id={}", account_id),
        )
    }

    async fn count_username(&self, username: &str) -> DbResult<i64> {
        let client = self.db.get_client().await?;

        let row = client
            .query_one("SELECT COUNT(*) FROM users WHERE username = $1", &[&username])
            .await?;
        Ok(row.try_get(0)?)
    }
}
