use crate::db::DbResult;
use crate::models::account::{Account, AccountCredentials};
use crate::models::types::AccountId;

#[async_trait::async_trait]
pub trait AccountRepo: Send + Sync {
    /// Stores a new account. Fails with `DbError::UniqueViolation` when the
    /// username is taken.
    async fn insert_account(&self, username: &str, password_hash: &str) -> DbResult<Account>;

    /// Exact, case-sensitive lookup including the password hash
    async fn get_credentials(&self, username: &str) -> DbResult<Option<AccountCredentials>>;

    async fn get_by_id(&self, account_id: AccountId) -> DbResult<Option<Account>>;

    /// Number of accounts holding this exact username (0 or 1)
    async fn count_username(&self, username: &str) -> DbResult<i64>;
}
