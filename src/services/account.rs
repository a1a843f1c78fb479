use crate::db::error::DbError;
use crate::db::repo::AccountRepo;
use crate::error::{AppResult, DomainError};
use crate::models::account::Account;
use crate::models::types::AccountId;
use argon2::{Algorithm, Argon2, Params, Version};
use password_hash::rand_core::OsRng;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use std::sync::{Arc, OnceLock};

/// Credential store: registration and password checks.
///
/// Argon2 runs on the blocking pool so slow hashes never hold up a runtime
/// worker.
pub struct AccountService {
    repo: Arc<dyn AccountRepo>,
    argon: Argon2<'static>,
    /// Verified against when the username is unknown, so both failure paths
    /// pay for one argon2 run. Computed on first use.
    dummy_hash: Arc<OnceLock<Option<String>>>,
}

impl AccountService {
    /// Custom cost parameters (memory in KiB, iterations).
    pub fn with_params(repo: Arc<dyn AccountRepo>, params: Params) -> Self {
        Self {
            repo,
            argon: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            dummy_hash: Arc::new(OnceLock::new()),
        }
    }

    async fn blocking<T, F>(&self, f: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(Argon2<'static>) -> T + Send + 'static,
    {
        let argon = self.argon.clone();
        tokio::task::spawn_blocking(move || f(argon))
            .await
            .map_err(|e| DomainError::Internal(format!("password hashing task: {e}")))
    }

    pub async fn register(&self, username: &str, password: &str) -> AppResult<Account> {
        Account::validate_username(username)?;
        Account::validate_password(password)?;

        let password = password.to_owned();
        let hash = self
            .blocking(move |argon| {
                let salt = SaltString::generate(&mut OsRng);
                argon.hash_password(password.as_bytes(), &salt).map(|h| h.to_string())
            })
            .await??;

        match self.repo.insert_account(username, &hash).await {
            Ok(account) => {
                tracing::info!(account_id = %account.id, username = %account.username, "account registered");
                Ok(account)
            }
            Err(DbError::UniqueViolation(_)) => Err(DomainError::DuplicateUsername),
            Err(e) => Err(e.into()),
        }
    }

    /// Returns the account when the password matches. Unknown usernames and
    /// wrong passwords both yield `None`.
    pub async fn verify(&self, username: &str, password: &str) -> AppResult<Option<Account>> {
        let creds = self.repo.get_credentials(username).await?;
        let stored = creds.as_ref().map(|c| c.password_hash.clone());
        let dummy = self.dummy_hash.clone();
        let password = password.to_owned();

        let matched = self
            .blocking(move |argon| -> Result<bool, password_hash::Error> {
                let Some(stored) = stored else {
                    let dummy = dummy.get_or_init(|| {
                        let salt = SaltString::generate(&mut OsRng);
                        argon
                            .hash_password(b"kitbox-dummy-password", &salt)
                            .ok()
                            .map(|h| h.to_string())
                    });
                    if let Some(parsed) = dummy.as_deref().and_then(|d| PasswordHash::new(d).ok()) {
                        let _ = argon.verify_password(password.as_bytes(), &parsed);
                    }
                    return Ok(false);
                };
                let parsed = PasswordHash::new(&stored)?;
                Ok(argon.verify_password(password.as_bytes(), &parsed).is_ok())
            })
            .await??;

        match creds {
            Some(creds) if matched => Ok(Some(creds.account)),
            _ => {
                tracing::warn!(%username, "authentication failed");
                Ok(None)
            }
        }
    }

    pub async fn find_by_id(&self, account_id: AccountId) -> AppResult<Option<Account>> {
        Ok(self.repo.get_by_id(account_id).await?)
    }
}
