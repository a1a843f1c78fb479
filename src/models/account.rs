use crate::db::DbResult;
use crate::error::{AppResult, DomainError};
use crate::models::types::AccountId;
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 50;
pub const PASSWORD_MAX_BYTES: usize = 1024;

/// Public view of an account. The password hash never leaves the store layer
/// through this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique Account ID
    pub id: AccountId,
    /// Username (distinct, case-sensitive)
    pub username: String,
}

/// Account row including the stored hash, used only for password checks.
#[derive(Debug, Clone)]
pub struct AccountCredentials {
    pub account: Account,
    /// Hashed password (argon2, PHC string)
    pub password_hash: String,
}

impl Account {
    pub fn try_from_row(row: &Row) -> DbResult<Self> {
        Ok(Self {
            id: row.try_get::<_, AccountId>("id")?,
            username: row.try_get("username")?,
        })
    }

    pub fn validate_username(s: &str) -> AppResult<()> {
        let len = s.chars().count();
        if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
            return Err(DomainError::validation(
                "username",
                format!("must be between {USERNAME_MIN_LEN} and {USERNAME_MAX_LEN} characters"),
            ));
        }
        if s.trim() != s {
            return Err(DomainError::validation(
                "username",
                "cannot start or end with whitespace",
            ));
        }
        if s.chars().any(char::is_control) {
            return Err(DomainError::validation("username", "cannot contain control characters"));
        }
        Ok(())
    }

    pub fn validate_password(s: &str) -> AppResult<()> {
        if s.is_empty() {
            return Err(DomainError::validation("password", "cannot be empty"));
        }
        if s.len() > PASSWORD_MAX_BYTES {
            return Err(DomainError::validation("password", "too long"));
        }
        Ok(())
    }
}

impl AccountCredentials {
    pub fn try_from_row(row: &Row) -> DbResult<Self> {
        Ok(Self {
            account: Account::try_from_row(row)?,
            password_hash: row.try_get("password_hash")?,
        })
    }
}
