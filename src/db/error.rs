use crate::models::types::LocationId;
use deadpool_postgres::{BuildError, PoolError};
use thiserror::Error;
use tokio_postgres::error::SqlState;

// DbError is the lowest level error type, wrapping errors from the database layer. It does not wrap
// any higher level errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Unique constraint violation
    #[error("unique violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("foreign key violation: {0}")]
    ForeignKey(String),

    /// Check constraint violation
    #[error("check violation: {0}")]
    Check(String),

    /// Re-parenting would close a loop in the location tree
    #[error("location {id} is an ancestor of {parent_id}")]
    Cycle { id: LocationId, parent_id: LocationId },

    /// Timeout error
    #[error("timeout")]
    Timeout,

    /// Serialization failure or deadlock; the transaction was rolled back
    #[error("transaction conflict")]
    Conflict,

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Pg(tokio_postgres::Error),

    #[error(transparent)]
    Migrate(#[from] refinery::Error),

    #[error(transparent)]
    Build(#[from] BuildError),
}

impl DbError {
    pub fn is_transient(&self) -> bool {
        match self {
            DbError::Timeout | DbError::Conflict => true,
            DbError::Pool(PoolError::Timeout(_)) | DbError::Pool(PoolError::Closed) => true,
            DbError::Pool(PoolError::Backend(e)) => e.is_closed(),
            DbError::Pg(e) => e.is_closed(),
            _ => false,
        }
    }
}

impl From<tokio_postgres::Error> for DbError {
    fn from(e: tokio_postgres::Error) -> Self {
        let Some(db) = e.as_db_error() else {
            return DbError::Pg(e);
        };

        let what = db
            .constraint()
            .or_else(|| db.column())
            .unwrap_or_else(|| db.table().unwrap_or("record"))
            .to_string();

        let code = db.code();
        if *code == SqlState::UNIQUE_VIOLATION {
            DbError::UniqueViolation(what)
        } else if *code == SqlState::FOREIGN_KEY_VIOLATION {
            DbError::ForeignKey(what)
        } else if *code == SqlState::CHECK_VIOLATION {
            DbError::Check(what)
        } else if *code == SqlState::T_R_SERIALIZATION_FAILURE || *code == SqlState::T_R_DEADLOCK_DETECTED {
            DbError::Conflict
        } else if *code == SqlState::QUERY_CANCELED {
            DbError::Timeout
        } else {
            DbError::Pg(e)
        }
    }
}
