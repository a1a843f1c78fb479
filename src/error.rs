use crate::db::error::DbError;
use thiserror::Error;

pub type AppResult<T> = Result<T, DomainError>;

#[derive(Debug, Error)]
pub enum DomainError {
    /// Malformed or out-of-range input, detected before any store access
    #[error("validation failed: {field}: {message}")]
    Validation { field: &'static str, message: String },

    /// A foreign-key or uniqueness rule rejected the write
    #[error("integrity violation: {0}")]
    IntegrityViolation(String),

    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// A partial update that carried no fields
    #[error("no update fields provided")]
    EmptyUpdate,

    /// A location may not be its own parent
    #[error("location {0} cannot be its own parent")]
    SelfParent(i64),

    /// The new parent lives somewhere below the location being moved
    #[error("location {id} cannot be placed inside its own descendant {parent_id}")]
    ParentCycle { id: i64, parent_id: i64 },

    #[error("username already exists")]
    DuplicateUsername,

    #[error("unauthenticated")]
    Unauthenticated,

    /// Timeout, connection loss or serialization conflict. Safe to retry.
    #[error("store temporarily unavailable")]
    TransientStore(#[source] DbError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl Into<i64>) -> Self {
        Self::NotFound { entity, id: id.into() }
    }

    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Only store hiccups may be retried by the caller; everything else is final.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientStore(_))
    }

    /// Machine readable kind, as sent to clients.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_failure",
            Self::IntegrityViolation(_) => "integrity_violation",
            Self::NotFound { .. } => "not_found",
            Self::EmptyUpdate => "empty_update",
            Self::SelfParent(_) => "self_parent",
            Self::ParentCycle { .. } => "parent_cycle",
            Self::DuplicateUsername => "duplicate_username",
            Self::Unauthenticated => "unauthenticated",
            Self::TransientStore(_) => "transient_store_failure",
            Self::Internal(_) => "internal_failure",
        }
    }
}

impl From<DbError> for DomainError {
    fn from(e: DbError) -> Self {
        if e.is_transient() {
            return DomainError::TransientStore(e);
        }

        // constraint names stay in the log
        match e {
            DbError::UniqueViolation(what) => {
                tracing::debug!(constraint = %what, "unique violation");
                DomainError::IntegrityViolation("value already exists".into())
            }
            DbError::ForeignKey(what) => {
                tracing::debug!(constraint = %what, "foreign key violation");
                DomainError::IntegrityViolation("referenced location does not exist".into())
            }
            DbError::Check(what) => {
                tracing::debug!(constraint = %what, "check violation");
                DomainError::IntegrityViolation("value rejected by a store constraint".into())
            }
            DbError::Cycle { id, parent_id } => DomainError::ParentCycle {
                id: id.into(),
                parent_id: parent_id.into(),
            },
            other => DomainError::Internal(other.to_string()),
        }
    }
}

impl From<password_hash::Error> for DomainError {
    fn from(e: password_hash::Error) -> Self {
        DomainError::Internal(format!("password hashing: {e}"))
    }
}

#[derive(Debug, Error)]
pub enum ConfigErrorKind {
    #[error("failed to read file: {0}")]
    Read(std::io::Error),

    #[error("failed to parse file: {0}")]
    Parse(toml::de::Error),

    #[error("invalid environment variable {0}: {1}")]
    InvalidEnv(String, String),
}

#[derive(Debug, Error)]
pub enum InfraError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("invalid configuration in {path}: {source}")]
    Config {
        path: std::path::PathBuf,
        #[source]
        source: ConfigErrorKind,
    },

    #[error("invalid configuration: {0}")]
    Env(ConfigErrorKind),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Reasons a bearer token is refused. These never reach a client; the
/// boundary collapses every variant into `DomainError::Unauthenticated`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing bearer token")]
    Missing,
    #[error("malformed token")]
    Malformed,
    #[error("unsupported token algorithm")]
    UnsupportedAlgorithm,
    #[error("bad signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("account no longer exists")]
    UnknownAccount,
}

impl From<AuthError> for DomainError {
    fn from(_: AuthError) -> Self {
        DomainError::Unauthenticated
    }
}
