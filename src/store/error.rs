//! Store Errors

use std::fmt;

pub type StoreResult<T> = Result<T, StoreError>;

/// Column protected by a unique constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Username,
    Email,
}

impl fmt::Display for UniqueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Username => f.write_str("username"),
            Self::Email => f.write_str("email"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A row changed since it was read (optimistic locking)
    #[error("Concurrent modification detected")]
    Conflict,

    #[error("Unique constraint violated on {0}")]
    UniqueViolation(UniqueField),

    /// The store refused a value supplied by the caller
    #[error("{0}")]
    Rejected(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const UNIQUE_VIOLATION: &str = "23505";
const STRING_DATA_RIGHT_TRUNCATION: &str = "22001";
const CHECK_VIOLATION: &str = "23514";

/// Map a PostgreSQL SQLSTATE (and violated constraint, if any) to a store error
fn from_sqlstate(code: &str, constraint: &str) -> Option<StoreError> {
    match code {
        SERIALIZATION_FAILURE | DEADLOCK_DETECTED => Some(StoreError::Conflict),
        UNIQUE_VIOLATION if constraint.contains("email") => {
            Some(StoreError::UniqueViolation(UniqueField::Email))
        }
        UNIQUE_VIOLATION if constraint.contains("username") => {
            Some(StoreError::UniqueViolation(UniqueField::Username))
        }
        STRING_DATA_RIGHT_TRUNCATION => Some(StoreError::Rejected(
            "A field exceeds its maximum length".to_string(),
        )),
        CHECK_VIOLATION => Some(StoreError::Rejected(format!(
            "Value violates constraint {}",
            constraint
        ))),
        _ => None,
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let code = db_err.code().map(|code| code.into_owned()).unwrap_or_default();
            let constraint = db_err.constraint().unwrap_or_default();

            if let Some(mapped) = from_sqlstate(&code, constraint) {
                return mapped;
            }
        }

        if matches!(
            err,
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
        ) {
            return Self::Unavailable(err.to_string());
        }

        Self::Database(err)
    }
}
