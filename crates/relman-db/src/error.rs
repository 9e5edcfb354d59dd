//! Database error types.

use sqlx::error::ErrorKind as SqlErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("duplicate: {0}")]
    Duplicate(String),

    #[error("foreign key violation: {0}")]
    ForeignKey(String),

    #[error("undecodable column value: {0}")]
    Decode(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

pub type DbResult<T> = std::result::Result<T, DbError>;

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            let detail = match db.constraint() {
                Some(constraint) => format!("{} ({constraint})", db.message()),
                None => db.message().to_string(),
            };
            match db.kind() {
                SqlErrorKind::UniqueViolation => return DbError::Duplicate(detail),
                SqlErrorKind::ForeignKeyViolation => return DbError::ForeignKey(detail),
                _ => {}
            }
        }
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound("row".to_string()),
            other => DbError::Database(other),
        }
    }
}

impl From<DbError> for relman_core::Error {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(what) => relman_core::Error::NotFound(what),
            DbError::Duplicate(detail) => relman_core::Error::Conflict(detail),
            DbError::ForeignKey(detail) => {
                relman_core::Error::Conflict(format!("still referenced: {detail}"))
            }
            other => relman_core::Error::Internal(other.to_string()),
        }
    }
}
