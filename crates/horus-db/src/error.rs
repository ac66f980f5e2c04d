//! Error types for horus-db.

use diesel::result::DatabaseErrorKind;
use miette::Diagnostic;
use thiserror::Error;

/// Database error type for registry store operations.
#[derive(Error, Diagnostic, Debug)]
pub enum DbError {
    #[error("Database connection failed: {0}")]
    #[diagnostic(
        code(horus_db::connection),
        help("Check if the database file exists and is accessible")
    )]
    ConnectionError(String),

    #[error("Database migration failed: {0}")]
    #[diagnostic(
        code(horus_db::migration),
        help("The database schema may be corrupted")
    )]
    MigrationError(String),

    #[error("Database query failed: {0}")]
    #[diagnostic(code(horus_db::query))]
    QueryError(String),

    #[error("{0}")]
    #[diagnostic(code(horus_db::validation))]
    ValidationError(String),

    #[error("Record already exists: {0}")]
    #[diagnostic(code(horus_db::duplicate))]
    Duplicate(String),

    #[error("Record not found: {0}")]
    #[diagnostic(code(horus_db::not_found))]
    NotFound(String),
}

impl From<diesel::result::Error> for DbError {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                DbError::Duplicate(info.message().to_string())
            }
            diesel::result::Error::NotFound => DbError::NotFound(err.to_string()),
            other => DbError::QueryError(other.to_string()),
        }
    }
}

/// A specialized Result type for store operations.
pub type DbResult<T> = std::result::Result<T, DbError>;
