//! Error types for horus-core.

use horus_config::error::ConfigError;
use horus_db::error::DbError;
use horus_utils::error::FileSystemError;
use miette::Diagnostic;
use thiserror::Error;

use crate::cache::CacheError;

/// Core error type for registry operations.
///
/// One variant per entry of the registry's error taxonomy; callers match on
/// variants, never on message text.
#[derive(Error, Diagnostic, Debug)]
pub enum HorusError {
    #[error("Invalid package name. {0}")]
    #[diagnostic(code(horus::invalid_name))]
    InvalidName(String),

    #[error("Invalid URL: {0}")]
    #[diagnostic(
        code(horus::invalid_url),
        help("Ensure the repository URL is valid and reachable")
    )]
    InvalidUrl(String),

    #[error("Failed to clone repository: {0}")]
    #[diagnostic(
        code(horus::clone_failed),
        help("Verify the repository URL is correct and accessible")
    )]
    CloneFailed(String),

    #[error("{0}")]
    #[diagnostic(
        code(horus::missing_manifest),
        help("Every package must carry a horus.json manifest")
    )]
    MissingManifest(String),

    #[error("Package can't be bigger than {limit} bytes")]
    #[diagnostic(code(horus::too_large))]
    TooLarge { limit: u64 },

    #[error("Version already exists")]
    #[diagnostic(
        code(horus::version_exists),
        help("Published versions are immutable; bump the version instead")
    )]
    VersionExists,

    #[error("{0}")]
    #[diagnostic(code(horus::not_owner))]
    NotOwner(String),

    #[error("{0}")]
    #[diagnostic(code(horus::not_found))]
    NotFound(String),

    #[error("{0}")]
    #[diagnostic(code(horus::validation))]
    ValidationError(String),

    #[error(transparent)]
    #[diagnostic(code(horus::store))]
    StoreError(#[from] DbError),

    #[error(transparent)]
    #[diagnostic(code(horus::cache))]
    CacheError(#[from] CacheError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(code(horus::fs))]
    FileSystemError(#[from] FileSystemError),

    #[error("Error while {action}: {source}")]
    #[diagnostic(code(horus::io), help("Check file permissions and disk space"))]
    IoError {
        action: String,
        #[source]
        source: std::io::Error,
    },
}

impl HorusError {
    /// Whether the failure is the caller's to fix (4xx-equivalent) rather
    /// than an internal fault.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            HorusError::InvalidName(_)
                | HorusError::InvalidUrl(_)
                | HorusError::CloneFailed(_)
                | HorusError::MissingManifest(_)
                | HorusError::TooLarge { .. }
                | HorusError::VersionExists
                | HorusError::NotOwner(_)
                | HorusError::NotFound(_)
                | HorusError::ValidationError(_)
        )
    }
}

/// Extension trait for adding an action description to I/O errors.
pub trait ErrorContext<T> {
    fn with_context<F>(self, action: F) -> Result<T, HorusError>
    where
        F: FnOnce() -> String;
}

impl<T> ErrorContext<T> for Result<T, std::io::Error> {
    fn with_context<F>(self, action: F) -> Result<T, HorusError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|source| HorusError::IoError {
            action: action(),
            source,
        })
    }
}
