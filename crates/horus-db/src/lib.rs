//! Persistent store for the horus package registry.
//!
//! Two record kinds are stored: [`models::Package`] (one row per registered
//! name) and [`models::Tarball`] (one row per published version, holding the
//! compressed artifact bytes). Uniqueness of `packages.name` and of
//! `(tarballs.package_id, tarballs.version)` is enforced by the database
//! itself; a duplicate insert surfaces as [`error::DbError::Duplicate`] so
//! that racing publishes of the same version cannot both succeed.

pub mod connection;
pub mod error;
pub mod migration;
pub mod models;
pub mod repository;
pub mod schema;

pub use connection::DbConnection;
pub use error::{DbError, DbResult};
pub use repository::{RegistryRepository, SortDirection, SortField};
