//! Core library for the horus package registry.
//!
//! This crate implements the registry's ingestion and catalog pipeline:
//! validating candidate packages (remote clone or uploaded archive),
//! materializing a canonical gzip'd tar artifact with a SHA-256 content
//! hash, deciding create-vs-update-vs-conflict against the persistent
//! store, and deriving the catalog list/index pair clients use to sync.
//!
//! The HTTP layer, authentication, and mail delivery live elsewhere; they
//! consume this crate through [`registry::Registry`].

use error::HorusError;

pub mod cache;
pub mod catalog;
pub mod constants;
pub mod error;
pub mod manifest;
pub mod metrics;
pub mod publish;
pub mod registry;
pub mod tarball;
pub mod validate;

pub type HorusResult<T> = std::result::Result<T, HorusError>;
