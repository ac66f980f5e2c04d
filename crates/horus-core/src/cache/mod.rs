//! Best-effort key/value cache service.
//!
//! The cache is a performance layer only: every value in it can be
//! reconstructed from the persistent store, and any cache failure is
//! logged and treated as a miss, never surfaced to the caller.

mod coordinator;

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use miette::Diagnostic;
use thiserror::Error;

pub use coordinator::CacheAside;

/// A failed cache round trip. Non-fatal by contract.
#[derive(Error, Diagnostic, Debug)]
#[error("Cache operation failed: {0}")]
#[diagnostic(code(horus::cache_backend))]
pub struct CacheError(pub String);

/// Key/value cache with a flush-all primitive.
pub trait Cache: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    fn set(&self, key: &str, value: &str) -> Result<(), CacheError>;
    fn flush(&self) -> Result<(), CacheError>;
}

/// Shared handle to a cache service.
pub type CacheHandle = Arc<dyn Cache>;

/// In-process cache backed by a hash map.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let entries = self
            .entries
            .lock()
            .map_err(|err| CacheError(err.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|err| CacheError(err.to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn flush(&self) -> Result<(), CacheError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|err| CacheError(err.to_string()))?;
        entries.clear();
        Ok(())
    }
}
