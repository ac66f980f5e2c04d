//! Operation counters.
//!
//! The collector is owned by the [`Registry`](crate::registry::Registry)
//! handle and passed into whatever surfaces need it; nothing here is
//! process-global.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Default)]
pub struct ErrorCounters {
    pub not_found: AtomicU64,
    pub not_authorized: AtomicU64,
    pub bad_name: AtomicU64,
    pub bad_url: AtomicU64,
    pub query: AtomicU64,
    pub other: AtomicU64,
}

/// Per-operation tallies for the registry, plus the start timestamp.
#[derive(Debug)]
pub struct Metrics {
    pub started_at: DateTime<Utc>,
    pub get_package: AtomicU64,
    pub download_package: AtomicU64,
    pub search_package: AtomicU64,
    pub create_package: AtomicU64,
    pub remove_package: AtomicU64,
    pub all_packages: AtomicU64,
    pub get_package_list: AtomicU64,
    pub get_package_index: AtomicU64,
    pub errors: ErrorCounters,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            started_at: Utc::now(),
            get_package: AtomicU64::new(0),
            download_package: AtomicU64::new(0),
            search_package: AtomicU64::new(0),
            create_package: AtomicU64::new(0),
            remove_package: AtomicU64::new(0),
            all_packages: AtomicU64::new(0),
            get_package_list: AtomicU64::new(0),
            get_package_index: AtomicU64::new(0),
            errors: ErrorCounters::default(),
        }
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point-in-time copy of every counter, for status reporting.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            started_at: self.started_at.to_rfc3339(),
            get_package: self.get_package.load(Ordering::Relaxed),
            download_package: self.download_package.load(Ordering::Relaxed),
            search_package: self.search_package.load(Ordering::Relaxed),
            create_package: self.create_package.load(Ordering::Relaxed),
            remove_package: self.remove_package.load(Ordering::Relaxed),
            all_packages: self.all_packages.load(Ordering::Relaxed),
            get_package_list: self.get_package_list.load(Ordering::Relaxed),
            get_package_index: self.get_package_index.load(Ordering::Relaxed),
            errors: ErrorSnapshot {
                not_found: self.errors.not_found.load(Ordering::Relaxed),
                not_authorized: self.errors.not_authorized.load(Ordering::Relaxed),
                bad_name: self.errors.bad_name.load(Ordering::Relaxed),
                bad_url: self.errors.bad_url.load(Ordering::Relaxed),
                query: self.errors.query.load(Ordering::Relaxed),
                other: self.errors.other.load(Ordering::Relaxed),
            },
        }
    }
}

/// Increments a counter by one.
pub fn incr(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub started_at: String,
    pub get_package: u64,
    pub download_package: u64,
    pub search_package: u64,
    pub create_package: u64,
    pub remove_package: u64,
    pub all_packages: u64,
    pub get_package_list: u64,
    pub get_package_index: u64,
    pub errors: ErrorSnapshot,
}

#[derive(Debug, Serialize)]
pub struct ErrorSnapshot {
    pub not_found: u64,
    pub not_authorized: u64,
    pub bad_name: u64,
    pub bad_url: u64,
    pub query: u64,
    pub other: u64,
}
