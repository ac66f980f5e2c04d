/// Manifest file every package must carry.
pub const MANIFEST_FILE: &str = "horus.json";

/// Subdirectory convention for repositories that are not packages themselves.
pub const HORUS_SUBDIR: &str = ".horus";

/// Cache key of the full catalog list artifact.
pub const CACHE_KEY_LIST: &str = "packages:list";

/// Cache key of the catalog byte-offset index artifact.
pub const CACHE_KEY_INDEX: &str = "packages:index";

/// Packages per page in paged listings, and the search default.
pub const PAGE_LENGTH: i64 = 20;

/// Highest accepted page number.
pub const MAX_PAGE: i64 = 1000;

/// Highest accepted search page size.
pub const MAX_PER_PAGE: i64 = 100;
