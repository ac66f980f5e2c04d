//! Validation of user-supplied identifiers and repository URLs.

mod name;
mod url;

pub use name::validate_name;
pub use url::{normalize_url, validate_remote_url};
