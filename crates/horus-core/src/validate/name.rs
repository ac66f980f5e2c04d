use std::sync::LazyLock;

use regex::Regex;

use crate::{error::HorusError, HorusResult};

static CHARSET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._-]*$").expect("unable to compile name charset regex")
});

static CONSECUTIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[._-]{2,}").expect("unable to compile consecutive separator regex")
});

/// Validates a package (or user) name.
///
/// Names are 1 to 50 characters from `[A-Za-z0-9._-]`, may not contain
/// consecutive dots, dashes, or underscores, and may not start or end with
/// one. All violated rules are reported together in a single message.
pub fn validate_name(name: &str) -> HorusResult<()> {
    let mut errors = Vec::new();

    if name.is_empty() || name.chars().count() > 50 {
        errors.push("be between 1 and 50 characters");
    }
    if !CHARSET_RE.is_match(name) {
        errors.push("only contain a through z, 0 through 9, dots, dashes, and underscores");
    }
    if CONSECUTIVE_RE.is_match(name) {
        errors.push("not have consecutive dashes, dots, or underscores");
    }
    if name.starts_with(['.', '_', '-']) || name.ends_with(['.', '_', '-']) {
        errors.push("not start or end with dashes, dots, or underscores");
    }

    if errors.is_empty() {
        return Ok(());
    }

    let mut parts: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    let last = parts.len() - 1;
    if last > 0 {
        parts[last] = format!("and must {}", parts[last]);
    }

    Err(HorusError::InvalidName(format!(
        "Package names must {}.",
        parts.join(", ")
    )))
}
