use std::{process::Stdio, time::Duration};

use horus_config::Config;
use tokio::process::Command;
use tracing::debug;
use url::Url;

use crate::{error::HorusError, HorusResult};

/// Normalizes a repository URL.
///
/// SSH shorthands (`user@host:path`) are understood, and GitHub URLs in any
/// form are rewritten to the canonical `https://github.com/<path>.git`.
/// URLs for other hosts pass through unchanged. When
/// `skip_url_normalization` is set, the input is returned as-is.
pub fn normalize_url(supplied: &str, config: &Config) -> HorusResult<String> {
    if config.skip_url_normalization {
        return Ok(supplied.to_string());
    }

    let (host, path) = match Url::parse(supplied) {
        Ok(parsed) => {
            let host = parsed
                .host_str()
                .ok_or_else(|| HorusError::InvalidUrl(supplied.to_string()))?
                .to_string();
            (host, parsed.path().to_string())
        }
        // no scheme: try the `user@host:path` ssh shorthand
        Err(_) => parse_ssh_shorthand(supplied)
            .ok_or_else(|| HorusError::InvalidUrl(supplied.to_string()))?,
    };

    if host == "github.com" || host == "www.github.com" {
        let path = path.trim_end_matches('/');
        let ext = if path.ends_with(".git") { "" } else { ".git" };
        return Ok(format!("https://github.com{path}{ext}"));
    }

    Ok(supplied.to_string())
}

fn parse_ssh_shorthand(supplied: &str) -> Option<(String, String)> {
    let (_user, rest) = supplied.split_once('@')?;
    let (host, path) = rest.split_once(':')?;
    if host.is_empty() || path.is_empty() {
        return None;
    }
    Some((host.to_string(), format!("/{path}")))
}

/// Probes a repository URL with `git ls-remote` under a hard timeout.
///
/// The URL is passed as a single argument vector entry, never through a
/// shell, so metacharacters cannot be interpreted. Returns `true` iff the
/// probe exits successfully. When `skip_url_validation` is set, always
/// returns `true`.
pub async fn validate_remote_url(url: &str, config: &Config) -> bool {
    if config.skip_url_validation {
        return true;
    }

    let child = Command::new("git")
        .arg("ls-remote")
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn();

    let mut child = match child {
        Ok(child) => child,
        Err(err) => {
            debug!("failed to spawn git ls-remote: {err}");
            return false;
        }
    };

    match tokio::time::timeout(
        Duration::from_secs(config.url_probe_timeout),
        child.wait(),
    )
    .await
    {
        Ok(Ok(status)) => status.success(),
        Ok(Err(err)) => {
            debug!("failed to wait for git ls-remote: {err}");
            false
        }
        Err(_) => {
            debug!("git ls-remote probe timed out after {}s", config.url_probe_timeout);
            let _ = child.kill().await;
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::default()
    }

    #[test]
    fn test_ssh_shorthand_rewritten_to_canonical_github() {
        assert_eq!(
            normalize_url("git@github.com:org/repo", &config()).unwrap(),
            "https://github.com/org/repo.git"
        );
    }

    #[test]
    fn test_https_github_gets_git_suffix_and_no_trailing_slash() {
        assert_eq!(
            normalize_url("https://github.com/org/repo/", &config()).unwrap(),
            "https://github.com/org/repo.git"
        );
        assert_eq!(
            normalize_url("https://www.github.com/org/repo", &config()).unwrap(),
            "https://github.com/org/repo.git"
        );
        // already canonical: unchanged
        assert_eq!(
            normalize_url("https://github.com/org/repo.git", &config()).unwrap(),
            "https://github.com/org/repo.git"
        );
    }

    #[test]
    fn test_non_github_host_passes_through() {
        assert_eq!(
            normalize_url("https://gitlab.com/org/repo.git", &config()).unwrap(),
            "https://gitlab.com/org/repo.git"
        );
        assert_eq!(
            normalize_url("git@bitbucket.org:org/repo", &config()).unwrap(),
            "git@bitbucket.org:org/repo"
        );
    }

    #[test]
    fn test_skip_normalization_returns_input() {
        let config = Config {
            skip_url_normalization: true,
            ..Config::default()
        };
        assert_eq!(
            normalize_url("git@github.com:org/repo", &config).unwrap(),
            "git@github.com:org/repo"
        );
    }

    #[test]
    fn test_unparseable_input_rejected() {
        assert!(matches!(
            normalize_url("not a url at all", &config()).unwrap_err(),
            HorusError::InvalidUrl(_)
        ));
    }

    #[tokio::test]
    async fn test_probe_skipped_when_validation_disabled() {
        let config = Config {
            skip_url_validation: true,
            ..Config::default()
        };
        assert!(validate_remote_url("definitely-not-a-repo", &config).await);
    }

    #[tokio::test]
    async fn test_probe_fails_for_nonexistent_repo() {
        let config = Config {
            url_probe_timeout: 5,
            ..Config::default()
        };
        assert!(!validate_remote_url("/nonexistent/horus/repo", &config).await);
    }

    #[tokio::test]
    async fn test_shell_metacharacters_are_not_interpreted() {
        let config = Config {
            url_probe_timeout: 5,
            ..Config::default()
        };
        // the whole string is one argv entry and fails as an invalid remote
        assert!(!validate_remote_url("/nonexistent/repo; rm -rf /", &config).await);
    }
}
