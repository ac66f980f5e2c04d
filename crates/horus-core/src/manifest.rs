//! The `horus.json` package descriptor.
//!
//! Manifests are decoded strictly as data. Nothing inside a cloned
//! repository or uploaded archive is ever executed.

use std::{collections::BTreeMap, path::Path};

use serde::Deserialize;

/// Parsed contents of a `horus.json` file.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    pub name: Option<String>,
    pub version: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub repository: Option<Repository>,
    #[serde(default)]
    pub dependencies: Option<BTreeMap<String, String>>,
}

/// The `repository` field accepts either a bare URL string or an object
/// with a `url` key.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Repository {
    Url(String),
    Detailed { url: String },
}

impl Manifest {
    /// Reads and decodes a manifest, returning `None` when the file is
    /// absent or not valid structured data.
    pub fn read(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Dependency strings in `<name> <range>` form, name-ascending.
    pub fn depends(&self) -> Vec<String> {
        self.dependencies
            .as_ref()
            .map(|deps| {
                deps.iter()
                    .map(|(name, range)| format!("{name} {range}"))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The repository URL, whichever form it was given in.
    pub fn repository_url(&self) -> Option<&str> {
        match self.repository.as_ref()? {
            Repository::Url(url) => Some(url),
            Repository::Detailed { url } => Some(url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_manifest() {
        let manifest: Manifest = serde_json::from_str(
            r#"{
                "name": "health",
                "version": "1.0",
                "description": "system health checks",
                "tags": ["monitoring", "cli"],
                "repository": { "url": "https://github.com/org/health.git" },
                "dependencies": { "curl": ">=7.0", "awk": "*" }
            }"#,
        )
        .unwrap();

        assert_eq!(manifest.name.as_deref(), Some("health"));
        assert_eq!(manifest.version.as_deref(), Some("1.0"));
        assert_eq!(
            manifest.repository_url(),
            Some("https://github.com/org/health.git")
        );
        // BTreeMap keeps depends deterministic
        assert_eq!(manifest.depends(), vec!["awk *", "curl >=7.0"]);
    }

    #[test]
    fn test_repository_as_bare_string() {
        let manifest: Manifest = serde_json::from_str(
            r#"{ "name": "health", "version": "1.0", "repository": "git@github.com:org/health" }"#,
        )
        .unwrap();
        assert_eq!(manifest.repository_url(), Some("git@github.com:org/health"));
    }

    #[test]
    fn test_minimal_manifest() {
        let manifest: Manifest = serde_json::from_str(r#"{}"#).unwrap();
        assert!(manifest.name.is_none());
        assert!(manifest.version.is_none());
        assert!(manifest.depends().is_empty());
        assert!(manifest.repository_url().is_none());
    }

    #[test]
    fn test_read_rejects_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("horus.json");
        std::fs::write(&path, "module.exports = {name: 'health'}").unwrap();
        assert!(Manifest::read(&path).is_none());
        assert!(Manifest::read(&dir.path().join("missing.json")).is_none());
    }
}
