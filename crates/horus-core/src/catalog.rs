//! Catalog artifact generation.
//!
//! The catalog is a pair of plain-text documents derived from the store:
//! the *list*, a concatenation of one stanza per package at its latest
//! version, and the *index*, which maps each package to the byte range of
//! its stanza inside the list. Clients fetch the small index, then range
//! over the list. Both documents are always generated together so the
//! offsets can never refer to a different generation of the list.

use diesel::SqliteConnection;
use horus_db::repository::{RegistryRepository, SortDirection, SortField};

use crate::{error::HorusError, HorusResult};

/// One generation of the catalog pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogArtifact {
    pub list: String,
    pub index: String,
}

/// Builds the full catalog from the store, packages in name order.
///
/// Every package must have a tarball for its latest version; a package
/// without one means the store is inconsistent and the whole build is
/// aborted rather than serving a partial catalog.
pub fn build_catalog(conn: &mut SqliteConnection) -> HorusResult<CatalogArtifact> {
    let packages =
        RegistryRepository::list_packages(conn, SortField::Name, SortDirection::Asc, 0, None)?;

    let mut list = String::new();
    let mut index = String::new();

    for package in packages {
        let meta = RegistryRepository::find_tarball_meta(conn, &package.id, &package.latest_version)?
            .ok_or_else(|| {
                HorusError::NotFound(format!(
                    "Package version not found for {}@{}",
                    package.name, package.latest_version
                ))
            })?;

        // offsets are UTF-8 byte positions into the list document
        let first_byte = list.len();

        list.push_str(&format!("Package: {}\n", package.name));
        list.push_str(&format!(
            "Maintainer: {} <{}>\n",
            package.owner_name, package.owner_email
        ));
        list.push_str(&format!("Version: {}\n", package.latest_version));
        list.push_str(&format!("Description: {}\n", package.description));
        list.push_str(&format!(
            "Depends: {}\n",
            meta.depends.as_deref().unwrap_or_default().join(", ")
        ));
        list.push_str(&format!(
            "Tags: {}\n",
            package.tags.as_deref().unwrap_or_default().join(", ")
        ));
        list.push_str(&format!("Url: {}\n", package.url));
        list.push_str(&format!("Size: {}\n", meta.size));
        list.push_str(&format!("SHA256: {}\n", meta.hash));
        list.push('\n');

        let last_byte = list.len() - 1;
        index.push_str(&format!(
            "{}@{}[{}-{}]\n",
            package.name, package.latest_version, first_byte, last_byte
        ));
    }

    Ok(CatalogArtifact { list, index })
}

#[cfg(test)]
mod tests {
    use horus_db::{
        models::{NewPackage, NewTarball},
        DbConnection,
    };
    use serde_json::json;

    use super::*;

    fn seed_package(
        conn: &mut SqliteConnection,
        id: &str,
        name: &str,
        version: &str,
        with_tarball: bool,
    ) {
        RegistryRepository::insert_package(
            conn,
            &NewPackage {
                id,
                name,
                latest_version: version,
                description: "checks disk usage",
                tags: Some(json!(["monitoring", "disk"])),
                owner_id: "owner-1",
                owner_name: "Test Owner",
                owner_email: "owner@example.com",
                url: "https://github.com/org/repo.git",
                created_at: "2026-01-01T00:00:00Z",
                updated_at: "2026-01-01T00:00:00Z",
            },
        )
        .unwrap();

        if with_tarball {
            RegistryRepository::insert_tarball(
                conn,
                &NewTarball {
                    id: &format!("tar-{id}"),
                    package_id: id,
                    version,
                    depends: Some(json!(["curl >=7.0", "jq >=1.0"])),
                    data: b"gzip-bytes",
                    size: 10,
                    hash: "deadbeef",
                    created_at: "2026-01-01T00:00:00Z",
                },
            )
            .unwrap();
        }
    }

    fn stanza_for<'a>(artifact: &'a CatalogArtifact, entry_prefix: &str) -> &'a str {
        let line = artifact
            .index
            .lines()
            .find(|line| line.starts_with(entry_prefix))
            .expect("index entry missing");
        let range = &line[line.find('[').unwrap() + 1..line.len() - 1];
        let (first, last) = range.split_once('-').unwrap();
        let first: usize = first.parse().unwrap();
        let last: usize = last.parse().unwrap();
        &artifact.list[first..=last]
    }

    #[test]
    fn test_empty_registry_yields_empty_documents() {
        let mut db = DbConnection::open_in_memory().unwrap();
        let artifact = build_catalog(db.conn()).unwrap();
        assert_eq!(artifact.list, "");
        assert_eq!(artifact.index, "");
    }

    #[test]
    fn test_stanza_fields_and_order() {
        let mut db = DbConnection::open_in_memory().unwrap();
        seed_package(db.conn(), "pkg-2", "zebra", "2.0", true);
        seed_package(db.conn(), "pkg-1", "alpha", "1.0", true);

        let artifact = build_catalog(db.conn()).unwrap();

        // name order, regardless of insert order
        let entries: Vec<_> = artifact.index.lines().collect();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].starts_with("alpha@1.0["));
        assert!(entries[1].starts_with("zebra@2.0["));

        assert_eq!(
            stanza_for(&artifact, "alpha@"),
            "Package: alpha\n\
             Maintainer: Test Owner <owner@example.com>\n\
             Version: 1.0\n\
             Description: checks disk usage\n\
             Depends: curl >=7.0, jq >=1.0\n\
             Tags: monitoring, disk\n\
             Url: https://github.com/org/repo.git\n\
             Size: 10\n\
             SHA256: deadbeef\n\n"
        );
    }

    #[test]
    fn test_index_ranges_slice_the_list_exactly() {
        let mut db = DbConnection::open_in_memory().unwrap();
        seed_package(db.conn(), "pkg-1", "alpha", "1.0", true);
        seed_package(db.conn(), "pkg-2", "beta", "1.1", true);
        seed_package(db.conn(), "pkg-3", "gamma", "2.0", true);

        let artifact = build_catalog(db.conn()).unwrap();

        // the ranges tile the whole list with no gaps or overlaps
        let mut reassembled = String::new();
        for line in artifact.index.lines() {
            let range = &line[line.find('[').unwrap() + 1..line.len() - 1];
            let (first, last) = range.split_once('-').unwrap();
            let first: usize = first.parse().unwrap();
            let last: usize = last.parse().unwrap();
            assert_eq!(first, reassembled.len());
            reassembled.push_str(&artifact.list[first..=last]);
        }
        assert_eq!(reassembled, artifact.list);
    }

    #[test]
    fn test_missing_fields_render_as_empty() {
        let mut db = DbConnection::open_in_memory().unwrap();
        RegistryRepository::insert_package(
            db.conn(),
            &NewPackage {
                id: "pkg-1",
                name: "bare",
                latest_version: "1.0",
                description: "",
                tags: None,
                owner_id: "owner-1",
                owner_name: "Test Owner",
                owner_email: "owner@example.com",
                url: "",
                created_at: "2026-01-01T00:00:00Z",
                updated_at: "2026-01-01T00:00:00Z",
            },
        )
        .unwrap();
        RegistryRepository::insert_tarball(
            db.conn(),
            &NewTarball {
                id: "tar-1",
                package_id: "pkg-1",
                version: "1.0",
                depends: None,
                data: b"gzip-bytes",
                size: 10,
                hash: "deadbeef",
                created_at: "2026-01-01T00:00:00Z",
            },
        )
        .unwrap();

        let artifact = build_catalog(db.conn()).unwrap();
        let stanza = stanza_for(&artifact, "bare@");
        assert!(stanza.contains("Description: \n"));
        assert!(stanza.contains("Depends: \n"));
        assert!(stanza.contains("Tags: \n"));
        assert!(stanza.contains("Url: \n"));
    }

    #[test]
    fn test_package_without_latest_tarball_aborts_build() {
        let mut db = DbConnection::open_in_memory().unwrap();
        seed_package(db.conn(), "pkg-1", "alpha", "1.0", true);
        seed_package(db.conn(), "pkg-2", "broken", "1.0", false);

        let err = build_catalog(db.conn()).unwrap_err();
        assert!(matches!(err, HorusError::NotFound(_)));
    }
}
