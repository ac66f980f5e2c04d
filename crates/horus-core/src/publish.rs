//! The publish/versioning engine.
//!
//! Given a built artifact and the caller's identity, decides whether this
//! is a brand-new package, an accepted version bump, or a conflict, and
//! performs the store writes. Versions are immutable: once a
//! `(package, version)` pair exists it is never overwritten, and the
//! store's unique index is the final arbiter under concurrent publishes.

use chrono::{SecondsFormat, Utc};
use diesel::SqliteConnection;
use horus_db::{
    error::DbError,
    models::{NewPackage, NewTarball, PackageUpdate},
    repository::RegistryRepository,
};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::HorusError, manifest::Manifest, tarball::BuiltTarball, validate::validate_name,
    HorusResult,
};

/// The authenticated caller, as provided by the external auth layer.
#[derive(Debug, Clone)]
pub struct Caller {
    /// Opaque owner id.
    pub id: String,
    pub name: String,
    pub email: String,
}

/// A successful publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// First publish of this name.
    Created { name: String, version: String },
    /// New version accepted for an existing package.
    VersionBumped { name: String, version: String },
}

pub(crate) fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Publishes a built artifact on behalf of `caller`.
pub fn publish(
    conn: &mut SqliteConnection,
    built: &BuiltTarball,
    caller: &Caller,
) -> HorusResult<PublishOutcome> {
    let manifest = &built.manifest;
    let name = manifest
        .name
        .as_deref()
        .ok_or_else(|| HorusError::InvalidName("Name not provided".to_string()))?;
    validate_name(name)?;

    let version = manifest.version.as_deref().unwrap_or_default();

    match RegistryRepository::find_package_by_name(conn, name)? {
        None => create_package(conn, built, name, version, caller),
        Some(package) => {
            if package.owner_id != caller.id {
                return Err(HorusError::NotOwner(
                    "Package already registered, you must be the owner to update it".to_string(),
                ));
            }

            if RegistryRepository::find_tarball_meta(conn, &package.id, version)?.is_some() {
                return Err(HorusError::VersionExists);
            }

            insert_tarball(conn, built, &package.id, version)?;

            let timestamp = now();
            RegistryRepository::update_package(
                conn,
                name,
                &PackageUpdate {
                    latest_version: version,
                    description: manifest.description.as_deref().unwrap_or_default(),
                    tags: manifest.tags.as_ref().map(|tags| json!(tags)),
                    url: manifest.repository_url().unwrap_or_default(),
                    updated_at: &timestamp,
                },
            )?;

            info!(package = name, version, "version bumped");
            Ok(PublishOutcome::VersionBumped {
                name: name.to_string(),
                version: version.to_string(),
            })
        }
    }
}

fn create_package(
    conn: &mut SqliteConnection,
    built: &BuiltTarball,
    name: &str,
    version: &str,
    caller: &Caller,
) -> HorusResult<PublishOutcome> {
    let manifest = &built.manifest;
    let package_id = Uuid::new_v4().to_string();
    let tarball_id = insert_tarball(conn, built, &package_id, version)?;

    let timestamp = now();
    let new_package = NewPackage {
        id: &package_id,
        name,
        latest_version: version,
        description: manifest.description.as_deref().unwrap_or_default(),
        tags: manifest.tags.as_ref().map(|tags| json!(tags)),
        owner_id: &caller.id,
        owner_name: &caller.name,
        owner_email: &caller.email,
        url: manifest.repository_url().unwrap_or_default(),
        created_at: &timestamp,
        updated_at: &timestamp,
    };

    if let Err(err) = RegistryRepository::insert_package(conn, &new_package) {
        // no multi-record transaction here; drop the tarball we just wrote
        // so it isn't left orphaned
        if let Err(cleanup_err) = RegistryRepository::delete_tarball(conn, &tarball_id) {
            warn!(
                tarball = %tarball_id,
                "failed to remove orphaned tarball after package insert failure: {cleanup_err}"
            );
        }
        // a lost name-creation race surfaces here as a duplicate package
        // row; that is a name conflict, not an existing version, so it is
        // surfaced as the store conflict it is
        return Err(HorusError::StoreError(err));
    }

    info!(package = name, version, "package created");
    Ok(PublishOutcome::Created {
        name: name.to_string(),
        version: version.to_string(),
    })
}

fn insert_tarball(
    conn: &mut SqliteConnection,
    built: &BuiltTarball,
    package_id: &str,
    version: &str,
) -> HorusResult<String> {
    let depends = depends_json(&built.manifest);
    let tarball_id = Uuid::new_v4().to_string();
    let timestamp = now();

    RegistryRepository::insert_tarball(
        conn,
        &NewTarball {
            id: &tarball_id,
            package_id,
            version,
            depends,
            data: &built.data,
            size: built.data.len() as i64,
            hash: &built.hash,
            created_at: &timestamp,
        },
    )
    .map_err(map_store_error)?;

    Ok(tarball_id)
}

fn depends_json(manifest: &Manifest) -> Option<serde_json::Value> {
    let depends = manifest.depends();
    if depends.is_empty() {
        None
    } else {
        Some(json!(depends))
    }
}

fn map_store_error(err: DbError) -> HorusError {
    match err {
        // a lost check-then-insert race surfaces as a duplicate key
        DbError::Duplicate(_) => HorusError::VersionExists,
        DbError::ValidationError(message) => HorusError::ValidationError(message),
        other => HorusError::StoreError(other),
    }
}
