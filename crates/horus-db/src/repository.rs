//! Query surface of the registry store.

use std::sync::LazyLock;

use diesel::{
    dsl::sql,
    prelude::*,
    sql_types::{Bool, Text},
};
use regex::Regex;

use crate::{
    error::{DbError, DbResult},
    models::{NewPackage, NewTarball, Package, PackageUpdate, Tarball, TarballMeta},
    schema::{packages, tarballs},
};

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{1,2}\.\d{1,2}$").expect("unable to compile version regex")
});

/// Sort key for package listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Name,
    Downloads,
    CreatedAt,
    UpdatedAt,
}

/// Sort direction for queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Validates the `BIG.SMALL` version format enforced on every tarball and
/// package row.
pub fn validate_version(version: &str) -> DbResult<()> {
    if VERSION_RE.is_match(version) {
        Ok(())
    } else {
        Err(DbError::ValidationError(
            "This is not a valid \"BIG.SMALL\" version.".to_string(),
        ))
    }
}

/// Repository for package and tarball rows.
pub struct RegistryRepository;

impl RegistryRepository {
    /// Finds a package by its unique name.
    pub fn find_package_by_name(
        conn: &mut SqliteConnection,
        name: &str,
    ) -> DbResult<Option<Package>> {
        let package = packages::table
            .filter(packages::name.eq(name))
            .select(Package::as_select())
            .first(conn)
            .optional()?;
        Ok(package)
    }

    /// Inserts a new package row.
    ///
    /// # Errors
    ///
    /// * [`DbError::ValidationError`] if `latest_version` is malformed.
    /// * [`DbError::Duplicate`] if the name is already taken.
    pub fn insert_package(conn: &mut SqliteConnection, package: &NewPackage) -> DbResult<()> {
        validate_version(package.latest_version)?;
        diesel::insert_into(packages::table)
            .values(package)
            .execute(conn)?;
        Ok(())
    }

    /// Overwrites the version-bump fields of an existing package.
    pub fn update_package(
        conn: &mut SqliteConnection,
        name: &str,
        update: &PackageUpdate,
    ) -> DbResult<()> {
        validate_version(update.latest_version)?;
        let affected = diesel::update(packages::table.filter(packages::name.eq(name)))
            .set(update)
            .execute(conn)?;
        if affected == 0 {
            return Err(DbError::NotFound(name.to_string()));
        }
        Ok(())
    }

    /// Inserts a new tarball row.
    ///
    /// The database's unique index on `(package_id, version)` is the real
    /// guarantor of version immutability; a lost check-then-insert race
    /// surfaces here as [`DbError::Duplicate`].
    pub fn insert_tarball(conn: &mut SqliteConnection, tarball: &NewTarball) -> DbResult<()> {
        validate_version(tarball.version)?;
        diesel::insert_into(tarballs::table)
            .values(tarball)
            .execute(conn)?;
        Ok(())
    }

    /// Deletes a single tarball row. Compensation path for a failed publish.
    pub fn delete_tarball(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
        diesel::delete(tarballs::table.filter(tarballs::id.eq(id))).execute(conn)?;
        Ok(())
    }

    /// Finds a tarball, artifact bytes included, by package and version.
    pub fn find_tarball(
        conn: &mut SqliteConnection,
        package_id: &str,
        version: &str,
    ) -> DbResult<Option<Tarball>> {
        let tarball = tarballs::table
            .filter(tarballs::package_id.eq(package_id))
            .filter(tarballs::version.eq(version))
            .select(Tarball::as_select())
            .first(conn)
            .optional()?;
        Ok(tarball)
    }

    /// Finds tarball metadata (no artifact bytes) by package and version.
    pub fn find_tarball_meta(
        conn: &mut SqliteConnection,
        package_id: &str,
        version: &str,
    ) -> DbResult<Option<TarballMeta>> {
        let meta = tarballs::table
            .filter(tarballs::package_id.eq(package_id))
            .filter(tarballs::version.eq(version))
            .select(TarballMeta::as_select())
            .first(conn)
            .optional()?;
        Ok(meta)
    }

    /// Lists every published version of a package, newest first.
    pub fn releases(conn: &mut SqliteConnection, package_id: &str) -> DbResult<Vec<TarballMeta>> {
        let releases = tarballs::table
            .filter(tarballs::package_id.eq(package_id))
            .order(tarballs::version.desc())
            .select(TarballMeta::as_select())
            .load(conn)?;
        Ok(releases)
    }

    /// Lists packages with the given sort order and paging window.
    ///
    /// `limit` of `None` returns the full set (used by the catalog builder).
    pub fn list_packages(
        conn: &mut SqliteConnection,
        sort: SortField,
        direction: SortDirection,
        offset: i64,
        limit: Option<i64>,
    ) -> DbResult<Vec<Package>> {
        let mut query = packages::table.into_boxed();

        query = match (sort, direction) {
            (SortField::Name, SortDirection::Asc) => query.order(packages::name.asc()),
            (SortField::Name, SortDirection::Desc) => query.order(packages::name.desc()),
            (SortField::Downloads, SortDirection::Asc) => query.order(packages::downloads.asc()),
            (SortField::Downloads, SortDirection::Desc) => query.order(packages::downloads.desc()),
            (SortField::CreatedAt, SortDirection::Asc) => query.order(packages::created_at.asc()),
            (SortField::CreatedAt, SortDirection::Desc) => query.order(packages::created_at.desc()),
            (SortField::UpdatedAt, SortDirection::Asc) => query.order(packages::updated_at.asc()),
            (SortField::UpdatedAt, SortDirection::Desc) => query.order(packages::updated_at.desc()),
        };

        if offset > 0 {
            query = query.offset(offset);
        }
        if let Some(lim) = limit {
            query = query.limit(lim);
        }

        let result = query.select(Package::as_select()).load(conn)?;
        Ok(result)
    }

    /// Searches packages by name, description, or tags.
    ///
    /// Name matches rank first, then popularity.
    pub fn search_packages(
        conn: &mut SqliteConnection,
        term: &str,
        offset: i64,
        limit: i64,
    ) -> DbResult<Vec<Package>> {
        let pattern = format!("%{term}%");

        let result = packages::table
            .filter(
                packages::name
                    .like(pattern.clone())
                    .or(packages::description.like(pattern.clone()))
                    .or(sql::<Bool>("json(packages.tags) LIKE ")
                        .bind::<Text, _>(pattern.clone())),
            )
            .order((
                sql::<Bool>("packages.name LIKE ")
                    .bind::<Text, _>(pattern)
                    .desc(),
                packages::downloads.desc(),
            ))
            .offset(offset)
            .limit(limit)
            .select(Package::as_select())
            .load(conn)?;
        Ok(result)
    }

    /// Increments the download counter of a package.
    pub fn increment_downloads(conn: &mut SqliteConnection, name: &str) -> DbResult<()> {
        diesel::update(packages::table.filter(packages::name.eq(name)))
            .set(packages::downloads.eq(packages::downloads + 1))
            .execute(conn)?;
        Ok(())
    }

    /// Deletes a package and every tarball that belongs to it.
    pub fn delete_package_cascade(conn: &mut SqliteConnection, name: &str) -> DbResult<()> {
        let package = Self::find_package_by_name(conn, name)?
            .ok_or_else(|| DbError::NotFound(name.to_string()))?;

        diesel::delete(tarballs::table.filter(tarballs::package_id.eq(&package.id)))
            .execute(conn)?;
        diesel::delete(packages::table.filter(packages::id.eq(&package.id))).execute(conn)?;
        Ok(())
    }
}
