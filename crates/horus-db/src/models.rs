use diesel::{prelude::*, sqlite::Sqlite};
use serde::Serialize;
use serde_json::Value;

use crate::schema::*;

/// A registered package, one row per unique name.
///
/// `owner_name`/`owner_email` are denormalized from the external user
/// directory at publish time; the registry itself has no users table.
#[derive(Debug, Clone, Serialize, Selectable)]
#[diesel(table_name = packages)]
pub struct Package {
    pub id: String,
    pub name: String,
    pub latest_version: String,
    pub description: String,
    pub tags: Option<Vec<String>>,
    pub owner_id: String,
    pub owner_name: String,
    pub owner_email: String,
    pub url: String,
    pub created_at: String,
    pub updated_at: String,
    pub downloads: i64,
}

impl Queryable<packages::SqlType, Sqlite> for Package {
    type Row = (
        String,
        String,
        String,
        String,
        Option<Value>,
        String,
        String,
        String,
        String,
        String,
        String,
        i64,
    );

    fn build(row: Self::Row) -> diesel::deserialize::Result<Self> {
        Ok(Self {
            id: row.0,
            name: row.1,
            latest_version: row.2,
            description: row.3,
            tags: row.4.map(|v| serde_json::from_value(v).unwrap_or_default()),
            owner_id: row.5,
            owner_name: row.6,
            owner_email: row.7,
            url: row.8,
            created_at: row.9,
            updated_at: row.10,
            downloads: row.11,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = packages)]
pub struct NewPackage<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub latest_version: &'a str,
    pub description: &'a str,
    pub tags: Option<Value>,
    pub owner_id: &'a str,
    pub owner_name: &'a str,
    pub owner_email: &'a str,
    pub url: &'a str,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

/// Fields overwritten on an accepted version bump.
#[derive(AsChangeset)]
#[diesel(table_name = packages)]
pub struct PackageUpdate<'a> {
    pub latest_version: &'a str,
    pub description: &'a str,
    pub tags: Option<Value>,
    pub url: &'a str,
    pub updated_at: &'a str,
}

/// A published version of a package, artifact bytes included.
#[derive(Debug, Selectable)]
#[diesel(table_name = tarballs)]
pub struct Tarball {
    pub id: String,
    pub package_id: String,
    pub version: String,
    pub depends: Option<Vec<String>>,
    pub data: Vec<u8>,
    pub size: i64,
    pub hash: String,
    pub created_at: String,
}

impl Queryable<tarballs::SqlType, Sqlite> for Tarball {
    type Row = (
        String,
        String,
        String,
        Option<Value>,
        Vec<u8>,
        i64,
        String,
        String,
    );

    fn build(row: Self::Row) -> diesel::deserialize::Result<Self> {
        Ok(Self {
            id: row.0,
            package_id: row.1,
            version: row.2,
            depends: row.3.map(|v| serde_json::from_value(v).unwrap_or_default()),
            data: row.4,
            size: row.5,
            hash: row.6,
            created_at: row.7,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = tarballs)]
pub struct NewTarball<'a> {
    pub id: &'a str,
    pub package_id: &'a str,
    pub version: &'a str,
    pub depends: Option<Value>,
    pub data: &'a [u8],
    pub size: i64,
    pub hash: &'a str,
    pub created_at: &'a str,
}

/// Tarball metadata without the artifact bytes, for release listings and
/// catalog assembly.
#[derive(Debug, Clone, Serialize, Selectable)]
#[diesel(table_name = tarballs)]
pub struct TarballMeta {
    pub version: String,
    pub depends: Option<Vec<String>>,
    pub size: i64,
    pub hash: String,
    pub created_at: String,
}

type TarballMetaSql = (
    diesel::sql_types::Text,
    diesel::sql_types::Nullable<diesel::sql_types::Jsonb>,
    diesel::sql_types::BigInt,
    diesel::sql_types::Text,
    diesel::sql_types::Text,
);

impl Queryable<TarballMetaSql, Sqlite> for TarballMeta {
    type Row = (String, Option<Value>, i64, String, String);

    fn build(row: Self::Row) -> diesel::deserialize::Result<Self> {
        Ok(Self {
            version: row.0,
            depends: row.1.map(|v| serde_json::from_value(v).unwrap_or_default()),
            size: row.2,
            hash: row.3,
            created_at: row.4,
        })
    }
}
