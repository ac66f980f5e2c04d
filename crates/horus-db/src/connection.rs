//! Database connection management.

use std::path::Path;

use diesel::{sql_query, Connection, RunQueryDsl, SqliteConnection};

use crate::{
    error::{DbError, DbResult},
    migration::apply_migrations,
};

/// Registry database connection with migration support.
pub struct DbConnection {
    conn: SqliteConnection,
}

impl DbConnection {
    /// Opens the registry database and runs migrations.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::ConnectionError`] if the connection fails and
    /// [`DbError::MigrationError`] if migrations fail.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let path_str = path.as_ref().to_string_lossy();
        let mut conn = SqliteConnection::establish(&path_str)
            .map_err(|e| DbError::ConnectionError(e.to_string()))?;

        // WAL mode for better concurrent access
        sql_query("PRAGMA journal_mode = WAL;")
            .execute(&mut conn)
            .map_err(|e| DbError::ConnectionError(e.to_string()))?;

        apply_migrations(&mut conn)?;

        Ok(Self { conn })
    }

    /// Opens an in-memory database, migrated and ready. Used by tests.
    pub fn open_in_memory() -> DbResult<Self> {
        let mut conn = SqliteConnection::establish(":memory:")
            .map_err(|e| DbError::ConnectionError(e.to_string()))?;
        apply_migrations(&mut conn)?;
        Ok(Self { conn })
    }

    /// Gets a mutable reference to the underlying connection.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }
}

impl std::ops::Deref for DbConnection {
    type Target = SqliteConnection;

    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl std::ops::DerefMut for DbConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn
    }
}
