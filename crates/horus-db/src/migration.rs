use diesel::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::error::{DbError, DbResult};

pub const REGISTRY_MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Runs any pending schema migrations.
pub fn apply_migrations(conn: &mut SqliteConnection) -> DbResult<()> {
    conn.run_pending_migrations(REGISTRY_MIGRATIONS)
        .map_err(|e| DbError::MigrationError(e.to_string()))?;
    Ok(())
}
