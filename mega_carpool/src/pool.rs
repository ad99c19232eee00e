//! The secondary connection pool, reusing `portal_db`'s generic Postgres
//! pool builder against a distinct database URL.

use diesel::{Connection, PgConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use portal_db::error::DbError;
use portal_db::pool::{PgPool, build_pool};

/// Embedded migrations for the mega-carpool database.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Connection pool for the mega-carpool database, kept as a distinct type
/// from the primary `PgPool` only by field placement at call sites — the
/// underlying pool type is identical.
pub type MegaPool = PgPool;

pub fn build_mega_pool(database_url: &str) -> Result<MegaPool, DbError> {
    build_pool(database_url)
}

/// Applies pending migrations against the mega-carpool database.
pub fn run_migrations(url: &str) -> Result<(), DbError> {
    let mut conn = PgConnection::establish(url).map_err(|e| DbError::Connection(e.to_string()))?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| DbError::Migration(e.to_string()))?;
    Ok(())
}
