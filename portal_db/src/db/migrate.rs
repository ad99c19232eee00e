//! Embedded Diesel migrations, applied against Postgres.

use diesel::{Connection, PgConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

use crate::error::DbError;

/// Embedded Diesel migrations bundled with this crate.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Runs pending Diesel migrations against a Postgres database.
///
/// Used for both the primary portal database and the secondary mega-carpool
/// database — callers pass the connection string for
/// whichever one they're bringing up to date.
pub fn run_postgres(url: &str) -> Result<(), DbError> {
    let mut conn =
        PgConnection::establish(url).map_err(|e| DbError::Connection(e.to_string()))?;

    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| DbError::Migration(e.to_string()))?;

    Ok(())
}
