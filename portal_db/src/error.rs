//! Error types for the portal database access layer.

use thiserror::Error;

/// Errors raised by the portal database access layer.
///
/// Every component crate that touches Postgres wraps this in its own error
/// enum via `#[from]` rather than leaking `diesel`/`diesel_async` types
/// across the workspace boundary.
#[derive(Debug, Error)]
pub enum DbError {
    /// Establishing a connection (used by the migration runner, which opens
    /// its own synchronous connection outside the pool) failed.
    #[error("database connection failed: {0}")]
    Connection(String),

    /// A Diesel query or statement execution failed.
    #[error("query failed: {0}")]
    Query(#[from] diesel::result::Error),

    /// The deadpool connection pool could not hand back a connection.
    #[error("connection pool exhausted or misconfigured: {0}")]
    Pool(String),

    /// Applying embedded Diesel migrations failed.
    #[error("migration failed: {0}")]
    Migration(String),
}
