//! Async Postgres connection pooling.
//!
//! Both the primary portal database and the secondary mega-carpool database
//! are plain Postgres, so they share this one pool constructor; callers
//! keep the two `PgPool` values distinct by holding them in separate fields
//! (see `mega_carpool::MegaPool`), never by connection-string sniffing.

use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::deadpool::Pool;

use crate::error::DbError;

/// A deadpool-backed pool of async Postgres connections.
pub type PgPool = Pool<AsyncPgConnection>;

/// Build a connection pool for the given Postgres URL.
pub fn build_pool(database_url: &str) -> Result<PgPool, DbError> {
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
    Pool::builder(manager)
        .build()
        .map_err(|e| DbError::Pool(e.to_string()))
}
