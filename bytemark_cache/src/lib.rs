//! Per-user Bytemark ticket cache with hash-based incremental refresh.

pub mod error;
pub mod refresh;
pub mod repo;
pub mod types;

pub use error::CacheError;
pub use refresh::TicketCacheService;
pub use repo::CacheRepo;
pub use types::{FREE_TICKET_PRODUCT_UUIDS, PassEntry, TicketsCache};
