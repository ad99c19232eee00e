use serde::{Deserialize, Serialize};
use upstream_clients::bytemark::BytemarkPass;

/// Product UUIDs whose appearance sets `free_ticket_status = 1`. The flag
/// persists across subsequent refreshes once set.
pub const FREE_TICKET_PRODUCT_UUIDS: [&str; 2] = [
    "2417edb7-856c-43ee-b3df-c508b8be259b",
    "654b9f9d-5972-445b-8c6b-5c29a35c7751",
];

/// One cached pass, with the upstream body kept opaque and witnessed by an
/// MD5 hash for change detection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PassEntry {
    pub pass_uuid: String,
    pub timestamp: i64,
    pub status: String,
    pub free_ticket_status: i32,
    pub payload: serde_json::Value,
    pub payload_hash: String,
}

impl PassEntry {
    /// Builds a fresh entry from an upstream pass, stamping `timestamp`
    /// with `now` (unix seconds) and computing the payload hash.
    pub fn from_upstream(pass: &BytemarkPass, now_unix: i64) -> Result<Self, crate::error::CacheError> {
        let payload_hash = pass
            .payload_hash()
            .map_err(crate::error::CacheError::Upstream)?;

        Ok(Self {
            pass_uuid: pass.uuid.clone(),
            timestamp: now_unix,
            status: pass.status.clone(),
            free_ticket_status: 0,
            payload: pass.payload.clone(),
            payload_hash,
        })
    }

    pub fn is_free_ticket_product(pass: &BytemarkPass) -> bool {
        FREE_TICKET_PRODUCT_UUIDS.contains(&pass.product_uuid.as_str())
    }
}

/// The per-user ticket cache document, realized as a typed row with two
/// JSONB array columns rather than a second document-store technology.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TicketsCache {
    pub user_id: i64,
    pub timestamp: i64,
    pub passes: Vec<PassEntry>,
    pub passes4: Vec<PassEntry>,
}
