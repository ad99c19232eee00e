use thiserror::Error;

/// Batching guidance limits callers to 500 recipients per call; breaching
/// it is a caller bug surfaced loudly rather than silently truncated.
pub const MAX_RECIPIENTS_PER_CALL: usize = 500;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("too many recipients in one call: {0} exceeds the {MAX_RECIPIENTS_PER_CALL} cap")]
    TooManyRecipients(usize),

    #[error(transparent)]
    Db(#[from] portal_db::error::DbError),
}
