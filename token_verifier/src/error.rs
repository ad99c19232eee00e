use thiserror::Error;

/// Token verifier error taxonomy, all mapping to HTTP 401 at the (out of
/// scope) router.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("authorization header required")]
    TokenRequired,

    #[error("token has expired")]
    TokenExpired,

    #[error("token signature does not match either key")]
    TokenChanged,

    #[error("token could not be matched to an active session")]
    TokenFailed,

    #[error("user is blocked")]
    UserBlocked,

    #[error(transparent)]
    Db(#[from] portal_db::error::DbError),
}

impl TokenError {
    pub fn status_code(&self) -> u16 {
        401
    }
}
