use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("no Bytemark OAuth token on file for user")]
    NoOAuthToken,

    #[error(transparent)]
    Upstream(#[from] upstream_clients::errors::ClientError),

    #[error(transparent)]
    Db(#[from] portal_db::error::DbError),

    #[error("malformed cached payload: {0}")]
    Malformed(String),
}
