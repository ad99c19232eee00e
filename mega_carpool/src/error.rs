use thiserror::Error;

#[derive(Debug, Error)]
pub enum MegaCarpoolError {
    #[error(transparent)]
    Db(#[from] portal_db::error::DbError),
}
