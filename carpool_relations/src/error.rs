use thiserror::Error;

#[derive(Debug, Error)]
pub enum CarpoolRelationError {
    #[error(transparent)]
    Db(#[from] portal_db::error::DbError),

    #[error(transparent)]
    MegaCarpool(#[from] mega_carpool::MegaCarpoolError),
}
