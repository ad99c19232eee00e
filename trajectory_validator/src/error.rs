use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrajectoryError {
    #[error(transparent)]
    Db(#[from] portal_db::error::DbError),

    #[error("malformed trajectory payload for trip {trip_id}: {reason}")]
    MalformedPoints { trip_id: i64, reason: String },
}
