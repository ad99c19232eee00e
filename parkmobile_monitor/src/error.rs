use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Db(#[from] portal_db::error::DbError),

    #[error(transparent)]
    Upstream(#[from] upstream_clients::errors::ClientError),

    #[error(transparent)]
    Notification(#[from] notification::NotificationError),
}
