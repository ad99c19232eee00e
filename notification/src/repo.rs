//! `sendNotification` pipeline: DB insert transaction followed by
//! best-effort queue dispatch.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl, scoped_futures::ScopedFutureExt};
use portal_db::error::DbError;
use portal_db::pool::PgPool;
use portal_db::schema::{notification_msgs, notification_users, notifications};
use upstream_clients::queue::{CloudMessage, QueueClient};

use crate::error::{MAX_RECIPIENTS_PER_CALL, NotificationError};
use crate::lang::normalize_lang;

/// Request shape for `sendNotification`.
pub struct SendNotificationRequest {
    pub users: Vec<i64>,
    pub notification_type: i32,
    pub title: String,
    pub body: String,
    pub meta: serde_json::Value,
    pub lang: String,
    pub silent: bool,
    pub no_push: bool,
    pub image: Option<String>,
}

struct InsertedNotification {
    notification_id: i64,
    /// (user_id, notification_user row id)
    recipients: Vec<(i64, i64)>,
}

pub struct NotificationRepo {
    pool: PgPool,
    queue: Arc<dyn QueueClient>,
}

impl NotificationRepo {
    pub fn new(pool: PgPool, queue: Arc<dyn QueueClient>) -> Self {
        Self { pool, queue }
    }

    pub async fn send_notification(
        &self,
        req: SendNotificationRequest,
        now: DateTime<Utc>,
    ) -> Result<Vec<i64>, NotificationError> {
        if req.users.len() > MAX_RECIPIENTS_PER_CALL {
            return Err(NotificationError::TooManyRecipients(req.users.len()));
        }

        let mut conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;
        let ended_on = now + Duration::days(7);
        let lang = normalize_lang(&req.lang);

        let users = req.users.clone();
        let meta = req.meta.clone();
        let title = req.title.clone();
        let body = req.body.clone();
        let silent = req.silent;
        let notification_type = req.notification_type;

        let inserted = conn
            .transaction::<_, DbError, _>(|conn| {
                async move {
                    let notification_id: i64 = diesel::insert_into(notifications::table)
                        .values((
                            notifications::msg_data.eq(&meta),
                            notifications::started_on.eq(now),
                            notifications::ended_on.eq(ended_on),
                            notifications::silent.eq(silent),
                            notifications::notification_type.eq(notification_type),
                        ))
                        .returning(notifications::id)
                        .get_result(conn)
                        .await?;

                    let notification_msg_id: i64 = diesel::insert_into(notification_msgs::table)
                        .values((
                            notification_msgs::notification_id.eq(notification_id),
                            notification_msgs::msg_title.eq(&title),
                            notification_msgs::msg_body.eq(&body),
                            notification_msgs::lang.eq(&lang),
                        ))
                        .returning(notification_msgs::id)
                        .get_result(conn)
                        .await?;

                    let mut recipients = Vec::with_capacity(users.len());
                    for user_id in users {
                        let row_id: i64 = diesel::insert_into(notification_users::table)
                            .values((
                                notification_users::notification_msg_id.eq(notification_msg_id),
                                notification_users::user_id.eq(user_id),
                                notification_users::send_status.eq(0),
                            ))
                            .returning(notification_users::id)
                            .get_result(conn)
                            .await?;
                        recipients.push((user_id, row_id));
                    }

                    Ok(InsertedNotification { notification_id, recipients })
                }
                .scope_boxed()
            })
            .await?;

        let row_ids: Vec<i64> = inserted.recipients.iter().map(|(_, row_id)| *row_id).collect();

        if req.no_push {
            return Ok(row_ids);
        }

        for (user_id, row_id) in &inserted.recipients {
            let message = CloudMessage {
                silent: req.silent,
                user_list: vec![*user_id],
                notification_type: req.notification_type,
                ended_on,
                title: req.title.clone(),
                body: req.body.clone(),
                notification_id: inserted.notification_id,
                meta: req.meta.clone(),
                image: req.image.clone(),
            };

            match self.queue.enqueue(message).await {
                Ok(()) => {
                    if let Err(err) = diesel::update(
                        notification_users::table.filter(notification_users::id.eq(*row_id)),
                    )
                    .set(notification_users::send_status.eq(2))
                    .execute(&mut conn)
                    .await
                    {
                        tracing::warn!(user_id, row_id, error = %err, "send_status=2 update failed after successful enqueue");
                    }
                }
                Err(err) => {
                    tracing::warn!(user_id, error = %err, "queue dispatch failed, leaving send_status=0");
                }
            }
        }

        Ok(row_ids)
    }
}
