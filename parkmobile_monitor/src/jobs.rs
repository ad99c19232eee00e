//! The two periodic sweeps and the OAuth token/cache maintenance jobs.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use notification::{NotificationRepo, SendNotificationRequest};
use secrecy::ExposeSecret;
use upstream_clients::parkmobile::ParkMobileClient;

use crate::error::MonitorError;
use crate::repo::MonitorRepo;
use crate::types::PARKMOBILE_ALERT_NOTIFICATION_TYPE;

pub struct ParkMobileMonitor {
    repo: MonitorRepo,
    notifications: Arc<NotificationRepo>,
    client: ParkMobileClient,
}

impl ParkMobileMonitor {
    pub fn new(repo: MonitorRepo, notifications: Arc<NotificationRepo>, client: ParkMobileClient) -> Self {
        Self { repo, notifications, client }
    }

    /// Enqueues one alert per due event, then batch-transitions the ids
    /// whose enqueue succeeded to `ALERTED`.
    pub async fn check_on_going_events(&self, now: DateTime<Utc>) -> Result<usize, MonitorError> {
        let due = self.repo.find_due_alerts(now).await?;
        let mut alerted_ids = Vec::with_capacity(due.len());

        for event in due {
            let Some(alert_before) = event.alert_before else { continue };

            let request = SendNotificationRequest {
                users: vec![event.user_id],
                notification_type: PARKMOBILE_ALERT_NOTIFICATION_TYPE,
                title: "Parking Reminder".to_string(),
                body: format!("Your meter will expire in {alert_before} minutes."),
                meta: serde_json::json!({
                    "id": event.id,
                    "title": "Parking Reminder",
                    "body": format!("Your meter will expire in {alert_before} minutes."),
                }),
                lang: "en_us".to_string(),
                silent: false,
                no_push: false,
                image: None,
            };

            match self.notifications.send_notification(request, now).await {
                Ok(ids) if !ids.is_empty() => alerted_ids.push(event.id),
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(event_id = event.id, error = %err, "parking alert enqueue failed");
                }
            }
        }

        self.repo.mark_alerted(&alerted_ids).await
    }

    /// EXPIRED is evaluated against the broader source set and earlier
    /// cutoff before FINISHED's tighter set — order matters per spec.
    pub async fn check_finished_and_expired_events(&self, now: DateTime<Utc>) -> Result<(usize, usize), MonitorError> {
        let expired = self.repo.expire_overdue(now).await?;
        let finished = self.repo.finish_ended(now).await?;
        Ok((expired, finished))
    }

    /// Mints a fresh client-credentials token and prunes near-expired rows.
    pub async fn update_token(&self, now: DateTime<Utc>) -> Result<(), MonitorError> {
        let minted = self.client.update_token(now).await?;
        self.repo
            .store_token_and_prune(minted.token.expose_secret(), minted.expires_at, now)
            .await
    }

    pub async fn purge_outdated_cache(&self, now: DateTime<Utc>) -> Result<(usize, usize), MonitorError> {
        self.repo.purge_outdated_cache(now).await
    }
}
