//! Push-notification queue dispatch.
//!
//! `QueueClient` is a trait object injected into the caller so tests can
//! swap in a recording double instead of hitting a real queue.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;

use crate::errors::ClientError;

/// One `cloud_message` task. Exactly one task is emitted per recipient —
/// callers construct one `CloudMessage` per `user_id` rather than batching
/// `user_list`.
#[derive(Debug, Clone, Serialize)]
pub struct CloudMessage {
    pub silent: bool,
    pub user_list: Vec<i64>,
    pub notification_type: i32,
    pub ended_on: DateTime<Utc>,
    pub title: String,
    pub body: String,
    pub notification_id: i64,
    pub meta: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Serialize)]
struct QueueTask {
    task: &'static str,
    payload: CloudMessage,
}

/// Dispatches `cloud_message` tasks to the push/queue backend.
///
/// Implemented here as an HTTP POST to the queue dispatch endpoint; the
/// backend itself (the "MTC/messaging stub") is explicitly out of scope
///.
#[async_trait]
pub trait QueueClient: Send + Sync {
    async fn enqueue(&self, message: CloudMessage) -> Result<(), ClientError>;
}

pub struct HttpQueueClient {
    client: Client,
    dispatch_url: String,
}

impl HttpQueueClient {
    pub fn new(dispatch_url: impl Into<String>) -> Result<Self, ClientError> {
        Ok(Self { client: Client::builder().build()?, dispatch_url: dispatch_url.into() })
    }
}

#[async_trait]
impl QueueClient for HttpQueueClient {
    async fn enqueue(&self, message: CloudMessage) -> Result<(), ClientError> {
        let task = QueueTask { task: "cloud_message", payload: message };

        let response = self.client.post(&self.dispatch_url).json(&task).send().await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Api(body));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct RecordingQueueClient {
        pub sent: Mutex<Vec<CloudMessage>>,
    }

    #[async_trait]
    impl QueueClient for RecordingQueueClient {
        async fn enqueue(&self, message: CloudMessage) -> Result<(), ClientError> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }
    }

    #[tokio::test]
    async fn recording_client_captures_one_task_per_call() {
        let client = RecordingQueueClient::default();
        let msg = CloudMessage {
            silent: false,
            user_list: vec![42],
            notification_type: 97,
            ended_on: Utc::now(),
            title: "Parking Reminder".to_string(),
            body: "Your meter will expire in 5 minutes.".to_string(),
            notification_id: 1,
            meta: serde_json::json!({ "id": 1 }),
            image: None,
        };

        client.enqueue(msg).await.unwrap();

        assert_eq!(client.sent.lock().unwrap().len(), 1);
    }
}
