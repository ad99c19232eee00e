//! Client for the Bytemark passes API.
//!
//! A `reqwest::Client` carrying default headers, one method per upstream
//! endpoint, MD5-hashed payloads for change detection instead of a vendor
//! SDK.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::errors::ClientError;

/// The upstream surface `bytemark_cache` depends on, so tests can swap in a
/// canned double instead of hitting the Bytemark API — mirrors
/// `market_data_ingestor::providers::DataProvider`.
#[async_trait]
pub trait TicketProvider: Send + Sync {
    async fn fetch_passes_v1(
        &self,
        user_token: &SecretString,
    ) -> Result<Vec<BytemarkPass>, ClientError>;

    async fn fetch_passes_v4_expired(
        &self,
        user_token: &SecretString,
    ) -> Result<Vec<BytemarkPass>, ClientError>;
}

const TIMEOUT: Duration = Duration::from_secs(10);

/// A single Bytemark pass, with the full upstream body carried as opaque
/// payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BytemarkPass {
    pub uuid: String,
    pub status: String,
    pub time_created: DateTime<Utc>,
    pub product_uuid: String,
    #[serde(flatten)]
    pub payload: serde_json::Value,
}

impl BytemarkPass {
    /// Lowercase hex MD5 of the JSON-serialized payload.
    pub fn payload_hash(&self) -> Result<String, ClientError> {
        let json = serde_json::to_string(&self.payload)
            .map_err(|e| ClientError::Malformed(e.to_string()))?;
        let digest = Md5::digest(json.as_bytes());
        Ok(format!("{digest:x}"))
    }
}

/// Thin wrapper over the Bytemark HTTP API.
///
/// One instance per user OAuth token: Bytemark calls are made on the
/// user's behalf via a Bearer token, unlike ParkMobile's single
/// client-credentials token shared across users.
pub struct BytemarkClient {
    client: Client,
    base_url: String,
}

impl BytemarkClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(TIMEOUT).build()?;
        Ok(Self { client, base_url: base_url.into() })
    }

    fn bearer(token: &SecretString) -> String {
        format!("Bearer {}", token.expose_secret())
    }

    /// `GET /passes?limit=9999&page=1` — all passes for the user.
    pub async fn fetch_passes_v1(
        &self,
        user_token: &SecretString,
    ) -> Result<Vec<BytemarkPass>, ClientError> {
        let url = format!("{}/passes", self.base_url);
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, Self::bearer(user_token))
            .query(&[("limit", "9999"), ("page", "1")])
            .send()
            .await?;

        Self::parse_passes(response).await
    }

    /// `GET /v4.0/passes?status=EXPIRED`.
    pub async fn fetch_passes_v4_expired(
        &self,
        user_token: &SecretString,
    ) -> Result<Vec<BytemarkPass>, ClientError> {
        let url = format!("{}/v4.0/passes", self.base_url);
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, Self::bearer(user_token))
            .query(&[("status", "EXPIRED")])
            .send()
            .await?;

        Self::parse_passes(response).await
    }

    async fn parse_passes(response: reqwest::Response) -> Result<Vec<BytemarkPass>, ClientError> {
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Api(body));
        }

        response
            .json::<Vec<BytemarkPass>>()
            .await
            .map_err(ClientError::from)
    }
}

#[async_trait]
impl TicketProvider for BytemarkClient {
    async fn fetch_passes_v1(
        &self,
        user_token: &SecretString,
    ) -> Result<Vec<BytemarkPass>, ClientError> {
        BytemarkClient::fetch_passes_v1(self, user_token).await
    }

    async fn fetch_passes_v4_expired(
        &self,
        user_token: &SecretString,
    ) -> Result<Vec<BytemarkPass>, ClientError> {
        BytemarkClient::fetch_passes_v4_expired(self, user_token).await
    }
}
