//! Client for the ParkMobile OAuth/token API.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::errors::ClientError;

const TOKEN_TIMEOUT: Duration = Duration::from_secs(30);

/// `POST https://auth.parkmobile.io/connect/token` response shape.
///
/// `serde`'s required, non-`Option` fields reject a malformed body
/// (missing string, missing/negative integer) the same way a schema
/// validator would, without needing one.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// A minted ParkMobile OAuth token with its absolute UTC expiry.
pub struct MintedToken {
    pub token: SecretString,
    pub expires_at: DateTime<Utc>,
}

pub struct ParkMobileClient {
    client: Client,
    token_url: String,
    client_id: SecretString,
    client_secret: SecretString,
}

impl ParkMobileClient {
    pub fn new(
        token_url: impl Into<String>,
        client_id: SecretString,
        client_secret: SecretString,
    ) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(TOKEN_TIMEOUT).build()?;
        Ok(Self { client, token_url: token_url.into(), client_id, client_secret })
    }

    /// Mints a fresh client-credentials token. Callers persist it as
    /// `PmApiToken { token, expires = now + expires_in }`.
    pub async fn update_token(&self, now: DateTime<Utc>) -> Result<MintedToken, ClientError> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.expose_secret()),
            ("client_secret", self.client_secret.expose_secret()),
        ];

        let response = self.client.post(&self.token_url).form(&form).send().await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Api(body));
        }

        let body: TokenResponse = response.json().await?;
        if body.expires_in <= 0 {
            return Err(ClientError::Malformed(
                "expires_in must be a positive integer".to_string(),
            ));
        }

        Ok(MintedToken {
            token: SecretString::new(body.access_token.into()),
            expires_at: now + chrono::Duration::seconds(body.expires_in),
        })
    }
}
