/// Errors that can occur within a single upstream client implementation.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// An error during an HTTP request (network failure, timeout, TLS).
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The upstream returned a non-2xx status with a body we could read.
    #[error("upstream returned an error: {0}")]
    Api(String),

    /// The response body didn't deserialize into the expected shape.
    #[error("malformed upstream response: {0}")]
    Malformed(String),

    /// No credential (OAuth token, API key) was available for this call.
    #[error("missing credential: {0}")]
    MissingCredential(String),

    /// Invalid header value built from a credential.
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}
