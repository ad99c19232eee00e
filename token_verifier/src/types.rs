use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// HS256 claims carried by access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the authenticated user id, as a string per JWT convention.
    pub sub: String,
    /// Expiry, seconds since epoch.
    pub exp: i64,
}

/// The augmented request context the verifier hands back on success.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: i64,
    /// Present when a replacement token was minted and should be attached
    /// to the response as the `ACCESS-TOKEN` header.
    pub refreshed_token: Option<String>,
}

/// Header name for a refreshed access token.
pub const ACCESS_TOKEN_HEADER: &str = "ACCESS-TOKEN";

/// A request path classification, table-driven so the (out-of-scope) router
/// supplies its own bypass/legacy-forward table rather than this crate
/// hardcoding path strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRule {
    /// No authentication required at all.
    Bypass,
    /// Another service performs auth for this path; pass through here too.
    LegacyForward,
    /// Requires a valid bearer token.
    Protected,
}

/// One entry in the path-classification table: a prefix match against the
/// incoming request path.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    pub prefix: String,
    pub rule: PathRule,
}

impl PathMatcher {
    pub fn new(prefix: impl Into<String>, rule: PathRule) -> Self {
        Self { prefix: prefix.into(), rule }
    }
}

/// Classifies a path against an ordered table of matchers, defaulting to
/// `Protected` when nothing matches.
pub fn classify_path(path: &str, table: &[PathMatcher]) -> PathRule {
    table
        .iter()
        .find(|m| path.starts_with(&m.prefix))
        .map(|m| m.rule)
        .unwrap_or(PathRule::Protected)
}

/// A freshly minted access token, as persisted into `auth_user_tokens`.
#[derive(Debug, Clone)]
pub struct MintedAccessToken {
    pub token: String,
    pub expires_on: DateTime<Utc>,
}
