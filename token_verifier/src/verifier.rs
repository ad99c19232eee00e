//! Middleware-shaped entry point: `verify(path, authorization_header, now)`.

use chrono::{DateTime, Duration, Utc};

use crate::error::TokenError;
use crate::keys::KeyRing;
use crate::repo::AuthRepo;
use crate::types::{AuthContext, Claims, MintedAccessToken, PathMatcher, PathRule, classify_path};

/// Token refreshed when fewer than this many days remain before expiry.
const REFRESH_WINDOW: Duration = Duration::days(7);
/// Lifetime of a freshly minted access token.
const MAX_LIFETIME: Duration = Duration::days(30);

pub struct TokenVerifier {
    keys: KeyRing,
    repo: AuthRepo,
    path_table: Vec<PathMatcher>,
}

impl TokenVerifier {
    pub fn new(keys: KeyRing, repo: AuthRepo, path_table: Vec<PathMatcher>) -> Self {
        Self { keys, repo, path_table }
    }

    /// Runs the full verification protocol. `Ok(None)` means the caller
    /// should pass the request through unauthenticated (bypass or
    /// legacy-forward); `Ok(Some(ctx))` carries the authenticated context.
    pub async fn verify(
        &self,
        path: &str,
        authorization_header: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<AuthContext>, TokenError> {
        match classify_path(path, &self.path_table) {
            PathRule::Bypass | PathRule::LegacyForward => Ok(None),
            PathRule::Protected => self.verify_protected(authorization_header, now).await.map(Some),
        }
    }

    async fn verify_protected(
        &self,
        authorization_header: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<AuthContext, TokenError> {
        let header = authorization_header.ok_or(TokenError::TokenRequired)?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or(TokenError::TokenRequired)?;

        let claims: Claims = self.keys.decode(token)?;
        let user_id: i64 = claims.sub.parse().map_err(|_| TokenError::TokenChanged)?;

        self.repo.require_user_exists(user_id).await?;

        if self.repo.is_blocked(user_id).await? {
            return Err(TokenError::UserBlocked);
        }

        let (token_user_id, expires_on) = self.repo.require_active_token(token).await?;
        if token_user_id != user_id {
            return Err(TokenError::TokenFailed);
        }

        let refreshed_token = if now + REFRESH_WINDOW > expires_on {
            let new_expires_on = now + MAX_LIFETIME;
            let new_claims = Claims { sub: user_id.to_string(), exp: new_expires_on.timestamp() };
            let new_token = self.keys.encode(&new_claims)?;

            self.repo
                .rotate_token(
                    user_id,
                    token,
                    MintedAccessToken { token: new_token.clone(), expires_on: new_expires_on },
                    now,
                )
                .await?;

            Some(new_token)
        } else {
            None
        };

        Ok(AuthContext { user_id, refreshed_token })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_prefers_first_match() {
        let table = vec![
            PathMatcher::new("/auth", PathRule::Bypass),
            PathMatcher::new("/webhooks", PathRule::Bypass),
            PathMatcher::new("/legacy", PathRule::LegacyForward),
        ];

        assert_eq!(classify_path("/auth/login", &table), PathRule::Bypass);
        assert_eq!(classify_path("/legacy/foo", &table), PathRule::LegacyForward);
        assert_eq!(classify_path("/trips/42", &table), PathRule::Protected);
    }
}
