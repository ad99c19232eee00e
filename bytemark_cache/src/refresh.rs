//! `buildTicketCache` / `checkTicketCache` / `updateTicketCache` /
//! `checkTicketCacheTimeout` / `buildCacheIfEmpty`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use upstream_clients::bytemark::{BytemarkPass, TicketProvider};

use crate::error::CacheError;
use crate::repo::CacheRepo;
use crate::types::{PassEntry, TicketsCache};

/// Refresh triggers when the cache is at least this old.
const TIMEOUT_MINUTES: i64 = 60;

pub struct TicketCacheService {
    repo: CacheRepo,
    provider: Arc<dyn TicketProvider>,
}

impl TicketCacheService {
    pub fn new(repo: CacheRepo, provider: Arc<dyn TicketProvider>) -> Self {
        Self { repo, provider }
    }

    /// Creates the cache document if one doesn't already exist for the
    /// user.
    pub async fn build_ticket_cache(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        if self.repo.load_cache(user_id).await?.is_some() {
            return Ok(());
        }

        self.update_ticket_cache(user_id, None, now).await
    }

    /// Dispatches to build (no prior cache) or update (existing cache).
    pub async fn check_ticket_cache(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        match self.repo.load_cache(user_id).await? {
            Some(cache) => self.update_ticket_cache(user_id, Some(cache), now).await,
            None => self.build_ticket_cache(user_id, now).await,
        }
    }

    /// Refreshes iff the cache is at least 60 minutes old.
    pub async fn check_ticket_cache_timeout(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, CacheError> {
        let Some(cache) = self.repo.load_cache(user_id).await? else {
            self.build_ticket_cache(user_id, now).await?;
            return Ok(true);
        };

        let age_minutes = (now.timestamp() - cache.timestamp) / 60;
        if age_minutes >= TIMEOUT_MINUTES {
            self.update_ticket_cache(user_id, Some(cache), now).await?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Runs `checkTicketCacheTimeout` for every user with an on-file OAuth
    /// token, the periodic sweep the scheduler drives this job with.
    /// Errors per user are isolated, same as `build_cache_if_empty`.
    pub async fn sweep_timeouts(&self, now: DateTime<Utc>) -> Result<usize, CacheError> {
        let user_ids = self.repo.users_with_oauth_tokens().await?;
        let mut refreshed = 0;

        for user_id in user_ids {
            match self.check_ticket_cache_timeout(user_id, now).await {
                Ok(true) => refreshed += 1,
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!(user_id, error = %err, "ticket cache timeout sweep failed");
                }
            }
        }

        Ok(refreshed)
    }

    /// Bootstrap: if the cache collection is empty, build one for every
    /// user with an on-file OAuth token. Errors per user are isolated.
    pub async fn build_cache_if_empty(&self, now: DateTime<Utc>) -> Result<usize, CacheError> {
        if self.repo.cache_count().await? != 0 {
            return Ok(0);
        }

        let user_ids = self.repo.users_with_oauth_tokens().await?;
        let mut built = 0;

        for user_id in user_ids {
            match self.build_ticket_cache(user_id, now).await {
                Ok(()) => built += 1,
                Err(err) => {
                    tracing::warn!(user_id, error = %err, "bootstrap: ticket cache build failed");
                }
            }
        }

        Ok(built)
    }

    /// The core refresh protocol (spec §4.4 steps 1-10).
    async fn update_ticket_cache(
        &self,
        user_id: i64,
        existing: Option<TicketsCache>,
        now: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        let Some(token) = self.repo.load_oauth_token(user_id).await? else {
            return Ok(());
        };

        let mut passes_v1 = self.provider.fetch_passes_v1(&token).await?;
        passes_v1.sort_by_key(|p| p.time_created);

        let passes4_result = self.provider.fetch_passes_v4_expired(&token).await;

        let now_unix = now.timestamp();
        let mut previous_flags: std::collections::HashMap<String, i32> = std::collections::HashMap::new();
        if let Some(existing) = &existing {
            for entry in existing.passes.iter().chain(existing.passes4.iter()) {
                if entry.free_ticket_status == 1 {
                    previous_flags.insert(entry.pass_uuid.clone(), 1);
                }
            }
        }

        let new_passes = build_entries(&passes_v1, now_unix, &previous_flags)?;

        let new_passes4 = match passes4_result {
            Ok(mut passes_v4) => {
                passes_v4.sort_by_key(|p| p.time_created);
                merge_passes4(
                    existing.as_ref().map(|c| c.passes4.as_slice()).unwrap_or(&[]),
                    &passes_v4,
                    now_unix,
                    &previous_flags,
                )?
            }
            Err(err) => {
                tracing::warn!(user_id, error = %err, "passes4 refresh failed, retaining prior data");
                existing.as_ref().map(|c| c.passes4.clone()).unwrap_or_default()
            }
        };

        let cache = TicketsCache {
            user_id,
            timestamp: now_unix,
            passes: new_passes.clone(),
            passes4: new_passes4.clone(),
        };

        self.repo.upsert_cache(&cache).await?;
        self.repo.write_refresh_log(user_id, now_unix, now).await?;

        let mut logged = new_passes;
        logged.extend(new_passes4);
        self.repo.write_pass_logs(user_id, &logged, now).await?;

        Ok(())
    }
}

fn build_entries(
    passes: &[BytemarkPass],
    now_unix: i64,
    previous_flags: &std::collections::HashMap<String, i32>,
) -> Result<Vec<PassEntry>, CacheError> {
    passes
        .iter()
        .map(|pass| {
            let mut entry = PassEntry::from_upstream(pass, now_unix)?;
            if PassEntry::is_free_ticket_product(pass)
                || previous_flags.get(&entry.pass_uuid).copied() == Some(1)
            {
                entry.free_ticket_status = 1;
            }
            Ok(entry)
        })
        .collect()
}

/// Entry-wise merge keyed by `pass_uuid`: retains an entry unchanged when
/// its hash still matches, otherwise replaces payload/hash/timestamp.
fn merge_passes4(
    existing: &[PassEntry],
    upstream: &[BytemarkPass],
    now_unix: i64,
    previous_flags: &std::collections::HashMap<String, i32>,
) -> Result<Vec<PassEntry>, CacheError> {
    let mut by_uuid: std::collections::HashMap<&str, &PassEntry> =
        existing.iter().map(|e| (e.pass_uuid.as_str(), e)).collect();

    let mut merged = Vec::with_capacity(upstream.len());
    for pass in upstream {
        let fresh_hash = pass.payload_hash().map_err(CacheError::Upstream)?;

        let entry = match by_uuid.remove(pass.uuid.as_str()) {
            Some(prior) if prior.payload_hash == fresh_hash => prior.clone(),
            _ => {
                let mut entry = PassEntry::from_upstream(pass, now_unix)?;
                if PassEntry::is_free_ticket_product(pass)
                    || previous_flags.get(&entry.pass_uuid).copied() == Some(1)
                {
                    entry.free_ticket_status = 1;
                }
                entry
            }
        };
        merged.push(entry);
    }

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn pass(uuid: &str, time_created_secs: i64, product_uuid: &str) -> BytemarkPass {
        BytemarkPass {
            uuid: uuid.to_string(),
            status: "ACTIVE".to_string(),
            time_created: Utc.timestamp_opt(time_created_secs, 0).unwrap(),
            product_uuid: product_uuid.to_string(),
            payload: serde_json::json!({ "uuid": uuid }),
        }
    }

    #[test]
    fn sorted_entries_carry_hash_and_free_ticket_flag() {
        let passes = vec![
            pass("b", 200, "2417edb7-856c-43ee-b3df-c508b8be259b"),
            pass("a", 100, "other"),
        ];
        let mut sorted = passes.clone();
        sorted.sort_by_key(|p| p.time_created);

        let entries = build_entries(&sorted, 1000, &Default::default()).unwrap();
        assert_eq!(entries[0].pass_uuid, "a");
        assert_eq!(entries[1].free_ticket_status, 1);
        assert_eq!(entries[1].payload_hash, sorted[1].payload_hash().unwrap());
    }

    #[test]
    fn merge_retains_unchanged_hash_entries() {
        let existing_pass = pass("x", 1, "other");
        let existing_entry = PassEntry::from_upstream(&existing_pass, 500).unwrap();

        let upstream = vec![existing_pass.clone()];
        let merged = merge_passes4(&[existing_entry.clone()], &upstream, 600, &Default::default())
            .unwrap();

        assert_eq!(merged[0].timestamp, 500, "unchanged hash must not bump timestamp");
    }

    #[test]
    fn merge_replaces_changed_hash_entries() {
        let old_pass = pass("x", 1, "other");
        let old_entry = PassEntry::from_upstream(&old_pass, 500).unwrap();

        let mut new_pass = pass("x", 1, "other");
        new_pass.payload = serde_json::json!({ "uuid": "x", "status": "changed" });

        let merged = merge_passes4(&[old_entry], &[new_pass.clone()], 700, &Default::default())
            .unwrap();

        assert_eq!(merged[0].timestamp, 700);
        assert_eq!(merged[0].payload_hash, new_pass.payload_hash().unwrap());
    }

    #[test]
    fn free_ticket_flag_persists_once_set() {
        let mut prior = std::collections::HashMap::new();
        prior.insert("x".to_string(), 1);

        let p = pass("x", 1, "other");
        let entries = build_entries(&[p], 900, &prior).unwrap();
        assert_eq!(entries[0].free_ticket_status, 1);
    }
}
