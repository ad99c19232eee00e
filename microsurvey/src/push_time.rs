//! `nextPushTime`: AI-proposed push scheduling, validated against a hard
//! quiet-window constraint no implementation can bypass.
//!
//! Quiet-window math follows the same local-time conversion shape as the
//! asset-sync timezone helpers elsewhere in this workspace: parse an IANA
//! zone, convert, and treat DST ambiguity as "can't prove it's safe" rather
//! than guessing.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveTime, Utc};
use chrono_tz::Tz;
use secrecy::{ExposeSecret, SecretString};

use crate::error::SurveyError;

pub const DEFAULT_TZ: &str = "America/Chicago";
const QUIET_START: (u32, u32) = (22, 30);
const QUIET_END: (u32, u32) = (7, 0);
const MIN_LEAD: Duration = Duration::minutes(30);
const FALLBACK_LEAD: Duration = Duration::hours(1);

/// True if `instant` falls within the user-local quiet window
/// [22:30, 07:00) for `tz_name`.
pub fn in_quiet_window(instant: DateTime<Utc>, tz_name: &str) -> bool {
    let tz: Tz = tz_name.parse().unwrap_or(chrono_tz::America::Chicago);
    let local = instant.with_timezone(&tz);
    let t = local.time();
    let start = NaiveTime::from_hms_opt(QUIET_START.0, QUIET_START.1, 0).unwrap();
    let end = NaiveTime::from_hms_opt(QUIET_END.0, QUIET_END.1, 0).unwrap();
    // window wraps midnight: quiet if t >= 22:30 or t < 07:00
    t >= start || t < end
}

/// Pushes `instant` forward, in 15-minute steps, until it clears the quiet
/// window. Used both by the fallback scheduler and as the last line of
/// defense against a bad LLM-proposed instant.
pub fn clamp_out_of_quiet_window(mut instant: DateTime<Utc>, tz_name: &str) -> DateTime<Utc> {
    let mut guard = 0;
    while in_quiet_window(instant, tz_name) && guard < 96 {
        instant += Duration::minutes(15);
        guard += 1;
    }
    instant
}

/// Validates a candidate push instant against the hard quiet-window
/// constraint and the `now + 30min` monotonicity rule, clamping forward if
/// either is violated. Never rejects outright — always returns a usable
/// instant, because a survey nudge that silently never fires is worse than
/// one nudged a few minutes later than requested.
pub fn enforce_constraints(candidate: DateTime<Utc>, now: DateTime<Utc>, tz_name: &str) -> DateTime<Utc> {
    let candidate = if candidate < now + MIN_LEAD { now + MIN_LEAD } else { candidate };
    clamp_out_of_quiet_window(candidate, tz_name)
}

#[async_trait]
pub trait PushTimeScheduler: Send + Sync {
    async fn next_push_time(
        &self,
        user_tz: &str,
        now: DateTime<Utc>,
        recent_history: &[String],
    ) -> Result<DateTime<Utc>, SurveyError>;
}

/// `now + 1h`, clamped out of the quiet window. Used directly as the
/// fallback policy, and as the wrapper [`LlmPushTimeScheduler`] falls back
/// to on any LLM failure.
pub struct FallbackPushTimeScheduler;

#[async_trait]
impl PushTimeScheduler for FallbackPushTimeScheduler {
    async fn next_push_time(
        &self,
        user_tz: &str,
        now: DateTime<Utc>,
        _recent_history: &[String],
    ) -> Result<DateTime<Utc>, SurveyError> {
        Ok(enforce_constraints(now + FALLBACK_LEAD, now, user_tz))
    }
}

/// Calls an external chat-completion endpoint to propose a push time, then
/// runs the result through the same [`enforce_constraints`] the fallback
/// uses — a malformed or rule-breaking LLM response can never reach the
/// caller un-clamped.
pub struct LlmPushTimeScheduler {
    client: reqwest::Client,
    endpoint: String,
    api_key: SecretString,
    fallback: FallbackPushTimeScheduler,
}

impl LlmPushTimeScheduler {
    pub fn new(client: reqwest::Client, endpoint: String, api_key: SecretString) -> Self {
        Self { client, endpoint, api_key, fallback: FallbackPushTimeScheduler }
    }

    async fn call_llm(&self, user_tz: &str, now: DateTime<Utc>, recent_history: &[String]) -> Option<DateTime<Utc>> {
        #[derive(serde::Serialize)]
        struct Request<'a> {
            timezone: &'a str,
            now: DateTime<Utc>,
            recent_history: &'a [String],
        }
        #[derive(serde::Deserialize)]
        struct Response {
            next_push_time: DateTime<Utc>,
        }

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&Request { timezone: user_tz, now, recent_history })
            .send()
            .await
            .ok()?;

        if !resp.status().is_success() {
            return None;
        }

        resp.json::<Response>().await.ok().map(|r| r.next_push_time)
    }
}

#[async_trait]
impl PushTimeScheduler for LlmPushTimeScheduler {
    async fn next_push_time(
        &self,
        user_tz: &str,
        now: DateTime<Utc>,
        recent_history: &[String],
    ) -> Result<DateTime<Utc>, SurveyError> {
        match self.call_llm(user_tz, now, recent_history).await {
            Some(candidate) => Ok(enforce_constraints(candidate, now, user_tz)),
            None => self.fallback.next_push_time(user_tz, now, recent_history).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn detects_quiet_window_in_central_time() {
        // 23:00 central is well inside the 22:30-07:00 window.
        let instant = chrono_tz::America::Chicago.with_ymd_and_hms(2026, 1, 15, 23, 0, 0).unwrap();
        assert!(in_quiet_window(instant.with_timezone(&Utc), "America/Chicago"));
    }

    #[test]
    fn detects_daytime_outside_quiet_window() {
        let instant = chrono_tz::America::Chicago.with_ymd_and_hms(2026, 1, 15, 14, 0, 0).unwrap();
        assert!(!in_quiet_window(instant.with_timezone(&Utc), "America/Chicago"));
    }

    #[test]
    fn clamp_pushes_forward_until_clear_of_window() {
        let instant = chrono_tz::America::Chicago.with_ymd_and_hms(2026, 1, 15, 23, 0, 0).unwrap();
        let clamped = clamp_out_of_quiet_window(instant.with_timezone(&Utc), "America/Chicago");
        assert!(!in_quiet_window(clamped, "America/Chicago"));
    }

    #[test]
    fn enforce_constraints_applies_minimum_lead_time() {
        let now = Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap();
        let too_soon = now + Duration::minutes(5);
        let result = enforce_constraints(too_soon, now, "America/Chicago");
        assert!(result >= now + MIN_LEAD);
    }

    #[tokio::test]
    async fn fallback_scheduler_never_lands_in_quiet_window() {
        let now = chrono_tz::America::Chicago
            .with_ymd_and_hms(2026, 1, 15, 22, 0, 0)
            .unwrap()
            .with_timezone(&Utc);
        let scheduler = FallbackPushTimeScheduler;
        let result = scheduler.next_push_time("America/Chicago", now, &[]).await.unwrap();
        assert!(!in_quiet_window(result, "America/Chicago"));
    }
}
