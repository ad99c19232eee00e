//! Batch entry point: `triggerMicrosurvey`. Dispatches `START` to a batch
//! of users, throttled by a fixed delay per user so a large batch doesn't
//! flood the actor registry all at once.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::SurveyError;
use crate::registry::ActorRegistry;
use crate::repo::SurveyRepo;
use crate::types::SurveyEvent;

/// Which users to start. Either an explicit list, or a request to let the
/// repo select eligible users itself.
pub enum TriggerSelector {
    UserIds(Vec<i64>),
    StartMicrosurvey,
}

pub struct TriggerRequest {
    pub selector: TriggerSelector,
    pub survey_id: i64,
    /// Caps the batch size when `selector` is `StartMicrosurvey`. Ignored
    /// for an explicit `UserIds` list.
    pub limitation: usize,
    /// Per-user throttle, milliseconds.
    pub settime_ms: u64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TriggerSummary {
    pub dispatched: usize,
    pub failed: usize,
}

/// Dispatches `START` to the selected users, sleeping `settime_ms` between
/// each dispatch. A per-user failure is logged and does not abort the
/// batch.
pub async fn trigger_microsurvey(
    registry: &Arc<ActorRegistry>,
    repo: &SurveyRepo,
    request: TriggerRequest,
    now: DateTime<Utc>,
) -> Result<TriggerSummary, SurveyError> {
    let user_ids = match request.selector {
        TriggerSelector::UserIds(ids) => ids,
        TriggerSelector::StartMicrosurvey => {
            repo.eligible_users_for_start(request.survey_id, request.limitation).await?
        }
    };

    let mut summary = TriggerSummary::default();
    let mut first = true;

    for user_id in user_ids {
        if !first {
            tokio::time::sleep(Duration::from_millis(request.settime_ms)).await;
        }
        first = false;

        match registry
            .dispatch(user_id, request.survey_id, SurveyEvent::Start, now, None)
            .await
        {
            Ok(_) => summary.dispatched += 1,
            Err(err) => {
                tracing::warn!(user_id, survey_id = request.survey_id, %err, "microsurvey start dispatch failed");
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_starts_at_zero() {
        let summary = TriggerSummary::default();
        assert_eq!(summary.dispatched, 0);
        assert_eq!(summary.failed, 0);
    }
}
