//! Wires [`crate::actor::SurveyActor`] to persistence, reward crediting,
//! and push scheduling. One call per event; serialization across events
//! for the same user is [`crate::registry::ActorRegistry`]'s job, not
//! this module's.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use ledger::RewardRepo;
use notification::{NotificationRepo, SendNotificationRequest};
use rust_decimal::Decimal;

use crate::actor::SurveyActor;
use crate::error::SurveyError;
use crate::push_time::{DEFAULT_TZ, PushTimeScheduler};
use crate::repo::SurveyRepo;
use crate::types::{LAST_QUESTION, PushContent, SideEffect, SurveyEvent, SurveyState};

/// Points credited on survey completion. Spec-defined per survey; fixed
/// here as the single microsurvey this workspace drives.
pub const COMPLETION_REWARD_POINTS: i64 = 50;

/// Notification type code this workspace's push pipeline uses for
/// microsurvey nudges.
const MICROSURVEY_NOTIFICATION_TYPE: i32 = 50;

pub struct SurveyOrchestrator {
    repo: SurveyRepo,
    rewards: RewardRepo,
    notifications: Arc<NotificationRepo>,
    push_scheduler: Box<dyn PushTimeScheduler>,
}

/// What the caller (push dispatcher, notification sender) should do after
/// a transition lands, resolved from the actor's abstract [`SideEffect`].
#[derive(Debug, Clone)]
pub enum ResolvedEffect {
    None,
    SchedulePush { at: DateTime<Utc>, content: PushContent },
}

impl SurveyOrchestrator {
    pub fn new(
        repo: SurveyRepo,
        rewards: RewardRepo,
        notifications: Arc<NotificationRepo>,
        push_scheduler: Box<dyn PushTimeScheduler>,
    ) -> Self {
        Self { repo, rewards, notifications, push_scheduler }
    }

    /// Handles one event for `user_id`/`survey_id`: loads the current
    /// snapshot (defaulting to `Idle`), replays stale-answer/cancel
    /// guard logic, runs the pure transition, persists before returning,
    /// then resolves whichever side effect the transition produced.
    pub async fn handle_event(
        &self,
        user_id: i64,
        survey_id: i64,
        event: SurveyEvent,
        now: DateTime<Utc>,
        user_tz: Option<&str>,
    ) -> Result<(SurveyState, ResolvedEffect), SurveyError> {
        let current = self
            .repo
            .load(user_id)
            .await?
            .map(|s| s.state)
            .unwrap_or(SurveyState::Idle);

        let transition = SurveyActor::apply(current, event)?;

        match transition.new_state {
            SurveyState::Cancelled => {
                self.repo.persist(user_id, survey_id, transition.new_state, now).await?;
                self.repo.delete(user_id).await?;
            }
            _ => {
                self.repo.persist(user_id, survey_id, transition.new_state, now).await?;
            }
        }

        let tz = user_tz.unwrap_or(DEFAULT_TZ);
        let resolved = match transition.effect {
            SideEffect::None | SideEffect::DeleteActorState => ResolvedEffect::None,
            SideEffect::SchedulePush { content } => {
                let at = self.push_scheduler.next_push_time(tz, now, &[]).await?;
                self.repo.set_scheduled_push(user_id, at).await?;
                ResolvedEffect::SchedulePush { at, content }
            }
            SideEffect::CreditReward => {
                let outcome = self
                    .rewards
                    .credit_survey_reward(user_id, survey_id, Decimal::from(COMPLETION_REWARD_POINTS), now)
                    .await?;
                tracing::info!(user_id, survey_id, ?outcome, "microsurvey completion reward resolved");
                self.repo.delete(user_id).await?;
                ResolvedEffect::None
            }
        };

        Ok((transition.new_state, resolved))
    }

    /// `ANSWER(k)` ingestion entry point: replay-safe — a `question_id`
    /// older than the actor's current question is logged as `stale_answer`
    /// and otherwise ignored.
    pub async fn receive_answer(
        &self,
        user_id: i64,
        survey_id: i64,
        question_id: u8,
        payload: String,
        now: DateTime<Utc>,
        user_tz: Option<&str>,
    ) -> Result<(SurveyState, ResolvedEffect), SurveyError> {
        self.repo
            .log_answer(user_id, survey_id, question_id as i32, &payload, now)
            .await?;

        match self
            .handle_event(user_id, survey_id, SurveyEvent::Answer { question_id, payload }, now, user_tz)
            .await
        {
            Err(SurveyError::StaleAnswer { question_id, current_question_id }) => {
                tracing::info!(user_id, survey_id, question_id, current_question_id, "stale_answer");
                let current = self.repo.load(user_id).await?.map(|s| s.state).unwrap_or(SurveyState::Idle);
                Ok((current, ResolvedEffect::None))
            }
            other => other,
        }
    }

    /// Rehydration sweep: re-derives a push schedule for every persisted,
    /// non-terminal actor that has *no* `scheduled_push_at` on file — the
    /// state left behind by a process restart that happened between a
    /// transition committing and `set_scheduled_push` running. Actors with
    /// an outstanding schedule are left alone; `dispatch_due_pushes` is what
    /// fires them once they're actually due. Per-actor failures are logged
    /// and skipped, never abort the sweep. Meant to run once at startup,
    /// not on a recurring cadence — recomputing a schedule that's merely
    /// pending, not missing, would just keep pushing it back.
    pub async fn rehydrate_overdue_timers(&self, now: DateTime<Utc>) -> Result<usize, SurveyError> {
        let snapshots = self.repo.all_active().await?;
        let mut rehydrated = 0usize;

        for snapshot in snapshots {
            if snapshot.state.is_terminal() || snapshot.scheduled_push_at.is_some() {
                continue;
            }
            let event = SurveyEvent::TimerFired { for_state: snapshot.state };
            match self.handle_event(snapshot.user_id, snapshot.survey_id, event, now, None).await {
                Ok(_) => rehydrated += 1,
                Err(err) => {
                    tracing::warn!(
                        user_id = snapshot.user_id,
                        survey_id = snapshot.survey_id,
                        %err,
                        "microsurvey timer rehydration failed"
                    );
                }
            }
        }

        Ok(rehydrated)
    }

    /// Dispatch sweep: sends a real push notification through the
    /// notification pipeline (C2) for every actor whose `scheduled_push_at`
    /// has arrived, then clears the due marker. This is the mechanism that
    /// actually fires a microsurvey nudge; `handle_event` only ever records
    /// when one is due. Per-actor failures are logged and skipped, never
    /// abort the sweep.
    pub async fn dispatch_due_pushes(&self, now: DateTime<Utc>) -> usize {
        let due = match self.repo.due_pushes(now).await {
            Ok(due) => due,
            Err(err) => {
                tracing::warn!(%err, "microsurvey push dispatch sweep: failed to load due pushes");
                return 0;
            }
        };

        let mut dispatched = 0usize;
        for snapshot in due {
            let Some(content) = snapshot.state.push_content() else {
                // Answered/cancelled since the schedule was set; nothing to send.
                if let Err(err) = self.repo.clear_scheduled_push(snapshot.user_id).await {
                    tracing::warn!(user_id = snapshot.user_id, %err, "failed to clear stale push schedule");
                }
                continue;
            };

            let request = push_notification_request(snapshot.user_id, content);
            match self.notifications.send_notification(request, now).await {
                Ok(_) => {
                    if let Err(err) = self.repo.clear_scheduled_push(snapshot.user_id).await {
                        tracing::warn!(
                            user_id = snapshot.user_id,
                            %err,
                            "push sent but failed to clear schedule marker"
                        );
                    }
                    dispatched += 1;
                }
                Err(err) => {
                    tracing::warn!(user_id = snapshot.user_id, %err, "microsurvey push dispatch failed");
                }
            }
        }

        dispatched
    }
}

fn push_notification_request(user_id: i64, content: PushContent) -> SendNotificationRequest {
    let (title, body) = match content {
        PushContent::Consent => (
            "Quick survey?".to_string(),
            "We'd love your feedback — tap to get started.".to_string(),
        ),
        PushContent::Question(k) => (
            "One more question".to_string(),
            format!("Question {k} of {LAST_QUESTION} is waiting for you."),
        ),
    };

    SendNotificationRequest {
        users: vec![user_id],
        notification_type: MICROSURVEY_NOTIFICATION_TYPE,
        title,
        body,
        meta: serde_json::json!({ "content": format!("{content:?}") }),
        lang: "en_us".to_string(),
        silent: false,
        no_push: false,
        image: None,
    }
}

