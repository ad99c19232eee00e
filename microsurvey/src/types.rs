use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Terminal question index: `Q12` is the last question before `Done`.
pub const LAST_QUESTION: u8 = 12;

/// The durable state of one user's survey run. Serialized into
/// `SurveyActorState.state_json` — this enum, not the DB row, is the source
/// of truth for where the survey is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state")]
pub enum SurveyState {
    Idle,
    WaitingForConsent,
    Consent,
    WaitingForQuestion(u8),
    Question(u8),
    Done,
    Cancelled,
}

impl SurveyState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SurveyState::Done | SurveyState::Cancelled)
    }
}

/// Events the actor can receive.
#[derive(Debug, Clone)]
pub enum SurveyEvent {
    Start,
    ConsentYes,
    /// `ANSWER(k)`: the user answered question `k`.
    Answer { question_id: u8, payload: String },
    Cancel,
    /// A scheduled push timer firing. Carries the question/consent slot it
    /// was armed for, so a stale timer (already answered) is a no-op.
    TimerFired { for_state: SurveyState },
}

/// A side effect the caller must carry out once the new state is durably
/// persisted — never performed by [`crate::actor::apply`] itself.
#[derive(Debug, Clone)]
pub enum SideEffect {
    None,
    /// Push time is resolved by the caller via
    /// [`crate::push_time::PushTimeScheduler`] after persisting, never by
    /// the pure transition function.
    SchedulePush { content: PushContent },
    CreditReward,
    DeleteActorState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushContent {
    Consent,
    Question(u8),
}

/// Result of a single [`crate::actor::apply`] call: the new state plus the
/// effect(s) the caller must carry out after persisting it.
#[derive(Debug, Clone)]
pub struct Transition {
    pub new_state: SurveyState,
    pub effect: SideEffect,
}

/// The persisted row backing one user's live-or-idle survey run.
#[derive(Debug, Clone)]
pub struct SurveyActorState {
    pub id: i64,
    pub user_id: i64,
    pub survey_id: i64,
    pub state: SurveyState,
    pub updated_on: DateTime<Utc>,
    /// When the next push nudge for this actor is due, if one is
    /// outstanding. Content is never stored here — it's re-derived from
    /// `state` at dispatch time (`Consent` while waiting for consent,
    /// `Question(k)` while waiting for question `k`).
    pub scheduled_push_at: Option<DateTime<Utc>>,
}

impl SurveyState {
    /// The push content a `SchedulePush` effect for this state resolves
    /// to, if any — used to re-derive content for a due or rehydrated push
    /// rather than storing it redundantly alongside `scheduled_push_at`.
    pub fn push_content(self) -> Option<PushContent> {
        match self {
            SurveyState::WaitingForConsent => Some(PushContent::Consent),
            SurveyState::WaitingForQuestion(k) => Some(PushContent::Question(k)),
            _ => None,
        }
    }
}
