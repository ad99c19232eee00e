//! `SurveyActor::apply`: the pure transition function. No I/O, no clock —
//! the caller persists the snapshot and carries out the returned
//! [`SideEffect`] afterward (persist-before-ack).

use crate::error::SurveyError;
use crate::types::{LAST_QUESTION, PushContent, SideEffect, SurveyEvent, SurveyState, Transition};

pub struct SurveyActor;

impl SurveyActor {
    pub fn apply(state: SurveyState, event: SurveyEvent) -> Result<Transition, SurveyError> {
        match (state, event) {
            (SurveyState::Idle, SurveyEvent::Start) => Ok(Transition {
                new_state: SurveyState::WaitingForConsent,
                effect: SideEffect::SchedulePush { content: PushContent::Consent },
            }),

            (SurveyState::WaitingForConsent, SurveyEvent::ConsentYes) => Ok(Transition {
                new_state: SurveyState::WaitingForQuestion(1),
                effect: SideEffect::SchedulePush { content: PushContent::Question(1) },
            }),

            (
                SurveyState::WaitingForQuestion(expected),
                SurveyEvent::Answer { question_id, .. },
            ) if question_id == expected => {
                if expected == LAST_QUESTION {
                    Ok(Transition { new_state: SurveyState::Done, effect: SideEffect::CreditReward })
                } else {
                    let next = expected + 1;
                    Ok(Transition {
                        new_state: SurveyState::WaitingForQuestion(next),
                        effect: SideEffect::SchedulePush { content: PushContent::Question(next) },
                    })
                }
            }

            (SurveyState::WaitingForQuestion(expected), SurveyEvent::Answer { question_id, .. })
                if question_id < expected =>
            {
                Err(SurveyError::StaleAnswer { question_id, current_question_id: expected })
            }

            (state, SurveyEvent::Cancel) if !state.is_terminal() => {
                Ok(Transition { new_state: SurveyState::Cancelled, effect: SideEffect::DeleteActorState })
            }

            // Rehydration after a missed timer (e.g. process restart): the
            // actor hasn't moved on, so re-issue the same push it was
            // waiting to send rather than treating the wakeup as new input.
            (SurveyState::WaitingForConsent, SurveyEvent::TimerFired { .. }) => Ok(Transition {
                new_state: SurveyState::WaitingForConsent,
                effect: SideEffect::SchedulePush { content: PushContent::Consent },
            }),

            (SurveyState::WaitingForQuestion(k), SurveyEvent::TimerFired { .. }) => Ok(Transition {
                new_state: SurveyState::WaitingForQuestion(k),
                effect: SideEffect::SchedulePush { content: PushContent::Question(k) },
            }),

            (state, _) => Err(SurveyError::InvalidTransition(state)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_moves_idle_to_waiting_for_consent() {
        let t = SurveyActor::apply(SurveyState::Idle, SurveyEvent::Start).unwrap();
        assert_eq!(t.new_state, SurveyState::WaitingForConsent);
        assert!(matches!(t.effect, SideEffect::SchedulePush { content: PushContent::Consent, .. }));
    }

    #[test]
    fn consent_yes_jumps_straight_to_waiting_for_question_one() {
        let t = SurveyActor::apply(SurveyState::WaitingForConsent, SurveyEvent::ConsentYes).unwrap();
        assert_eq!(t.new_state, SurveyState::WaitingForQuestion(1));
    }

    #[test]
    fn answering_the_expected_question_advances_one_step() {
        let t = SurveyActor::apply(
            SurveyState::WaitingForQuestion(3),
            SurveyEvent::Answer { question_id: 3, payload: "x".into() },
        )
        .unwrap();
        assert_eq!(t.new_state, SurveyState::WaitingForQuestion(4));
    }

    #[test]
    fn answering_the_last_question_completes_and_credits_reward() {
        let t = SurveyActor::apply(
            SurveyState::WaitingForQuestion(LAST_QUESTION),
            SurveyEvent::Answer { question_id: LAST_QUESTION, payload: "x".into() },
        )
        .unwrap();
        assert_eq!(t.new_state, SurveyState::Done);
        assert!(matches!(t.effect, SideEffect::CreditReward));
    }

    #[test]
    fn stale_answer_is_rejected_without_mutating_state() {
        let err = SurveyActor::apply(
            SurveyState::WaitingForQuestion(5),
            SurveyEvent::Answer { question_id: 3, payload: "x".into() },
        )
        .unwrap_err();
        assert!(matches!(err, SurveyError::StaleAnswer { question_id: 3, current_question_id: 5 }));
    }

    #[test]
    fn cancel_from_any_non_terminal_state_deletes_actor_state() {
        let t = SurveyActor::apply(SurveyState::Question(7), SurveyEvent::Cancel).unwrap();
        assert_eq!(t.new_state, SurveyState::Cancelled);
        assert!(matches!(t.effect, SideEffect::DeleteActorState));
    }

    #[test]
    fn cancel_on_terminal_state_is_rejected() {
        let err = SurveyActor::apply(SurveyState::Done, SurveyEvent::Cancel).unwrap_err();
        assert!(matches!(err, SurveyError::InvalidTransition(SurveyState::Done)));
    }

    #[test]
    fn timer_fired_while_waiting_for_question_reissues_the_same_push() {
        let t = SurveyActor::apply(
            SurveyState::WaitingForQuestion(4),
            SurveyEvent::TimerFired { for_state: SurveyState::WaitingForQuestion(4) },
        )
        .unwrap();
        assert_eq!(t.new_state, SurveyState::WaitingForQuestion(4));
        assert!(matches!(t.effect, SideEffect::SchedulePush { content: PushContent::Question(4), .. }));
    }

    #[test]
    fn unexpected_event_in_idle_is_rejected() {
        let err = SurveyActor::apply(
            SurveyState::Idle,
            SurveyEvent::Answer { question_id: 1, payload: "x".into() },
        )
        .unwrap_err();
        assert!(matches!(err, SurveyError::InvalidTransition(SurveyState::Idle)));
    }
}
