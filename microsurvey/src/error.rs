use thiserror::Error;

use crate::types::SurveyState;

#[derive(Debug, Error)]
pub enum SurveyError {
    #[error("event not valid in state {0:?}")]
    InvalidTransition(SurveyState),

    #[error("stale answer for question {question_id} (current is {current_question_id})")]
    StaleAnswer { question_id: u8, current_question_id: u8 },

    #[error(transparent)]
    Db(#[from] portal_db::error::DbError),

    #[error(transparent)]
    Ledger(#[from] ledger::LedgerError),

    #[error(transparent)]
    Notification(#[from] notification::NotificationError),

    #[error("push-time scheduling failed: {0}")]
    PushTime(String),

    #[error("decrypt failed: {0}")]
    Decrypt(String),

    #[error("malformed survey payload: {0}")]
    Malformed(String),
}
