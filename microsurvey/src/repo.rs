//! Persistence for survey actor snapshots and answer logs.
//!
//! `survey_actor_states.user_id` is unique: at most one survey may be live
//! for a user at a time, matching the single-writer-per-user constraint.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use portal_db::error::DbError;
use portal_db::pool::PgPool;
use portal_db::schema::{auth_users, points_transactions, survey_actor_states, survey_question_logs};

use crate::error::SurveyError;
use crate::types::{SurveyActorState, SurveyState};

pub struct SurveyRepo {
    pool: PgPool,
}

impl SurveyRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads the persisted snapshot for `user_id`, if any. Absence means
    /// the actor is `Idle` and has never been started.
    pub async fn load(&self, user_id: i64) -> Result<Option<SurveyActorState>, SurveyError> {
        let mut conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;

        let row: Option<(i64, i64, serde_json::Value, DateTime<Utc>, Option<DateTime<Utc>>)> =
            survey_actor_states::table
                .filter(survey_actor_states::user_id.eq(user_id))
                .select((
                    survey_actor_states::id,
                    survey_actor_states::survey_id,
                    survey_actor_states::state_json,
                    survey_actor_states::updated_on,
                    survey_actor_states::scheduled_push_at,
                ))
                .first(&mut conn)
                .await
                .optional()
                .map_err(DbError::from)?;

        let Some((id, survey_id, state_json, updated_on, scheduled_push_at)) = row else {
            return Ok(None);
        };

        let state: SurveyState = serde_json::from_value(state_json)
            .map_err(|e| SurveyError::Malformed(e.to_string()))?;

        Ok(Some(SurveyActorState { id, user_id, survey_id, state, updated_on, scheduled_push_at }))
    }

    /// Upserts the snapshot. Called before every transition is acknowledged
    /// to the caller (persist-before-ack).
    pub async fn persist(
        &self,
        user_id: i64,
        survey_id: i64,
        state: SurveyState,
        now: DateTime<Utc>,
    ) -> Result<(), SurveyError> {
        let mut conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;
        let state_json =
            serde_json::to_value(state).map_err(|e| SurveyError::Malformed(e.to_string()))?;

        diesel::insert_into(survey_actor_states::table)
            .values((
                survey_actor_states::user_id.eq(user_id),
                survey_actor_states::survey_id.eq(survey_id),
                survey_actor_states::state_json.eq(&state_json),
                survey_actor_states::updated_on.eq(now),
            ))
            .on_conflict(survey_actor_states::user_id)
            .do_update()
            .set((
                survey_actor_states::survey_id.eq(survey_id),
                survey_actor_states::state_json.eq(&state_json),
                survey_actor_states::updated_on.eq(now),
            ))
            .execute(&mut conn)
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    /// Removes the snapshot, called when a survey reaches `done` or
    /// `cancelled`.
    pub async fn delete(&self, user_id: i64) -> Result<(), SurveyError> {
        let mut conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;

        diesel::delete(survey_actor_states::table.filter(survey_actor_states::user_id.eq(user_id)))
            .execute(&mut conn)
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    /// Records when the next push nudge for `user_id` is due, after the
    /// state transition that requested it has already been persisted.
    pub async fn set_scheduled_push(
        &self,
        user_id: i64,
        at: DateTime<Utc>,
    ) -> Result<(), SurveyError> {
        let mut conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;

        diesel::update(survey_actor_states::table.filter(survey_actor_states::user_id.eq(user_id)))
            .set(survey_actor_states::scheduled_push_at.eq(Some(at)))
            .execute(&mut conn)
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    /// Clears the due marker once its push has been dispatched, so the next
    /// dispatch sweep doesn't resend it.
    pub async fn clear_scheduled_push(&self, user_id: i64) -> Result<(), SurveyError> {
        let mut conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;

        diesel::update(survey_actor_states::table.filter(survey_actor_states::user_id.eq(user_id)))
            .set(survey_actor_states::scheduled_push_at.eq(None::<DateTime<Utc>>))
            .execute(&mut conn)
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    /// Snapshots whose `scheduled_push_at` has arrived, for the dispatch
    /// sweep that turns a due schedule into an actual notification.
    pub async fn due_pushes(&self, now: DateTime<Utc>) -> Result<Vec<SurveyActorState>, SurveyError> {
        let mut conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;

        let rows: Vec<(i64, i64, i64, serde_json::Value, DateTime<Utc>, Option<DateTime<Utc>>)> =
            survey_actor_states::table
                .filter(survey_actor_states::scheduled_push_at.le(now))
                .select((
                    survey_actor_states::id,
                    survey_actor_states::user_id,
                    survey_actor_states::survey_id,
                    survey_actor_states::state_json,
                    survey_actor_states::updated_on,
                    survey_actor_states::scheduled_push_at,
                ))
                .load(&mut conn)
                .await
                .map_err(DbError::from)?;

        rows.into_iter()
            .map(|(id, user_id, survey_id, state_json, updated_on, scheduled_push_at)| {
                let state: SurveyState =
                    serde_json::from_value(state_json).map_err(|e| SurveyError::Malformed(e.to_string()))?;
                Ok(SurveyActorState { id, user_id, survey_id, state, updated_on, scheduled_push_at })
            })
            .collect()
    }

    /// Logs a received answer for audit/replay-detection purposes.
    pub async fn log_answer(
        &self,
        user_id: i64,
        survey_id: i64,
        question_id: i32,
        answer: &str,
        now: DateTime<Utc>,
    ) -> Result<(), SurveyError> {
        let mut conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;

        diesel::insert_into(survey_question_logs::table)
            .values((
                survey_question_logs::user_id.eq(user_id),
                survey_question_logs::survey_id.eq(survey_id),
                survey_question_logs::question_id.eq(question_id),
                survey_question_logs::answer.eq(answer),
                survey_question_logs::created_on.eq(now),
            ))
            .execute(&mut conn)
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    /// Loads every persisted actor snapshot, for the rehydration sweep that
    /// re-fires timers a process restart may have missed.
    pub async fn all_active(&self) -> Result<Vec<SurveyActorState>, SurveyError> {
        let mut conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;

        let rows: Vec<(i64, i64, i64, serde_json::Value, DateTime<Utc>, Option<DateTime<Utc>>)> =
            survey_actor_states::table
                .select((
                    survey_actor_states::id,
                    survey_actor_states::user_id,
                    survey_actor_states::survey_id,
                    survey_actor_states::state_json,
                    survey_actor_states::updated_on,
                    survey_actor_states::scheduled_push_at,
                ))
                .load(&mut conn)
                .await
                .map_err(DbError::from)?;

        rows.into_iter()
            .map(|(id, user_id, survey_id, state_json, updated_on, scheduled_push_at)| {
                let state: SurveyState =
                    serde_json::from_value(state_json).map_err(|e| SurveyError::Malformed(e.to_string()))?;
                Ok(SurveyActorState { id, user_id, survey_id, state, updated_on, scheduled_push_at })
            })
            .collect()
    }

    /// Selects up to `limit` user ids eligible for a fresh `START`: no live
    /// or past actor snapshot, and not already rewarded for `survey_id`.
    /// Backs `triggerMicrosurvey`'s `action: "start_microsurvey"` form.
    pub async fn eligible_users_for_start(
        &self,
        survey_id: i64,
        limit: usize,
    ) -> Result<Vec<i64>, SurveyError> {
        let mut conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;

        let busy: HashSet<i64> = survey_actor_states::table
            .select(survey_actor_states::user_id)
            .load(&mut conn)
            .await
            .map_err(DbError::from)?
            .into_iter()
            .collect();

        let rewarded: HashSet<i64> = points_transactions::table
            .filter(points_transactions::survey_id.eq(survey_id))
            .select(points_transactions::user_id)
            .load(&mut conn)
            .await
            .map_err(DbError::from)?
            .into_iter()
            .collect();

        let candidates: Vec<i64> = auth_users::table
            .select(auth_users::id)
            .load(&mut conn)
            .await
            .map_err(DbError::from)?;

        Ok(candidates
            .into_iter()
            .filter(|id| !busy.contains(id) && !rewarded.contains(id))
            .take(limit)
            .collect())
    }
}
