//! One-time survey completion rewards: a points credit guarded by the
//! `(user_id, survey_id)` uniqueness constraint on `points_transactions`.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::{AsyncConnection, RunQueryDsl, scoped_futures::ScopedFutureExt};
use portal_db::error::DbError;
use portal_db::pool::PgPool;
use portal_db::schema::{points_transactions, wallets};
use rust_decimal::Decimal;

use crate::activity::ActivityType;
use crate::error::LedgerError;

/// Whether a survey reward credit actually happened, or was skipped because
/// this `(user_id, survey_id)` pair was already rewarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewardOutcome {
    Credited { transaction_id: i64 },
    AlreadyRewarded,
}

pub struct RewardRepo {
    pool: PgPool,
}

impl RewardRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Credits `amount` points to `user_id` for completing `survey_id`,
    /// under activity type 6 (incentive). Relies on the partial unique
    /// index on `(user_id, survey_id)` to make the credit at-most-once;
    /// a unique violation is treated as success with
    /// [`RewardOutcome::AlreadyRewarded`], not an error, so callers never
    /// need to pre-check.
    pub async fn credit_survey_reward(
        &self,
        user_id: i64,
        survey_id: i64,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<RewardOutcome, LedgerError> {
        let mut conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;

        let result = conn
            .transaction::<_, LedgerError, _>(|conn| {
                async move {
                    let inserted: Option<i64> = diesel::insert_into(points_transactions::table)
                        .values((
                            points_transactions::user_id.eq(user_id),
                            points_transactions::activity_type.eq(ActivityType::Incentive.code()),
                            points_transactions::delta.eq(amount),
                            points_transactions::note.eq(format!("microsurvey reward: {survey_id}")),
                            points_transactions::survey_id.eq(survey_id),
                            points_transactions::created_on.eq(now),
                        ))
                        .returning(points_transactions::id)
                        .get_result(conn)
                        .await
                        .optional()
                        .or_else(|err| match err {
                            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                                Ok(None)
                            }
                            other => Err(other),
                        })
                        .map_err(DbError::from)?;

                    let Some(transaction_id) = inserted else {
                        tracing::info!(user_id, survey_id, "no duplicate bonuses");
                        return Ok(RewardOutcome::AlreadyRewarded);
                    };

                    let existing_balance: Option<Decimal> = wallets::table
                        .filter(wallets::user_id.eq(user_id))
                        .select(wallets::balance)
                        .for_update()
                        .first(conn)
                        .await
                        .optional()
                        .map_err(DbError::from)?;

                    match existing_balance {
                        Some(balance) => {
                            diesel::update(wallets::table.filter(wallets::user_id.eq(user_id)))
                                .set((
                                    wallets::balance.eq(balance + amount),
                                    wallets::modified_on.eq(now),
                                ))
                                .execute(conn)
                                .await
                                .map_err(DbError::from)?;
                        }
                        None => {
                            diesel::insert_into(wallets::table)
                                .values((
                                    wallets::user_id.eq(user_id),
                                    wallets::balance.eq(amount),
                                    wallets::auto_refill.eq(false),
                                    wallets::created_on.eq(now),
                                    wallets::modified_on.eq(now),
                                ))
                                .execute(conn)
                                .await
                                .map_err(DbError::from)?;
                        }
                    }

                    Ok(RewardOutcome::Credited { transaction_id })
                }
                .scope_boxed()
            })
            .await?;

        Ok(result)
    }
}
