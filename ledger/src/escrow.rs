//! Escrow open/add-detail/close operations.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl, scoped_futures::ScopedFutureExt};
use portal_db::error::DbError;
use portal_db::pool::PgPool;
use portal_db::schema::{escrow_accounts, escrow_details, points_transactions};
use rust_decimal::Decimal;

use crate::activity::{ActivityType, EscrowDirection};
use crate::error::LedgerError;
use crate::types::EscrowStatus;

pub struct EscrowRepo {
    pool: PgPool,
}

impl EscrowRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a new escrow account for a reservation.
    pub async fn add_escrow(
        &self,
        user_id: i64,
        reservation_id: i64,
        offer_id: Option<i64>,
        trip_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<i64, LedgerError> {
        let mut conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;

        let id: i64 = diesel::insert_into(escrow_accounts::table)
            .values((
                escrow_accounts::user_id.eq(user_id),
                escrow_accounts::reservation_id.eq(reservation_id),
                escrow_accounts::offer_id.eq(offer_id),
                escrow_accounts::trip_id.eq(trip_id),
                escrow_accounts::status.eq(EscrowStatus::Open.code()),
                escrow_accounts::created_on.eq(now),
            ))
            .returning(escrow_accounts::id)
            .get_result(&mut conn)
            .await
            .map_err(DbError::from)?;

        Ok(id)
    }

    /// Records an escrow movement: debits the user into escrow (activity 9)
    /// for INCREASE activities, credits the user out of escrow (activity
    /// 10) for DECREASE activities, and cross-links the paired
    /// points_transaction via `ref_transaction_id`.
    pub async fn add_escrow_detail(
        &self,
        user_id: i64,
        escrow_id: i64,
        activity_code: i32,
        fund: Decimal,
        offer_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<i64, LedgerError> {
        let mut conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;
        let fund = fund.abs();

        let (wallet_activity_code, delta) = match EscrowDirection::for_activity_code(activity_code)
        {
            EscrowDirection::Increase => (ActivityType::IntoEscrow.code(), -fund),
            EscrowDirection::Decrease => (10, fund),
        };

        conn.transaction::<_, LedgerError, _>(|conn| {
            async move {
                let transaction_id: i64 = diesel::insert_into(points_transactions::table)
                    .values((
                        points_transactions::user_id.eq(user_id),
                        points_transactions::activity_type.eq(wallet_activity_code),
                        points_transactions::delta.eq(delta),
                        points_transactions::created_on.eq(now),
                    ))
                    .returning(points_transactions::id)
                    .get_result(conn)
                    .await
                    .map_err(DbError::from)?;

                let detail_id: i64 = diesel::insert_into(escrow_details::table)
                    .values((
                        escrow_details::escrow_id.eq(escrow_id),
                        escrow_details::activity_type.eq(activity_code),
                        escrow_details::fund.eq(fund),
                        escrow_details::offer_id.eq(offer_id),
                        escrow_details::transaction_id.eq(transaction_id),
                        escrow_details::created_on.eq(now),
                    ))
                    .returning(escrow_details::id)
                    .get_result(conn)
                    .await
                    .map_err(DbError::from)?;

                Ok(detail_id)
            }
            .scope_boxed()
        })
        .await
    }

    /// Rewrites every 9/10 `EscrowDetail` for this user/reservation to
    /// activity=8 and closes the account.
    pub async fn close_escrow(&self, user_id: i64, reservation_id: i64) -> Result<(), LedgerError> {
        let mut conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;

        conn.transaction::<_, LedgerError, _>(|conn| {
            async move {
                let escrow_id: i64 = escrow_accounts::table
                    .filter(escrow_accounts::user_id.eq(user_id))
                    .filter(escrow_accounts::reservation_id.eq(reservation_id))
                    .select(escrow_accounts::id)
                    .first(conn)
                    .await
                    .map_err(DbError::from)?;

                diesel::update(
                    escrow_details::table
                        .filter(escrow_details::escrow_id.eq(escrow_id))
                        .filter(escrow_details::activity_type.eq_any([9, 10])),
                )
                .set(escrow_details::activity_type.eq(8))
                .execute(conn)
                .await
                .map_err(DbError::from)?;

                diesel::update(escrow_accounts::table.filter(escrow_accounts::id.eq(escrow_id)))
                    .set(escrow_accounts::status.eq(EscrowStatus::Closed.code()))
                    .execute(conn)
                    .await
                    .map_err(DbError::from)?;

                Ok(())
            }
            .scope_boxed()
        })
        .await
    }
}
