//! Diesel-backed reads/writes for parking events, the ParkMobile OAuth
//! token table, and the price/event-history purge targets.

use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use portal_db::error::DbError;
use portal_db::pool::PgPool;
use portal_db::schema::{pm_api_tokens, pm_parking_events, pm_parking_events_history, pm_price_objects};

use crate::error::MonitorError;
use crate::types::{ParkingEvent, ParkingEventStatus};

pub struct MonitorRepo {
    pool: PgPool,
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = pm_parking_events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct EventRow {
    id: i64,
    user_id: i64,
    parking_start_time_utc: DateTime<Utc>,
    parking_stop_time_utc: DateTime<Utc>,
    alert_before: Option<i32>,
    alert_at: Option<DateTime<Utc>>,
    status: String,
}

impl EventRow {
    fn into_domain(self) -> Option<ParkingEvent> {
        Some(ParkingEvent {
            id: self.id,
            user_id: self.user_id,
            parking_start_time_utc: self.parking_start_time_utc,
            parking_stop_time_utc: self.parking_stop_time_utc,
            alert_before: self.alert_before,
            alert_at: self.alert_at,
            status: ParkingEventStatus::from_str(&self.status)?,
        })
    }
}

impl MonitorRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// `ON_GOING` events with `alert_before` set and `alert_at` within the
    /// 5-minute look-ahead window.
    pub async fn find_due_alerts(&self, now: DateTime<Utc>) -> Result<Vec<ParkingEvent>, MonitorError> {
        let mut conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;
        let window_end = now + Duration::minutes(5);

        let rows: Vec<EventRow> = pm_parking_events::table
            .filter(pm_parking_events::status.eq(ParkingEventStatus::OnGoing.as_str()))
            .filter(pm_parking_events::alert_before.is_not_null())
            .filter(pm_parking_events::alert_at.is_not_null())
            .filter(pm_parking_events::alert_at.ge(now))
            .filter(pm_parking_events::alert_at.le(window_end))
            .select(EventRow::as_select())
            .load(&mut conn)
            .await
            .map_err(DbError::from)?;

        Ok(rows.into_iter().filter_map(EventRow::into_domain).collect())
    }

    /// Batched transition to `ALERTED` for exactly the given ids — only
    /// rows whose notification enqueue succeeded.
    pub async fn mark_alerted(&self, ids: &[i64]) -> Result<usize, MonitorError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;

        diesel::update(pm_parking_events::table.filter(pm_parking_events::id.eq_any(ids)))
            .set(pm_parking_events::status.eq(ParkingEventStatus::Alerted.as_str()))
            .execute(&mut conn)
            .await
            .map_err(|e| MonitorError::Db(DbError::from(e)))
    }

    /// `UPDATE … SET status=EXPIRED WHERE status IN (ON_GOING, ALERTED,
    /// FINISHED) AND parking_stop_time_utc <= now - 24h`.
    pub async fn expire_overdue(&self, now: DateTime<Utc>) -> Result<usize, MonitorError> {
        let mut conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;
        let cutoff = now - Duration::hours(24);

        diesel::update(
            pm_parking_events::table
                .filter(pm_parking_events::status.eq_any([
                    ParkingEventStatus::OnGoing.as_str(),
                    ParkingEventStatus::Alerted.as_str(),
                    ParkingEventStatus::Finished.as_str(),
                ]))
                .filter(pm_parking_events::parking_stop_time_utc.le(cutoff)),
        )
        .set(pm_parking_events::status.eq(ParkingEventStatus::Expired.as_str()))
        .execute(&mut conn)
        .await
        .map_err(|e| MonitorError::Db(DbError::from(e)))
    }

    /// `UPDATE … SET status=FINISHED WHERE status IN (ON_GOING, ALERTED)
    /// AND parking_stop_time_utc <= now`.
    pub async fn finish_ended(&self, now: DateTime<Utc>) -> Result<usize, MonitorError> {
        let mut conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;

        diesel::update(
            pm_parking_events::table
                .filter(pm_parking_events::status.eq_any([
                    ParkingEventStatus::OnGoing.as_str(),
                    ParkingEventStatus::Alerted.as_str(),
                ]))
                .filter(pm_parking_events::parking_stop_time_utc.le(now)),
        )
        .set(pm_parking_events::status.eq(ParkingEventStatus::Finished.as_str()))
        .execute(&mut conn)
        .await
        .map_err(|e| MonitorError::Db(DbError::from(e)))
    }

    /// Persists a freshly minted ParkMobile OAuth token, then deletes rows
    /// expiring within the next minute.
    pub async fn store_token_and_prune(
        &self,
        token: &str,
        expires: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), MonitorError> {
        let mut conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;

        diesel::insert_into(pm_api_tokens::table)
            .values((pm_api_tokens::token.eq(token), pm_api_tokens::expires.eq(expires)))
            .execute(&mut conn)
            .await
            .map_err(DbError::from)?;

        diesel::delete(
            pm_api_tokens::table.filter(pm_api_tokens::expires.le(now + Duration::minutes(1))),
        )
        .execute(&mut conn)
        .await
        .map_err(|e| MonitorError::Db(DbError::from(e)))?;

        Ok(())
    }

    /// Deletes `PmPriceObjects` older than 30d and `PmParkingEvents`
    /// history older than 90d.
    pub async fn purge_outdated_cache(&self, now: DateTime<Utc>) -> Result<(usize, usize), MonitorError> {
        let mut conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;

        let price_cutoff = now - Duration::days(30);
        let history_cutoff = now - Duration::days(90);

        let prices = diesel::delete(
            pm_price_objects::table.filter(pm_price_objects::created_on.le(price_cutoff)),
        )
        .execute(&mut conn)
        .await
        .map_err(DbError::from)?;

        let history = diesel::delete(
            pm_parking_events_history::table
                .filter(pm_parking_events_history::created_on.le(history_cutoff)),
        )
        .execute(&mut conn)
        .await
        .map_err(|e| MonitorError::Db(DbError::from(e)))?;

        Ok((prices, history))
    }
}
