//! Injected collaborators for the batch validation job: trip-pair discovery,
//! trajectory point retrieval, and result persistence. Kept as a trait so
//! [`crate::job::carpool_block_validation_job`] can be exercised with a
//! fake in tests without a live database.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use portal_db::error::DbError;
use portal_db::pool::PgPool;
use portal_db::schema::{duo_validated_results, match_statistics, reservations, trip_trajectories};

use crate::error::TrajectoryError;
use crate::types::{DuoValidatedResult, TrajectoryPoint, TripPairToValidate};

const DRIVER_ROLE: i32 = 1;
const RIDER_ROLE: i32 = 2;

/// Fallback pickup→dropoff window when a matched pair has no recorded
/// dropoff estimate.
const DEFAULT_WINDOW_SECONDS: i64 = 3600;

#[async_trait]
pub trait TrajectoryRepo: Send + Sync {
    /// Driver/rider trip pairs created in `[since, until)` that don't yet
    /// have a `DuoValidatedResult` row.
    async fn unvalidated_trip_pairs(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<TripPairToValidate>, TrajectoryError>;

    async fn trajectory_points(&self, trip_id: i64) -> Result<Vec<TrajectoryPoint>, TrajectoryError>;

    async fn write_result(
        &self,
        result: DuoValidatedResult,
        now: DateTime<Utc>,
    ) -> Result<(), TrajectoryError>;
}

pub struct PgTrajectoryRepo {
    pool: PgPool,
}

impl PgTrajectoryRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TrajectoryRepo for PgTrajectoryRepo {
    async fn unvalidated_trip_pairs(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<TripPairToValidate>, TrajectoryError> {
        let mut conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;

        let matches: Vec<(i64, i64, Option<i32>)> = match_statistics::table
            .select((
                match_statistics::reservation_id,
                match_statistics::match_reservation_id,
                match_statistics::time_to_dropoff_s,
            ))
            .load(&mut conn)
            .await
            .map_err(DbError::from)?;

        if matches.is_empty() {
            return Ok(Vec::new());
        }

        let mut reservation_ids: HashSet<i64> = HashSet::new();
        for (a, b, _) in &matches {
            reservation_ids.insert(*a);
            reservation_ids.insert(*b);
        }
        let reservation_ids: Vec<i64> = reservation_ids.into_iter().collect();

        let reservation_rows: Vec<(i64, i64, i32)> = reservations::table
            .filter(reservations::id.eq_any(&reservation_ids))
            .select((reservations::id, reservations::user_id, reservations::role))
            .load(&mut conn)
            .await
            .map_err(DbError::from)?;
        let reservation_by_id: HashMap<i64, (i64, i32)> =
            reservation_rows.into_iter().map(|(id, user_id, role)| (id, (user_id, role))).collect();

        let user_ids: Vec<i64> = reservation_by_id.values().map(|(user_id, _)| *user_id).collect();
        let trip_rows: Vec<(i64, i64, DateTime<Utc>)> = trip_trajectories::table
            .filter(trip_trajectories::user_id.eq_any(&user_ids))
            .filter(trip_trajectories::created_on.ge(since))
            .filter(trip_trajectories::created_on.lt(until))
            .select((trip_trajectories::user_id, trip_trajectories::trip_id, trip_trajectories::created_on))
            .load(&mut conn)
            .await
            .map_err(DbError::from)?;
        let mut trips_by_user: HashMap<i64, Vec<(i64, DateTime<Utc>)>> = HashMap::new();
        for (user_id, trip_id, created_on) in trip_rows {
            trips_by_user.entry(user_id).or_default().push((trip_id, created_on));
        }

        let existing: HashSet<(i64, i64)> = duo_validated_results::table
            .select((duo_validated_results::driver_trip_id, duo_validated_results::rider_trip_id))
            .load(&mut conn)
            .await
            .map_err(DbError::from)?
            .into_iter()
            .collect();

        let mut pairs = Vec::new();
        for (reservation_a, reservation_b, dropoff_s) in matches {
            let Some(&(user_a, role_a)) = reservation_by_id.get(&reservation_a) else { continue };
            let Some(&(user_b, role_b)) = reservation_by_id.get(&reservation_b) else { continue };

            let (driver_user, rider_user) = match (role_a, role_b) {
                (DRIVER_ROLE, RIDER_ROLE) => (user_a, user_b),
                (RIDER_ROLE, DRIVER_ROLE) => (user_b, user_a),
                _ => continue,
            };

            let Some(driver_trips) = trips_by_user.get(&driver_user) else { continue };
            let Some(rider_trips) = trips_by_user.get(&rider_user) else { continue };

            for (driver_trip_id, start_ts) in driver_trips {
                for (rider_trip_id, _) in rider_trips {
                    if existing.contains(&(*driver_trip_id, *rider_trip_id)) {
                        continue;
                    }
                    let window = dropoff_s.map(i64::from).unwrap_or(DEFAULT_WINDOW_SECONDS);
                    pairs.push(TripPairToValidate {
                        driver_trip_id: *driver_trip_id,
                        rider_trip_id: *rider_trip_id,
                        start_ts: *start_ts,
                        end_ts: *start_ts + Duration::seconds(window),
                    });
                }
            }
        }

        Ok(pairs)
    }

    async fn trajectory_points(&self, trip_id: i64) -> Result<Vec<TrajectoryPoint>, TrajectoryError> {
        let mut conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;

        let rows: Vec<serde_json::Value> = trip_trajectories::table
            .filter(trip_trajectories::trip_id.eq(trip_id))
            .select(trip_trajectories::points)
            .load(&mut conn)
            .await
            .map_err(DbError::from)?;

        let mut points = Vec::new();
        for row in rows {
            let parsed: Vec<TrajectoryPoint> = serde_json::from_value(row)
                .map_err(|e| TrajectoryError::MalformedPoints { trip_id, reason: e.to_string() })?;
            points.extend(parsed);
        }
        Ok(points)
    }

    async fn write_result(
        &self,
        result: DuoValidatedResult,
        now: DateTime<Utc>,
    ) -> Result<(), TrajectoryError> {
        let mut conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;

        diesel::insert_into(duo_validated_results::table)
            .values((
                duo_validated_results::driver_trip_id.eq(result.driver_trip_id),
                duo_validated_results::rider_trip_id.eq(result.rider_trip_id),
                duo_validated_results::validation_status.eq(result.validation_status),
                duo_validated_results::passed.eq(result.passed),
                duo_validated_results::score.eq(result.score),
                duo_validated_results::created_on.eq(now),
            ))
            .execute(&mut conn)
            .await
            .map_err(DbError::from)?;

        Ok(())
    }
}
