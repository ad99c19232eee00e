use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single GPS fix as stored in `trip_trajectories.points`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub timestamp: DateTime<Utc>,
    pub lat: f64,
    pub lng: f64,
    pub speed: f64,
}

/// A driver/rider trip pair awaiting validation, with the pickup→dropoff
/// window to score over.
#[derive(Debug, Clone, Copy)]
pub struct TripPairToValidate {
    pub driver_trip_id: i64,
    pub rider_trip_id: i64,
    pub start_ts: DateTime<Utc>,
    pub end_ts: DateTime<Utc>,
}

/// Validation status codes written to `duo_validated_results`.
pub const VALIDATION_STATUS_FAILED: i32 = 1;
pub const VALIDATION_STATUS_PASSED: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuoValidatedResult {
    pub driver_trip_id: i64,
    pub rider_trip_id: i64,
    pub validation_status: i32,
    pub passed: i32,
    pub score: i32,
}

impl DuoValidatedResult {
    pub fn from_score(driver_trip_id: i64, rider_trip_id: i64, score: i32) -> Self {
        if score > 35 {
            Self {
                driver_trip_id,
                rider_trip_id,
                validation_status: VALIDATION_STATUS_PASSED,
                passed: 1,
                score: 100,
            }
        } else {
            Self {
                driver_trip_id,
                rider_trip_id,
                validation_status: VALIDATION_STATUS_FAILED,
                passed: 0,
                score,
            }
        }
    }
}
