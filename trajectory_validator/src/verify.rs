//! Pure, DB-free trajectory matching score. No I/O; the batch job in
//! [`crate::job`] is the only caller that touches the database.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::types::TrajectoryPoint;

const EARTH_RADIUS_M: f64 = 6_378_137.0;
const SLOT_SECONDS: i64 = 5;
const PROXIMITY_THRESHOLD_M: f64 = 100.0;
const EARLY_TERMINATION_SCORE: u32 = 36;

/// Great-circle distance between two points, in meters.
pub fn haversine_m(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (lat1, lng1) = a;
    let (lat2, lng2) = b;

    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();

    let sin_d_phi = (d_phi / 2.0).sin();
    let sin_d_lambda = (d_lambda / 2.0).sin();

    let h = sin_d_phi * sin_d_phi + phi1.cos() * phi2.cos() * sin_d_lambda * sin_d_lambda;
    let c = 2.0 * h.sqrt().asin();

    EARTH_RADIUS_M * c
}

fn bucket_by_slot(points: &[TrajectoryPoint], start_ts: DateTime<Utc>) -> BTreeMap<i64, Vec<TrajectoryPoint>> {
    let mut slots: BTreeMap<i64, Vec<TrajectoryPoint>> = BTreeMap::new();
    for p in points {
        let offset_s = (p.timestamp - start_ts).num_seconds();
        let slot = offset_s.div_euclid(SLOT_SECONDS);
        slots.entry(slot).or_default().push(*p);
    }
    slots
}

/// 1 if any driver/rider pair in the slot is within 100m and both are
/// moving; else 0.
pub fn verify_group(driver_slot: &[TrajectoryPoint], rider_slot: &[TrajectoryPoint]) -> u32 {
    for a in driver_slot {
        if a.speed <= 0.0 {
            continue;
        }
        for b in rider_slot {
            if b.speed <= 0.0 {
                continue;
            }
            if haversine_m((a.lat, a.lng), (b.lat, b.lng)) <= PROXIMITY_THRESHOLD_M {
                return 1;
            }
        }
    }
    0
}

/// Scores a driver/rider trajectory pair over `[start_ts, end_ts]`.
///
/// Buckets both trajectories into 5-second slots, walks the common slot
/// indices in order, and accumulates [`verify_group`] per slot. Stops early
/// once the cumulative score reaches 36, per the batch job's pass threshold
/// of >35.
pub fn verify_trajectory_match(
    driver_points: &[TrajectoryPoint],
    rider_points: &[TrajectoryPoint],
    start_ts: DateTime<Utc>,
) -> u32 {
    let driver_slots = bucket_by_slot(driver_points, start_ts);
    let rider_slots = bucket_by_slot(rider_points, start_ts);

    let mut score = 0u32;
    for (slot, driver_slot) in &driver_slots {
        let Some(rider_slot) = rider_slots.get(slot) else { continue };
        score += verify_group(driver_slot, rider_slot);
        if score >= EARLY_TERMINATION_SCORE {
            break;
        }
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(offset_s: i64, lat: f64, lng: f64, speed: f64, base: DateTime<Utc>) -> TrajectoryPoint {
        TrajectoryPoint { timestamp: base + chrono::Duration::seconds(offset_s), lat, lng, speed }
    }

    #[test]
    fn haversine_zero_distance() {
        assert!(haversine_m((41.8781, -87.6298), (41.8781, -87.6298)) < 1e-6);
    }

    #[test]
    fn haversine_known_distance_roughly_111km_per_degree_latitude() {
        let d = haversine_m((0.0, 0.0), (1.0, 0.0));
        assert!((d - 111_195.0).abs() < 500.0);
    }

    #[test]
    fn verify_group_requires_both_moving() {
        let driver = vec![TrajectoryPoint { timestamp: Utc::now(), lat: 0.0, lng: 0.0, speed: 0.0 }];
        let rider = vec![TrajectoryPoint { timestamp: Utc::now(), lat: 0.0, lng: 0.0, speed: 5.0 }];
        assert_eq!(verify_group(&driver, &rider), 0);
    }

    #[test]
    fn verify_group_matches_within_threshold() {
        let driver = vec![TrajectoryPoint { timestamp: Utc::now(), lat: 0.0, lng: 0.0, speed: 5.0 }];
        let rider = vec![TrajectoryPoint { timestamp: Utc::now(), lat: 0.0005, lng: 0.0, speed: 5.0 }];
        assert_eq!(verify_group(&driver, &rider), 1);
    }

    #[test]
    fn verify_trajectory_match_sums_matching_slots() {
        let base = Utc::now();
        let driver = vec![pt(0, 0.0, 0.0, 5.0, base), pt(10, 0.0, 0.0, 5.0, base)];
        let rider = vec![pt(0, 0.0, 0.0, 5.0, base), pt(10, 0.0, 0.0, 5.0, base)];
        assert_eq!(verify_trajectory_match(&driver, &rider, base), 2);
    }

    #[test]
    fn verify_trajectory_match_stops_early_at_threshold() {
        let base = Utc::now();
        let driver: Vec<_> = (0..50).map(|i| pt(i * 5, 0.0, 0.0, 5.0, base)).collect();
        let rider: Vec<_> = (0..50).map(|i| pt(i * 5, 0.0, 0.0, 5.0, base)).collect();
        assert_eq!(verify_trajectory_match(&driver, &rider, base), 36);
    }

    #[test]
    fn non_overlapping_slots_score_zero() {
        let base = Utc::now();
        let driver = vec![pt(0, 0.0, 0.0, 5.0, base)];
        let rider = vec![pt(1000, 0.0, 0.0, 5.0, base)];
        assert_eq!(verify_trajectory_match(&driver, &rider, base), 0);
    }
}
