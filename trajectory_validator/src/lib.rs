//! Trajectory-based carpool validation: a pure scoring core plus a batch
//! job that scores yesterday's unvalidated driver/rider trip pairs.

pub mod error;
pub mod job;
pub mod repo;
pub mod types;
pub mod verify;

pub use error::TrajectoryError;
pub use job::carpool_block_validation_job;
pub use repo::{PgTrajectoryRepo, TrajectoryRepo};
pub use types::{DuoValidatedResult, TrajectoryPoint, TripPairToValidate};
pub use verify::{haversine_m, verify_group, verify_trajectory_match};
