use chrono::{DateTime, Utc};

/// ParkMobile notification type code for the pre-expiry alert.
pub const PARKMOBILE_ALERT_NOTIFICATION_TYPE: i32 = 97;

/// Parking event lifecycle. `Expired` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParkingEventStatus {
    OnGoing,
    Alerted,
    Finished,
    Expired,
}

impl ParkingEventStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ParkingEventStatus::OnGoing => "ON_GOING",
            ParkingEventStatus::Alerted => "ALERTED",
            ParkingEventStatus::Finished => "FINISHED",
            ParkingEventStatus::Expired => "EXPIRED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "ON_GOING" => ParkingEventStatus::OnGoing,
            "ALERTED" => ParkingEventStatus::Alerted,
            "FINISHED" => ParkingEventStatus::Finished,
            "EXPIRED" => ParkingEventStatus::Expired,
            _ => return None,
        })
    }
}

/// A parking event row, as read for alert/expiry evaluation.
#[derive(Debug, Clone)]
pub struct ParkingEvent {
    pub id: i64,
    pub user_id: i64,
    pub parking_start_time_utc: DateTime<Utc>,
    pub parking_stop_time_utc: DateTime<Utc>,
    pub alert_before: Option<i32>,
    pub alert_at: Option<DateTime<Utc>>,
    pub status: ParkingEventStatus,
}
