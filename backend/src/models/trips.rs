use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::requests::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "trip_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripStatus {
    Planned,
    Ready,
    Arrived,
    OnTrip,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "stop_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopType {
    Pickup,
    Dropoff,
}

/// One vehicle's scheduled movement for one direction.
///
/// Status advances (Planned → ... → Completed) are driven by the driver-facing
/// surface, not by the matching engine.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Trip {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub direction: Direction,
    pub status: TripStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// One scheduled pickup or dropoff point within a trip.
///
/// `sequence` is contiguous starting at 1 and `scheduled_time` never decreases
/// along the sequence. `actual_time` is set by the driver check-in surface.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Stop {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub stop_type: StopType,
    pub sequence: i32,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    pub scheduled_time: DateTime<Utc>,
    pub actual_time: Option<DateTime<Utc>>,
    pub customer_id: Uuid,
}
