use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{is_valid_latitude, is_valid_longitude};

/// A geocoded point. Geocoding happens upstream; the engine only ever sees
/// resolved coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub address: String,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub fn has_valid_coordinates(&self) -> bool {
        is_valid_latitude(self.lat) && is_valid_longitude(self.lng)
    }
}

/// Which half of the round trip a group/trip serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "trip_direction", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Outbound,
    Return,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "request_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Requested,
    Proposed,
    Confirmed,
    Cancelled,
}

/// One customer's round-trip need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RideRequest {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub pickup: Location,
    pub dropoff: Location,
    pub return_point: Location,
    pub home: Location,
    pub desired_pickup_time: DateTime<Utc>,
    pub desired_return_time: DateTime<Utc>,
    pub passenger_count: i32,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

impl RideRequest {
    /// The desired time relevant for grouping on the given leg.
    pub fn desired_time(&self, direction: Direction) -> DateTime<Utc> {
        match direction {
            Direction::Outbound => self.desired_pickup_time,
            Direction::Return => self.desired_return_time,
        }
    }

    /// Where the customer boards on the given leg.
    pub fn boarding_location(&self, direction: Direction) -> &Location {
        match direction {
            Direction::Outbound => &self.pickup,
            Direction::Return => &self.return_point,
        }
    }

    /// Where the customer alights on the given leg.
    pub fn alighting_location(&self, direction: Direction) -> &Location {
        match direction {
            Direction::Outbound => &self.dropoff,
            Direction::Return => &self.home,
        }
    }

    /// A request with unusable coordinates on a leg can never satisfy the
    /// radius predicate for that leg.
    pub fn matchable_on(&self, direction: Direction) -> bool {
        self.boarding_location(direction).has_valid_coordinates()
            && self.alighting_location(direction).has_valid_coordinates()
    }
}
