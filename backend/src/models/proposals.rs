use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "proposal_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposalStatus {
    Active,
    Accepted,
    Rejected,
    Expired,
}

/// A time-bounded offer binding a ride request to one or two trips.
///
/// Exactly one ACTIVE proposal may exist per request at any time; a proposal
/// past `expires_at` must never be accepted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Proposal {
    pub id: Uuid,
    pub request_id: Uuid,
    pub outbound_trip_id: Option<Uuid>,
    pub return_trip_id: Option<Uuid>,
    pub pickup_time: Option<DateTime<Utc>>,
    pub dropoff_time: Option<DateTime<Utc>>,
    pub return_pickup_time: Option<DateTime<Utc>>,
    pub return_dropoff_time: Option<DateTime<Utc>>,
    pub price_cents: i64,
    pub status: ProposalStatus,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Proposal {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// The confirmed commercial outcome of an accepted proposal. Created exactly
/// once per accepted proposal, inside the accept transaction.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Booking {
    pub id: Uuid,
    pub proposal_id: Uuid,
    pub request_id: Uuid,
    pub outbound_trip_id: Option<Uuid>,
    pub return_trip_id: Option<Uuid>,
    pub price_cents: i64,
    pub payment_txn_id: String,
    pub created_at: DateTime<Utc>,
}
