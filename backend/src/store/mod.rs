pub mod memory;
pub mod migrations;
pub mod postgres;

use std::future::Future;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Booking, Driver, Proposal, RequestStatus, RideRequest, Stop, Trip, Vehicle,
};

pub use memory::InMemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store conflict: {0}")]
    Conflict(String),
}

/// The transactional store the engine is built against.
///
/// Every multi-row operation below is atomic in both implementations: the
/// engine relies on the compare-and-set transitions to stop two overlapping
/// matching runs from claiming the same request, and on `finalize_acceptance`
/// to keep the accept path all-or-nothing.
pub trait Store: Send + Sync + 'static {
    // --- ride requests ---
    fn insert_request(
        &self,
        request: &RideRequest,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn get_request(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<RideRequest>, StoreError>> + Send;

    fn list_requests_by_status(
        &self,
        status: RequestStatus,
    ) -> impl Future<Output = Result<Vec<RideRequest>, StoreError>> + Send;

    /// Compare-and-set a single request's status. Returns false when the
    /// request is absent or not currently in `from`.
    fn transition_request(
        &self,
        id: Uuid,
        from: RequestStatus,
        to: RequestStatus,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// All-or-nothing compare-and-set over several requests: either every id
    /// currently holds `from` and all move to `to`, or nothing changes.
    fn transition_requests(
        &self,
        ids: &[Uuid],
        from: RequestStatus,
        to: RequestStatus,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    // --- fleet ---
    fn insert_driver(&self, driver: &Driver)
    -> impl Future<Output = Result<(), StoreError>> + Send;

    fn insert_vehicle(
        &self,
        vehicle: &Vehicle,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn first_active_vehicle(
        &self,
    ) -> impl Future<Output = Result<Option<Vehicle>, StoreError>> + Send;

    // --- trips ---
    /// Persists a trip and all of its stops atomically.
    fn insert_trip_with_stops(
        &self,
        trip: &Trip,
        stops: &[Stop],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn list_trips(&self) -> impl Future<Output = Result<Vec<Trip>, StoreError>> + Send;

    /// Stops for a trip, in sequence order.
    fn list_stops(
        &self,
        trip_id: Uuid,
    ) -> impl Future<Output = Result<Vec<Stop>, StoreError>> + Send;

    // --- proposals ---
    /// Inserts a proposal, atomically superseding (marking REJECTED) any
    /// still-ACTIVE proposal for the same request first.
    fn insert_proposal(
        &self,
        proposal: &Proposal,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn get_proposal(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<Proposal>, StoreError>> + Send;

    fn active_proposal_for_request(
        &self,
        request_id: Uuid,
    ) -> impl Future<Output = Result<Option<Proposal>, StoreError>> + Send;

    /// Atomic accept commit: re-validates the proposal is still ACTIVE and
    /// unexpired at `now`, flips it to ACCEPTED, inserts the booking and sets
    /// the owning request to CONFIRMED. Returns false (changing nothing) when
    /// the validation fails.
    fn finalize_acceptance(
        &self,
        proposal_id: Uuid,
        now: DateTime<Utc>,
        booking: &Booking,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Atomic reject: ACTIVE proposal → REJECTED and its request → REQUESTED.
    /// Returns false when the proposal is absent or no longer ACTIVE.
    fn reject_proposal(&self, id: Uuid) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Bulk-expires every ACTIVE proposal with `expires_at < now`, returning
    /// the proposals that were expired.
    fn expire_proposals_before(
        &self,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<Proposal>, StoreError>> + Send;

    // --- bookings ---
    fn get_booking(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<Booking>, StoreError>> + Send;
}
