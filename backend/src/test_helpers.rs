//! Shared builders for the unit tests. Compiled only for `cfg(test)`.

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use crate::matching::MatchingConfig;
use crate::matching::grouping::MatchGroup;
use crate::models::{
    Booking, Direction, Driver, Location, Proposal, ProposalStatus, RequestStatus, RideRequest,
    Stop, Trip, Vehicle,
};
use crate::services::payments::{PaymentError, PaymentProvider, PaymentReceipt};
use crate::store::{InMemoryStore, Store, StoreError};

/// A fixed test day, `hour:minute` UTC.
pub fn ts(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, hour, minute, 0).unwrap()
}

/// Symmetric ±60 minute windows so scenarios read the same for both legs.
pub fn test_config() -> MatchingConfig {
    MatchingConfig {
        outbound_window: Duration::minutes(60),
        return_window: Duration::minutes(60),
        ..MatchingConfig::default()
    }
}

/// A round-trip request picked up at `(lat, lng)`, heading to a shared
/// destination, returning 8 hours later.
pub fn request_at(pickup_time: DateTime<Utc>, lat: f64, lng: f64) -> RideRequest {
    let pickup = Location {
        address: format!("{lat:.3}, {lng:.3}"),
        lat,
        lng,
    };
    let destination = Location {
        address: "Community Center".into(),
        lat: 52.520,
        lng: 13.430,
    };
    RideRequest {
        id: Uuid::new_v4(),
        customer_id: Uuid::new_v4(),
        pickup: pickup.clone(),
        dropoff: destination.clone(),
        return_point: destination,
        home: pickup,
        desired_pickup_time: pickup_time,
        desired_return_time: pickup_time + Duration::hours(8),
        passenger_count: 1,
        status: RequestStatus::Requested,
        created_at: pickup_time - Duration::hours(2),
    }
}

/// A group anchored on its first member, as the grouping pass would build it.
pub fn group_of(
    direction: Direction,
    members: Vec<RideRequest>,
    cfg: &MatchingConfig,
) -> MatchGroup {
    let window = cfg.window_for(direction);
    let anchor_time = members[0].desired_time(direction);
    let center = members[0].boarding_location(direction).clone();
    MatchGroup {
        direction,
        window_start: anchor_time - window,
        window_end: anchor_time + window,
        center,
        members,
    }
}

/// A bare ACTIVE proposal for `request_id` (no trip legs attached).
pub fn proposal_for(request_id: Uuid, expires_at: DateTime<Utc>) -> Proposal {
    Proposal {
        id: Uuid::new_v4(),
        request_id,
        outbound_trip_id: None,
        return_trip_id: None,
        pickup_time: None,
        dropoff_time: None,
        return_pickup_time: None,
        return_dropoff_time: None,
        price_cents: 1850,
        status: ProposalStatus::Active,
        expires_at,
        created_at: expires_at - Duration::minutes(30),
    }
}

/// Store wrapper that fails selected operations, for exercising the failure
/// isolation paths. Everything else delegates to an [`InMemoryStore`].
pub struct FaultyStore {
    pub inner: InMemoryStore,
    pub fail_trip_inserts: bool,
    pub fail_proposal_inserts: bool,
    pub deny_finalize: bool,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryStore::new(),
            fail_trip_inserts: false,
            fail_proposal_inserts: false,
            deny_finalize: false,
        }
    }
}

impl Store for FaultyStore {
    async fn insert_request(&self, request: &RideRequest) -> Result<(), StoreError> {
        self.inner.insert_request(request).await
    }

    async fn get_request(&self, id: Uuid) -> Result<Option<RideRequest>, StoreError> {
        self.inner.get_request(id).await
    }

    async fn list_requests_by_status(
        &self,
        status: RequestStatus,
    ) -> Result<Vec<RideRequest>, StoreError> {
        self.inner.list_requests_by_status(status).await
    }

    async fn transition_request(
        &self,
        id: Uuid,
        from: RequestStatus,
        to: RequestStatus,
    ) -> Result<bool, StoreError> {
        self.inner.transition_request(id, from, to).await
    }

    async fn transition_requests(
        &self,
        ids: &[Uuid],
        from: RequestStatus,
        to: RequestStatus,
    ) -> Result<bool, StoreError> {
        self.inner.transition_requests(ids, from, to).await
    }

    async fn insert_driver(&self, driver: &Driver) -> Result<(), StoreError> {
        self.inner.insert_driver(driver).await
    }

    async fn insert_vehicle(&self, vehicle: &Vehicle) -> Result<(), StoreError> {
        self.inner.insert_vehicle(vehicle).await
    }

    async fn first_active_vehicle(&self) -> Result<Option<Vehicle>, StoreError> {
        self.inner.first_active_vehicle().await
    }

    async fn insert_trip_with_stops(&self, trip: &Trip, stops: &[Stop]) -> Result<(), StoreError> {
        if self.fail_trip_inserts {
            return Err(StoreError::Conflict("trip insert failed".into()));
        }
        self.inner.insert_trip_with_stops(trip, stops).await
    }

    async fn list_trips(&self) -> Result<Vec<Trip>, StoreError> {
        self.inner.list_trips().await
    }

    async fn list_stops(&self, trip_id: Uuid) -> Result<Vec<Stop>, StoreError> {
        self.inner.list_stops(trip_id).await
    }

    async fn insert_proposal(&self, proposal: &Proposal) -> Result<(), StoreError> {
        if self.fail_proposal_inserts {
            return Err(StoreError::Conflict("proposal insert failed".into()));
        }
        self.inner.insert_proposal(proposal).await
    }

    async fn get_proposal(&self, id: Uuid) -> Result<Option<Proposal>, StoreError> {
        self.inner.get_proposal(id).await
    }

    async fn active_proposal_for_request(
        &self,
        request_id: Uuid,
    ) -> Result<Option<Proposal>, StoreError> {
        self.inner.active_proposal_for_request(request_id).await
    }

    async fn finalize_acceptance(
        &self,
        proposal_id: Uuid,
        now: DateTime<Utc>,
        booking: &Booking,
    ) -> Result<bool, StoreError> {
        if self.deny_finalize {
            // Simulates losing the accept race: the commit refuses, nothing
            // changes.
            return Ok(false);
        }
        self.inner.finalize_acceptance(proposal_id, now, booking).await
    }

    async fn reject_proposal(&self, id: Uuid) -> Result<bool, StoreError> {
        self.inner.reject_proposal(id).await
    }

    async fn expire_proposals_before(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Proposal>, StoreError> {
        self.inner.expire_proposals_before(now).await
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        self.inner.get_booking(id).await
    }
}

/// Payment provider that accepts everything and counts calls.
pub struct RecordingPayments {
    pub charges: AtomicUsize,
    pub refunds: AtomicUsize,
}

impl RecordingPayments {
    pub fn new() -> Self {
        Self {
            charges: AtomicUsize::new(0),
            refunds: AtomicUsize::new(0),
        }
    }

    pub fn charge_count(&self) -> usize {
        self.charges.load(Ordering::SeqCst)
    }

    pub fn refund_count(&self) -> usize {
        self.refunds.load(Ordering::SeqCst)
    }
}

impl PaymentProvider for RecordingPayments {
    fn charge(
        &self,
        _amount_cents: i64,
        _booking_ref: Uuid,
    ) -> Result<PaymentReceipt, PaymentError> {
        self.charges.fetch_add(1, Ordering::SeqCst);
        Ok(PaymentReceipt {
            transaction_id: "txn_recorded".into(),
        })
    }

    fn refund(&self, _transaction_id: &str, _amount_cents: i64) -> Result<(), PaymentError> {
        self.refunds.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Payment provider that declines every charge.
pub struct FailingPayments;

impl PaymentProvider for FailingPayments {
    fn charge(
        &self,
        _amount_cents: i64,
        _booking_ref: Uuid,
    ) -> Result<PaymentReceipt, PaymentError> {
        Err(PaymentError("card declined".into()))
    }

    fn refund(&self, _transaction_id: &str, _amount_cents: i64) -> Result<(), PaymentError> {
        Ok(())
    }
}
