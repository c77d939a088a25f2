//! In-memory store used by the test suite and by `STORE_BACKEND=memory`
//! deployments with no database configured. One mutex over plain maps, so
//! every composite operation is trivially atomic.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    Booking, Driver, Proposal, ProposalStatus, RequestStatus, RideRequest, Stop, Trip, Vehicle,
};

use super::{Store, StoreError};

#[derive(Default)]
struct Inner {
    requests: HashMap<Uuid, RideRequest>,
    drivers: HashMap<Uuid, Driver>,
    vehicles: Vec<Vehicle>,
    trips: HashMap<Uuid, Trip>,
    stops: HashMap<Uuid, Vec<Stop>>,
    proposals: HashMap<Uuid, Proposal>,
    bookings: HashMap<Uuid, Booking>,
}

#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn locked(&self) -> MutexGuard<'_, Inner> {
        // Nothing panics while holding the lock, but recover anyway.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Store for InMemoryStore {
    async fn insert_request(&self, request: &RideRequest) -> Result<(), StoreError> {
        self.locked().requests.insert(request.id, request.clone());
        Ok(())
    }

    async fn get_request(&self, id: Uuid) -> Result<Option<RideRequest>, StoreError> {
        Ok(self.locked().requests.get(&id).cloned())
    }

    async fn list_requests_by_status(
        &self,
        status: RequestStatus,
    ) -> Result<Vec<RideRequest>, StoreError> {
        let mut requests: Vec<RideRequest> = self
            .locked()
            .requests
            .values()
            .filter(|r| r.status == status)
            .cloned()
            .collect();
        requests.sort_by_key(|r| (r.created_at, r.id));
        Ok(requests)
    }

    async fn transition_request(
        &self,
        id: Uuid,
        from: RequestStatus,
        to: RequestStatus,
    ) -> Result<bool, StoreError> {
        let mut inner = self.locked();
        match inner.requests.get_mut(&id) {
            Some(request) if request.status == from => {
                request.status = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn transition_requests(
        &self,
        ids: &[Uuid],
        from: RequestStatus,
        to: RequestStatus,
    ) -> Result<bool, StoreError> {
        let mut inner = self.locked();
        let all_match = ids
            .iter()
            .all(|id| inner.requests.get(id).is_some_and(|r| r.status == from));
        if !all_match {
            return Ok(false);
        }
        for id in ids {
            if let Some(request) = inner.requests.get_mut(id) {
                request.status = to;
            }
        }
        Ok(true)
    }

    async fn insert_driver(&self, driver: &Driver) -> Result<(), StoreError> {
        self.locked().drivers.insert(driver.id, driver.clone());
        Ok(())
    }

    async fn insert_vehicle(&self, vehicle: &Vehicle) -> Result<(), StoreError> {
        self.locked().vehicles.push(vehicle.clone());
        Ok(())
    }

    async fn first_active_vehicle(&self) -> Result<Option<Vehicle>, StoreError> {
        Ok(self.locked().vehicles.iter().find(|v| v.active).cloned())
    }

    async fn insert_trip_with_stops(&self, trip: &Trip, stops: &[Stop]) -> Result<(), StoreError> {
        let mut inner = self.locked();
        inner.trips.insert(trip.id, trip.clone());
        inner.stops.insert(trip.id, stops.to_vec());
        Ok(())
    }

    async fn list_trips(&self) -> Result<Vec<Trip>, StoreError> {
        let mut trips: Vec<Trip> = self.locked().trips.values().cloned().collect();
        trips.sort_by_key(|t| (t.created_at, t.id));
        Ok(trips)
    }

    async fn list_stops(&self, trip_id: Uuid) -> Result<Vec<Stop>, StoreError> {
        let mut stops = self.locked().stops.get(&trip_id).cloned().unwrap_or_default();
        stops.sort_by_key(|s| s.sequence);
        Ok(stops)
    }

    async fn insert_proposal(&self, proposal: &Proposal) -> Result<(), StoreError> {
        let mut inner = self.locked();
        for existing in inner.proposals.values_mut() {
            if existing.request_id == proposal.request_id
                && existing.status == ProposalStatus::Active
            {
                existing.status = ProposalStatus::Rejected;
            }
        }
        inner.proposals.insert(proposal.id, proposal.clone());
        Ok(())
    }

    async fn get_proposal(&self, id: Uuid) -> Result<Option<Proposal>, StoreError> {
        Ok(self.locked().proposals.get(&id).cloned())
    }

    async fn active_proposal_for_request(
        &self,
        request_id: Uuid,
    ) -> Result<Option<Proposal>, StoreError> {
        Ok(self
            .locked()
            .proposals
            .values()
            .find(|p| p.request_id == request_id && p.status == ProposalStatus::Active)
            .cloned())
    }

    async fn finalize_acceptance(
        &self,
        proposal_id: Uuid,
        now: DateTime<Utc>,
        booking: &Booking,
    ) -> Result<bool, StoreError> {
        let mut inner = self.locked();
        let Some(proposal) = inner.proposals.get_mut(&proposal_id) else {
            return Ok(false);
        };
        if proposal.status != ProposalStatus::Active || proposal.expires_at < now {
            return Ok(false);
        }
        proposal.status = ProposalStatus::Accepted;
        let request_id = proposal.request_id;
        inner.bookings.insert(booking.id, booking.clone());
        if let Some(request) = inner.requests.get_mut(&request_id) {
            request.status = RequestStatus::Confirmed;
        }
        Ok(true)
    }

    async fn reject_proposal(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.locked();
        let Some(proposal) = inner.proposals.get_mut(&id) else {
            return Ok(false);
        };
        if proposal.status != ProposalStatus::Active {
            return Ok(false);
        }
        proposal.status = ProposalStatus::Rejected;
        let request_id = proposal.request_id;
        if let Some(request) = inner.requests.get_mut(&request_id) {
            request.status = RequestStatus::Requested;
        }
        Ok(true)
    }

    async fn expire_proposals_before(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Proposal>, StoreError> {
        let mut inner = self.locked();
        let mut expired = Vec::new();
        for proposal in inner.proposals.values_mut() {
            if proposal.status == ProposalStatus::Active && proposal.expires_at < now {
                proposal.status = ProposalStatus::Expired;
                expired.push(proposal.clone());
            }
        }
        expired.sort_by_key(|p| (p.created_at, p.id));
        Ok(expired)
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        Ok(self.locked().bookings.get(&id).cloned())
    }
}
