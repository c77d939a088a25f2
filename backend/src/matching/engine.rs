//! One matching run: snapshot the REQUESTED pool, group both directions,
//! claim and compose each group into a persisted trip, then issue exactly one
//! proposal per matched request. A group that fails to persist is logged and
//! released; it never aborts the batch.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{error, info};
use uuid::Uuid;

use crate::constants::{DEFAULT_DRIVER_NAME, DEFAULT_VEHICLE_CAPACITY};
use crate::error::EngineError;
use crate::models::{
    Direction, Driver, Proposal, ProposalStatus, RequestStatus, RideRequest, Stop, StopType, Trip,
    TripStatus, Vehicle,
};
use crate::services::notifier::Notifier;
use crate::store::Store;

use super::MatchingConfig;
use super::grouping::{MatchGroup, find_matchable_groups};
use super::pricing::leg_price_cents;
use super::stops::sequence_stops;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchingReport {
    pub groups_formed: usize,
    pub trips_created: usize,
    pub proposals_created: usize,
}

#[derive(Debug, Clone)]
struct LegSchedule {
    trip_id: Uuid,
    pickup_time: DateTime<Utc>,
    dropoff_time: DateTime<Utc>,
    price_cents: i64,
}

/// Accumulates a request's matched legs across the direction passes of one
/// run, so the request ends up with a single proposal covering both.
struct PendingOffer {
    request: RideRequest,
    outbound: Option<LegSchedule>,
    return_leg: Option<LegSchedule>,
}

pub async fn run_matching_batch<S: Store>(
    store: &S,
    notifier: &dyn Notifier,
    cfg: &MatchingConfig,
) -> Result<MatchingReport, EngineError> {
    let pool = store
        .list_requests_by_status(RequestStatus::Requested)
        .await?;
    let groups = find_matchable_groups(&pool, cfg);

    let mut report = MatchingReport::default();
    if groups.is_empty() {
        return Ok(report);
    }

    let mut claimed: HashSet<Uuid> = HashSet::new();
    let mut offers: Vec<PendingOffer> = Vec::new();
    let mut offer_index: HashMap<Uuid, usize> = HashMap::new();

    for group in &groups {
        match compose_group(store, group, cfg, &mut claimed).await {
            Ok(Some(legs)) => {
                report.groups_formed += 1;
                report.trips_created += 1;
                for (request, leg) in legs {
                    let index = *offer_index.entry(request.id).or_insert_with(|| {
                        offers.push(PendingOffer {
                            request,
                            outbound: None,
                            return_leg: None,
                        });
                        offers.len() - 1
                    });
                    match group.direction {
                        Direction::Outbound => offers[index].outbound = Some(leg),
                        Direction::Return => offers[index].return_leg = Some(leg),
                    }
                }
            }
            Ok(None) => {}
            Err(e) => {
                error!(
                    "❌ trip composition failed for {:?} group of {}: {}",
                    group.direction,
                    group.members.len(),
                    e
                );
            }
        }
    }

    let now = Utc::now();
    for offer in &offers {
        let proposal = build_proposal(offer, now, cfg);
        match store.insert_proposal(&proposal).await {
            Ok(()) => {
                report.proposals_created += 1;
                notifier.proposal_created(&proposal);
            }
            Err(e) => {
                error!(
                    "❌ failed to persist proposal for request {}: {}",
                    offer.request.id, e
                );
                // Release the claim so the request re-enters the next run.
                if let Err(release) = store
                    .transition_request(
                        offer.request.id,
                        RequestStatus::Proposed,
                        RequestStatus::Requested,
                    )
                    .await
                {
                    error!(
                        "failed to release request {} after proposal failure: {}",
                        offer.request.id, release
                    );
                }
            }
        }
    }

    info!(
        "✅ matching run complete: {} groups, {} trips, {} proposals",
        report.groups_formed, report.trips_created, report.proposals_created
    );
    Ok(report)
}

/// Claims the group's members (CAS REQUESTED→PROPOSED) and persists the trip.
/// Returns None when a concurrent run already claimed a member; on a
/// persistence failure this group's fresh claims are released before the
/// error propagates.
async fn compose_group<S: Store>(
    store: &S,
    group: &MatchGroup,
    cfg: &MatchingConfig,
    claimed: &mut HashSet<Uuid>,
) -> Result<Option<Vec<(RideRequest, LegSchedule)>>, EngineError> {
    let fresh: Vec<Uuid> = group
        .member_ids()
        .into_iter()
        .filter(|id| !claimed.contains(id))
        .collect();

    if !fresh.is_empty()
        && !store
            .transition_requests(&fresh, RequestStatus::Requested, RequestStatus::Proposed)
            .await?
    {
        info!(
            "skipping {:?} group of {}: members claimed by a concurrent run",
            group.direction,
            group.members.len()
        );
        return Ok(None);
    }

    match persist_trip(store, group, cfg).await {
        Ok(legs) => {
            claimed.extend(fresh);
            Ok(Some(legs))
        }
        Err(e) => {
            if !fresh.is_empty()
                && let Err(release) = store
                    .transition_requests(&fresh, RequestStatus::Proposed, RequestStatus::Requested)
                    .await
            {
                error!("failed to release claims after group failure: {}", release);
            }
            Err(e)
        }
    }
}

async fn persist_trip<S: Store>(
    store: &S,
    group: &MatchGroup,
    cfg: &MatchingConfig,
) -> Result<Vec<(RideRequest, LegSchedule)>, EngineError> {
    let vehicle = ensure_vehicle(store).await?;
    let drafts = sequence_stops(group, cfg);
    let now = Utc::now();

    let trip_id = Uuid::new_v4();
    let end_time = drafts
        .last()
        .map(|d| d.scheduled_time)
        .unwrap_or(group.window_start);
    let trip = Trip {
        id: trip_id,
        vehicle_id: vehicle.id,
        driver_id: vehicle.driver_id,
        direction: group.direction,
        status: TripStatus::Planned,
        start_time: group.window_start,
        end_time,
        created_at: now,
    };
    let stops: Vec<Stop> = drafts
        .iter()
        .map(|draft| Stop {
            id: Uuid::new_v4(),
            trip_id,
            stop_type: draft.stop_type,
            sequence: draft.sequence,
            address: draft.location.address.clone(),
            lat: draft.location.lat,
            lng: draft.location.lng,
            scheduled_time: draft.scheduled_time,
            actual_time: None,
            customer_id: draft.customer_id,
        })
        .collect();

    store.insert_trip_with_stops(&trip, &stops).await?;
    info!(
        "🚐 composed {:?} trip {} with {} stops for {} riders",
        group.direction,
        trip_id,
        stops.len(),
        group.members.len()
    );

    let legs = group
        .members
        .iter()
        .map(|member| {
            let scheduled = |stop_type: StopType| {
                drafts
                    .iter()
                    .find(|d| d.request_id == member.id && d.stop_type == stop_type)
                    .map(|d| d.scheduled_time)
                    .unwrap_or(group.window_start)
            };
            (
                member.clone(),
                LegSchedule {
                    trip_id,
                    pickup_time: scheduled(StopType::Pickup),
                    dropoff_time: scheduled(StopType::Dropoff),
                    price_cents: leg_price_cents(member, group.direction),
                },
            )
        })
        .collect();

    Ok(legs)
}

/// First-available vehicle policy. With no fleet configured at all, a default
/// driver and vehicle are provisioned once so matching can proceed.
async fn ensure_vehicle<S: Store>(store: &S) -> Result<Vehicle, EngineError> {
    if let Some(vehicle) = store.first_active_vehicle().await? {
        return Ok(vehicle);
    }

    let now = Utc::now();
    let driver = Driver {
        id: Uuid::new_v4(),
        name: DEFAULT_DRIVER_NAME.to_string(),
        phone: None,
        created_at: now,
    };
    store.insert_driver(&driver).await?;

    // ThreadRng is not Send; keep it out of scope before the next await.
    let plate = format!("POOL-{:04}", rand::rng().random_range(0..10_000));
    let vehicle = Vehicle {
        id: Uuid::new_v4(),
        driver_id: Some(driver.id),
        plate,
        capacity: DEFAULT_VEHICLE_CAPACITY,
        active: true,
        created_at: now,
    };
    store.insert_vehicle(&vehicle).await?;
    info!(
        "🚙 no active vehicle configured, provisioned default vehicle {}",
        vehicle.plate
    );
    Ok(vehicle)
}

fn build_proposal(offer: &PendingOffer, now: DateTime<Utc>, cfg: &MatchingConfig) -> Proposal {
    let price_cents = offer.outbound.as_ref().map_or(0, |l| l.price_cents)
        + offer.return_leg.as_ref().map_or(0, |l| l.price_cents);

    Proposal {
        id: Uuid::new_v4(),
        request_id: offer.request.id,
        outbound_trip_id: offer.outbound.as_ref().map(|l| l.trip_id),
        return_trip_id: offer.return_leg.as_ref().map(|l| l.trip_id),
        pickup_time: offer.outbound.as_ref().map(|l| l.pickup_time),
        dropoff_time: offer.outbound.as_ref().map(|l| l.dropoff_time),
        return_pickup_time: offer.return_leg.as_ref().map(|l| l.pickup_time),
        return_dropoff_time: offer.return_leg.as_ref().map(|l| l.dropoff_time),
        price_cents,
        status: ProposalStatus::Active,
        expires_at: now + cfg.proposal_expiry,
        created_at: now,
    }
}
