//! Greedy single-pass grouping of compatible requests, run independently per
//! direction. Earlier desired times anchor groups; the same input set always
//! yields the same groups.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use crate::models::{Direction, Location, RequestStatus, RideRequest};

use super::MatchingConfig;
use super::geo::within_radius;

/// Ephemeral result of one grouping pass. Never persisted; consumed by the
/// trip composer within the same matching run.
#[derive(Debug, Clone)]
pub struct MatchGroup {
    pub direction: Direction,
    pub members: Vec<RideRequest>,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub center: Location,
}

impl MatchGroup {
    pub fn member_ids(&self) -> Vec<Uuid> {
        self.members.iter().map(|m| m.id).collect()
    }
}

/// Partitions the REQUESTED pool into shared-trip groups, outbound first then
/// return. Requests left over (singletons, bad coordinates) are untouched and
/// stay eligible for the next run.
pub fn find_matchable_groups(pool: &[RideRequest], cfg: &MatchingConfig) -> Vec<MatchGroup> {
    let mut groups = group_direction(pool, Direction::Outbound, cfg);
    groups.extend(group_direction(pool, Direction::Return, cfg));
    groups
}

fn group_direction(
    pool: &[RideRequest],
    direction: Direction,
    cfg: &MatchingConfig,
) -> Vec<MatchGroup> {
    let window = cfg.window_for(direction);

    let mut candidates: Vec<&RideRequest> = pool
        .iter()
        .filter(|r| r.status == RequestStatus::Requested)
        .collect();
    candidates.sort_by_key(|r| (r.desired_time(direction), r.id));

    let mut processed: HashSet<Uuid> = HashSet::new();
    let mut groups = Vec::new();

    for anchor in &candidates {
        if processed.contains(&anchor.id) {
            continue;
        }
        if !anchor.matchable_on(direction) {
            // Unmatchable until coordinates are fixed upstream; stays REQUESTED.
            warn!(
                "request {} has unusable coordinates for {:?} leg, skipping",
                anchor.id, direction
            );
            continue;
        }

        let anchor_time = anchor.desired_time(direction);
        let window_start = anchor_time - window;
        let window_end = anchor_time + window;
        let center = anchor.boarding_location(direction);

        let mut members: Vec<RideRequest> = Vec::new();
        for candidate in &candidates {
            if members.len() == cfg.max_group_size {
                break;
            }
            if processed.contains(&candidate.id) {
                continue;
            }
            let time = candidate.desired_time(direction);
            if time > window_end {
                // Candidates are time-sorted, nothing further can fit.
                break;
            }
            if time < window_start {
                continue;
            }
            if !candidate.matchable_on(direction) {
                continue;
            }
            if !within_radius(center, candidate.boarding_location(direction), cfg.radius_km) {
                continue;
            }
            members.push((*candidate).clone());
        }

        // No single-rider trips: leave the anchor for the next run.
        if members.len() >= cfg.min_group_size {
            for member in &members {
                processed.insert(member.id);
            }
            groups.push(MatchGroup {
                direction,
                members,
                window_start,
                window_end,
                center: center.clone(),
            });
        }
    }

    groups
}
