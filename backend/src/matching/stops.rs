//! Stop sequencing: all pickups first in group member order, then all
//! dropoffs, each offset from the previous stop by a fixed service time.
//! No path optimization; distances are local and capacity is small.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Location, StopType};

use super::MatchingConfig;
use super::grouping::MatchGroup;

/// A stop before it is bound to a persisted trip. `request_id` keeps the
/// link to the member so the engine can read per-request schedule times back
/// out when it builds proposals.
#[derive(Debug, Clone)]
pub struct StopDraft {
    pub stop_type: StopType,
    pub sequence: i32,
    pub location: Location,
    pub scheduled_time: DateTime<Utc>,
    pub customer_id: Uuid,
    pub request_id: Uuid,
}

pub fn sequence_stops(group: &MatchGroup, cfg: &MatchingConfig) -> Vec<StopDraft> {
    let mut drafts = Vec::with_capacity(group.members.len() * 2);
    let mut scheduled = group.window_start;
    let mut sequence = 1;

    for member in &group.members {
        drafts.push(StopDraft {
            stop_type: StopType::Pickup,
            sequence,
            location: member.boarding_location(group.direction).clone(),
            scheduled_time: scheduled,
            customer_id: member.customer_id,
            request_id: member.id,
        });
        sequence += 1;
        scheduled = scheduled + cfg.stop_service_time;
    }

    for member in &group.members {
        drafts.push(StopDraft {
            stop_type: StopType::Dropoff,
            sequence,
            location: member.alighting_location(group.direction).clone(),
            scheduled_time: scheduled,
            customer_id: member.customer_id,
            request_id: member.id,
        });
        sequence += 1;
        scheduled = scheduled + cfg.stop_service_time;
    }

    drafts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Direction;
    use crate::test_helpers::{group_of, request_at, test_config, ts};

    #[test]
    fn test_sequence_is_contiguous_from_one() {
        let cfg = test_config();
        let group = group_of(
            Direction::Outbound,
            vec![
                request_at(ts(9, 0), 52.500, 13.400),
                request_at(ts(9, 20), 52.502, 13.402),
                request_at(ts(9, 30), 52.503, 13.403),
            ],
            &cfg,
        );

        let drafts = sequence_stops(&group, &cfg);
        assert_eq!(drafts.len(), 6);
        for (i, draft) in drafts.iter().enumerate() {
            assert_eq!(draft.sequence, i as i32 + 1);
        }
    }

    #[test]
    fn test_all_pickups_precede_all_dropoffs() {
        let cfg = test_config();
        let group = group_of(
            Direction::Outbound,
            vec![
                request_at(ts(9, 0), 52.500, 13.400),
                request_at(ts(9, 20), 52.502, 13.402),
            ],
            &cfg,
        );

        let drafts = sequence_stops(&group, &cfg);
        let types: Vec<StopType> = drafts.iter().map(|d| d.stop_type).collect();
        assert_eq!(
            types,
            vec![
                StopType::Pickup,
                StopType::Pickup,
                StopType::Dropoff,
                StopType::Dropoff
            ]
        );
    }

    #[test]
    fn test_scheduled_times_are_monotonic_and_start_at_window_start() {
        let cfg = test_config();
        let group = group_of(
            Direction::Outbound,
            vec![
                request_at(ts(9, 0), 52.500, 13.400),
                request_at(ts(9, 20), 52.502, 13.402),
            ],
            &cfg,
        );

        let drafts = sequence_stops(&group, &cfg);
        assert_eq!(drafts[0].scheduled_time, group.window_start);
        for pair in drafts.windows(2) {
            assert!(pair[1].scheduled_time >= pair[0].scheduled_time);
        }
    }

    #[test]
    fn test_return_direction_uses_return_and_home_locations() {
        let cfg = test_config();
        let member = request_at(ts(9, 0), 52.500, 13.400);
        let other = request_at(ts(9, 10), 52.501, 13.401);
        let expected_pickup = member.return_point.clone();
        let expected_dropoff = member.home.clone();
        let group = group_of(Direction::Return, vec![member, other], &cfg);

        let drafts = sequence_stops(&group, &cfg);
        assert_eq!(drafts[0].location, expected_pickup);
        assert_eq!(drafts[2].location, expected_dropoff);
    }
}
