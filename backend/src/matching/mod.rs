pub mod engine;
pub mod geo;
pub mod grouping;
pub mod pricing;
pub mod stops;

use chrono::Duration;

use crate::constants::{
    MATCH_RADIUS_KM, MAX_GROUP_SIZE, MIN_GROUP_SIZE, OUTBOUND_WINDOW_MINUTES,
    PROPOSAL_EXPIRY_MINUTES, RETURN_WINDOW_MINUTES, STOP_SERVICE_MINUTES,
};
use crate::models::Direction;

pub use engine::{MatchingReport, run_matching_batch};
pub use grouping::{MatchGroup, find_matchable_groups};

/// Tunables for one matching run. Defaults come from `constants`; tests
/// override individual fields.
#[derive(Debug, Clone)]
pub struct MatchingConfig {
    pub outbound_window: Duration,
    pub return_window: Duration,
    pub radius_km: f64,
    pub min_group_size: usize,
    pub max_group_size: usize,
    pub stop_service_time: Duration,
    pub proposal_expiry: Duration,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            outbound_window: Duration::minutes(OUTBOUND_WINDOW_MINUTES),
            return_window: Duration::minutes(RETURN_WINDOW_MINUTES),
            radius_km: MATCH_RADIUS_KM,
            min_group_size: MIN_GROUP_SIZE,
            max_group_size: MAX_GROUP_SIZE,
            stop_service_time: Duration::minutes(STOP_SERVICE_MINUTES),
            proposal_expiry: Duration::minutes(PROPOSAL_EXPIRY_MINUTES),
        }
    }
}

impl MatchingConfig {
    pub fn window_for(&self, direction: Direction) -> Duration {
        match direction {
            Direction::Outbound => self.outbound_window,
            Direction::Return => self.return_window,
        }
    }
}
