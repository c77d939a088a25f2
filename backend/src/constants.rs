// =============================================================================
// Ridepool Backend Constants
// =============================================================================
// This file contains all constants used throughout the backend to enable
// easy tuning and configuration from a single location.

// =============================================================================
// MATCHING
// =============================================================================

/// Time tolerance (± minutes) around the desired pickup time for the outbound leg
pub const OUTBOUND_WINDOW_MINUTES: i64 = 60;

/// Time tolerance (± minutes) around the desired return time for the return leg
pub const RETURN_WINDOW_MINUTES: i64 = 90;

/// Maximum distance between two boarding points to share a trip
pub const MATCH_RADIUS_KM: f64 = 2.0;

/// Minimum number of requests for a viable shared trip (no single-rider trips)
pub const MIN_GROUP_SIZE: usize = 2;

/// Maximum number of requests placed on one trip
pub const MAX_GROUP_SIZE: usize = 4;

/// Transit + buffer time between consecutive stops
pub const STOP_SERVICE_MINUTES: i64 = 10;

/// How long a proposal stays open before it expires
pub const PROPOSAL_EXPIRY_MINUTES: i64 = 30;

// =============================================================================
// WORKER SCHEDULING
// =============================================================================

/// How often the periodic matching tick runs
pub const MATCHING_INTERVAL_SECS: u64 = 300;

/// How often the proposal expiry sweep runs
pub const EXPIRY_SWEEP_INTERVAL_SECS: u64 = 60;

// =============================================================================
// PRICING
// =============================================================================

/// Base fare per matched leg, in cents
pub const BASE_FARE_CENTS: i64 = 250;

/// Per-kilometer rate, in cents
pub const PER_KM_RATE_CENTS: i64 = 150;

// =============================================================================
// FLEET BOOTSTRAP
// =============================================================================

/// Seat capacity of the auto-provisioned default vehicle
pub const DEFAULT_VEHICLE_CAPACITY: i32 = 4;

/// Name given to the auto-provisioned default driver
pub const DEFAULT_DRIVER_NAME: &str = "Default Driver";

// =============================================================================
// SERVER CONFIGURATION
// =============================================================================

/// Default server port if not specified in environment
pub const DEFAULT_SERVER_PORT: u16 = 3000;

// =============================================================================
// COORDINATE VALIDATION
// =============================================================================

/// Validates a latitude value
pub fn is_valid_latitude(lat: f64) -> bool {
    lat.is_finite() && (-90.0..=90.0).contains(&lat)
}

/// Validates a longitude value
pub fn is_valid_longitude(lng: f64) -> bool {
    lng.is_finite() && (-180.0..=180.0).contains(&lng)
}
