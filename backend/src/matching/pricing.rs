//! Estimated pricing for proposals: a base fare plus a per-kilometer rate
//! over the haversine distance of each matched leg.

use crate::constants::{BASE_FARE_CENTS, PER_KM_RATE_CENTS};
use crate::models::{Direction, RideRequest};

use super::geo::distance_km;

pub fn leg_price_cents(request: &RideRequest, direction: Direction) -> i64 {
    let km = distance_km(
        request.boarding_location(direction),
        request.alighting_location(direction),
    );
    BASE_FARE_CENTS + (km * PER_KM_RATE_CENTS as f64).round() as i64
}
