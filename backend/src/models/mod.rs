pub mod requests;
pub mod trips;
pub mod proposals;
pub mod fleet;

pub use requests::{Direction, Location, RequestStatus, RideRequest};
pub use trips::{Stop, StopType, Trip, TripStatus};
pub use proposals::{Booking, Proposal, ProposalStatus};
pub use fleet::{Driver, Vehicle};
