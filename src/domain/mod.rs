// Domain types and value objects
mod route;
mod traffic;
mod trip;

pub use route::{GeoPoint, RouteCandidate, RouteSource};
pub use traffic::{Incident, TrafficLevel, TrafficSnapshot};
pub use trip::TripRecord;
