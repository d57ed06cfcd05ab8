//! Boundaries to the external route and traffic providers.

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::{GeoPoint, RouteCandidate, TrafficSnapshot};

/// Produces candidate routes between two points. Ids are distinct within one response.
#[async_trait]
pub trait RouteSupplier: Send + Sync {
    async fn get_routes(&self, origin: GeoPoint, destination: GeoPoint) -> Result<Vec<RouteCandidate>>;
}

/// Produces one snapshot per route, aligned by position. Routes without data
/// get an `unknown` snapshot rather than being dropped.
#[async_trait]
pub trait TrafficSupplier: Send + Sync {
    async fn get_traffic_for_routes(&self, routes: &[RouteCandidate]) -> Result<Vec<TrafficSnapshot>>;
}
