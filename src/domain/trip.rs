use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::domain::{RouteCandidate, TrafficSnapshot};

/// One tracked journey of a commute. Created on start, completed at most once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRecord {
    #[serde(default)]
    pub id: String,
    pub commute_id: String,
    pub started_at: DateTime<FixedOffset>,
    #[serde(default)]
    pub ended_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub duration_minutes: Option<f64>,
    /// Id of the route actually driven.
    #[serde(default)]
    pub route_taken: Option<String>,
    /// Conditions captured when the trip started.
    #[serde(default)]
    pub traffic_conditions: Option<TrafficSnapshot>,
    /// The candidate the trip was planned on, needed to derive training features.
    #[serde(default)]
    pub route: Option<RouteCandidate>,
    #[serde(default)]
    pub switched_routes: bool,
}

impl TripRecord {
    pub fn started(
        id: impl Into<String>,
        commute_id: impl Into<String>,
        started_at: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            id: id.into(),
            commute_id: commute_id.into(),
            started_at,
            ended_at: None,
            duration_minutes: None,
            route_taken: None,
            traffic_conditions: None,
            route: None,
            switched_routes: false,
        }
    }

    pub fn with_duration(mut self, minutes: f64) -> Self {
        self.duration_minutes = Some(minutes);
        self
    }

    pub fn with_route(mut self, route: RouteCandidate) -> Self {
        self.route = Some(route);
        self
    }

    pub fn with_traffic(mut self, traffic: TrafficSnapshot) -> Self {
        self.traffic_conditions = Some(traffic);
        self
    }

    /// Realized duration, only when it is a usable positive number.
    pub fn realized_duration(&self) -> Option<f64> {
        self.duration_minutes
            .filter(|d| d.is_finite() && *d > 0.0)
    }

    pub fn is_completed(&self) -> bool {
        self.ended_at.is_some()
    }

    /// Route identity used for per-route baselines.
    pub fn route_key(&self) -> Option<&str> {
        self.route
            .as_ref()
            .map(|r| r.id.as_str())
            .filter(|id| !id.is_empty())
            .or(self.route_taken.as_deref())
    }
}
