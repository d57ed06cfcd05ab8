use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Which provider produced a route geometry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RouteSource {
    Here,
    TomTom,
    Osrm,
    #[default]
    #[serde(other)]
    Other,
}

/// A candidate route as delivered by a route supplier. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RouteCandidate {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub distance_km: f64,
    /// Traffic-free (or provider-estimated) duration.
    #[serde(default)]
    pub duration_minutes: f64,
    #[serde(default)]
    pub geometry: Vec<GeoPoint>,
    #[serde(default)]
    pub source: RouteSource,
}

impl RouteCandidate {
    pub fn new(id: impl Into<String>, name: impl Into<String>, distance_km: f64, duration_minutes: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            distance_km,
            duration_minutes,
            geometry: Vec::new(),
            source: RouteSource::Other,
        }
    }

    pub fn with_geometry(mut self, geometry: Vec<GeoPoint>) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn with_source(mut self, source: RouteSource) -> Self {
        self.source = source;
        self
    }

    /// Evenly spaced points along the geometry, used to probe traffic.
    pub fn sample_points(&self, max_points: usize) -> Vec<GeoPoint> {
        if max_points == 0 {
            return Vec::new();
        }
        if self.geometry.len() <= max_points {
            return self.geometry.clone();
        }

        let step = self.geometry.len() / max_points;
        self.geometry
            .iter()
            .step_by(step)
            .take(max_points)
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: usize) -> Vec<GeoPoint> {
        (0..n).map(|i| GeoPoint::new(i as f64, 0.0)).collect()
    }

    #[test]
    fn sample_points_keeps_short_geometry() {
        let route = RouteCandidate::new("r", "R", 1.0, 1.0).with_geometry(line(4));
        assert_eq!(route.sample_points(10).len(), 4);
    }

    #[test]
    fn sample_points_is_evenly_spaced() {
        let route = RouteCandidate::new("r", "R", 1.0, 1.0).with_geometry(line(25));
        let points = route.sample_points(10);
        assert_eq!(points.len(), 10);
        assert_eq!(points[1].lat, 2.0);
        assert_eq!(points[9].lat, 18.0);
    }

    #[test]
    fn unknown_source_deserializes_as_other() {
        let route: RouteCandidate =
            serde_json::from_str(r#"{"id":"x","source":"mapbox"}"#).unwrap();
        assert_eq!(route.source, RouteSource::Other);
        assert_eq!(route.duration_minutes, 0.0);
        assert!(route.geometry.is_empty());
    }
}
