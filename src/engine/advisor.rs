use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};

use crate::analysis::{ComparisonError, PredictedRoute, RouteComparison, compare, compare_with_current};
use crate::config::PredictionConfig;
use crate::data::{RouteSupplier, TrafficSupplier};
use crate::domain::{GeoPoint, TrafficSnapshot};
use crate::utils::now_local;

use super::predictor::TrafficPredictor;

/// Per-request pipeline: fetch candidates, fetch traffic, predict, compare.
pub struct CommuteAdvisor<R, T> {
    routes: R,
    traffic: T,
    predictor: Arc<TrafficPredictor>,
    config: PredictionConfig,
}

impl<R: RouteSupplier, T: TrafficSupplier> CommuteAdvisor<R, T> {
    pub fn new(routes: R, traffic: T, predictor: Arc<TrafficPredictor>, config: PredictionConfig) -> Self {
        Self {
            routes,
            traffic,
            predictor,
            config,
        }
    }

    pub fn predictor(&self) -> &Arc<TrafficPredictor> {
        &self.predictor
    }

    pub fn config(&self) -> &PredictionConfig {
        &self.config
    }

    /// Compare all candidates for the trip; the fastest is treated as current.
    pub async fn advise(&self, origin: GeoPoint, destination: GeoPoint) -> Result<RouteComparison> {
        self.advise_at(origin, destination, None, &now_local()).await
    }

    /// As `advise`, optionally measuring alternatives against the route the
    /// traveler is already on.
    pub async fn advise_at(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        current_route_id: Option<&str>,
        now: &DateTime<FixedOffset>,
    ) -> Result<RouteComparison> {
        let candidates = self
            .routes
            .get_routes(origin, destination)
            .await
            .context("fetching route candidates")?;
        if candidates.is_empty() {
            return Err(ComparisonError::NoRoutes.into());
        }

        let mut snapshots = match self.traffic.get_traffic_for_routes(&candidates).await {
            Ok(snapshots) => snapshots,
            Err(e) => {
                log::warn!("Traffic lookup failed, treating all routes as unknown: {:#}", e);
                Vec::new()
            }
        };
        if snapshots.len() != candidates.len() {
            log::warn!(
                "Traffic supplier returned {} snapshots for {} routes",
                snapshots.len(),
                candidates.len()
            );
            snapshots.resize_with(candidates.len(), TrafficSnapshot::unknown);
        }

        let horizon = self.config.prediction_horizon_minutes;
        let predicted: Vec<PredictedRoute> = candidates
            .into_iter()
            .zip(snapshots.iter())
            .map(|(route, traffic)| self.predictor.predict_route(route, Some(traffic), horizon, now))
            .collect();

        let threshold = self.config.reroute_threshold_minutes;
        let comparison = match current_route_id {
            Some(id) => compare_with_current(predicted, id, threshold)?,
            None => compare(predicted, threshold)?,
        };
        Ok(comparison)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RouteCandidate, TrafficLevel};
    use anyhow::bail;
    use async_trait::async_trait;

    struct FixedRoutes(Vec<RouteCandidate>);

    #[async_trait]
    impl RouteSupplier for FixedRoutes {
        async fn get_routes(&self, _: GeoPoint, _: GeoPoint) -> Result<Vec<RouteCandidate>> {
            Ok(self.0.clone())
        }
    }

    struct FixedTraffic(Vec<TrafficSnapshot>);

    #[async_trait]
    impl TrafficSupplier for FixedTraffic {
        async fn get_traffic_for_routes(&self, _: &[RouteCandidate]) -> Result<Vec<TrafficSnapshot>> {
            Ok(self.0.clone())
        }
    }

    struct BrokenTraffic;

    #[async_trait]
    impl TrafficSupplier for BrokenTraffic {
        async fn get_traffic_for_routes(&self, _: &[RouteCandidate]) -> Result<Vec<TrafficSnapshot>> {
            bail!("provider timed out")
        }
    }

    fn noon() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2024-01-02T12:00:00+00:00").unwrap()
    }

    fn routes() -> Vec<RouteCandidate> {
        vec![
            RouteCandidate::new("r0", "Primary Route", 20.0, 25.0),
            RouteCandidate::new("r1", "Alternative 1", 22.0, 28.0),
            RouteCandidate::new("r2", "Alternative 2", 18.0, 24.0),
        ]
    }

    fn origin() -> GeoPoint {
        GeoPoint::new(51.5, -0.12)
    }

    fn destination() -> GeoPoint {
        GeoPoint::new(51.52, -0.08)
    }

    #[tokio::test]
    async fn current_route_congestion_triggers_switch() {
        let traffic = FixedTraffic(vec![
            TrafficSnapshot::new(TrafficLevel::Severe, 0.25),
            TrafficSnapshot::new(TrafficLevel::Free, 1.0),
            TrafficSnapshot::new(TrafficLevel::Light, 0.8),
        ]);
        let advisor = CommuteAdvisor::new(
            FixedRoutes(routes()),
            traffic,
            Arc::new(TrafficPredictor::new()),
            PredictionConfig::default(),
        );

        let result = advisor
            .advise_at(origin(), destination(), Some("r0"), &noon())
            .await
            .unwrap();

        assert_eq!(result.current_route.id, "r0");
        assert_eq!(result.current_route.savings_vs_current, 0.0);
        assert_eq!(result.alternatives.len(), 2);
        // r2 (25.2) is the first alternative past the threshold, ahead of r1 (28.0).
        assert_eq!(result.recommended_switch.as_deref(), Some("r2"));
        let reason = result.recommendation_reason.unwrap();
        assert!(reason.contains("Alternative 2"));
        assert!(reason.contains("severe"));
        assert!(result.alternatives.iter().all(|a| a.confidence == 0.4));
    }

    #[tokio::test]
    async fn missing_snapshots_are_padded_as_unknown() {
        let advisor = CommuteAdvisor::new(
            FixedRoutes(routes()),
            FixedTraffic(vec![TrafficSnapshot::new(TrafficLevel::Free, 1.0)]),
            Arc::new(TrafficPredictor::new()),
            PredictionConfig::default(),
        );

        let result = advisor.advise_at(origin(), destination(), None, &noon()).await.unwrap();
        assert_eq!(result.alternatives.len(), 2);
        let unknown = result
            .alternatives
            .iter()
            .chain(std::iter::once(&result.current_route))
            .filter(|o| o.traffic_level == TrafficLevel::Unknown)
            .count();
        assert_eq!(unknown, 2);
    }

    #[tokio::test]
    async fn traffic_failure_still_produces_comparison() {
        let advisor = CommuteAdvisor::new(
            FixedRoutes(routes()),
            BrokenTraffic,
            Arc::new(TrafficPredictor::new()),
            PredictionConfig::default(),
        );
        let result = advisor.advise_at(origin(), destination(), None, &noon()).await.unwrap();
        assert_eq!(result.current_route.id, "r2");
        assert!(result.recommended_switch.is_none());
    }

    #[tokio::test]
    async fn no_candidates_is_an_error() {
        let advisor = CommuteAdvisor::new(
            FixedRoutes(Vec::new()),
            FixedTraffic(Vec::new()),
            Arc::new(TrafficPredictor::new()),
            PredictionConfig::default(),
        );
        let err = advisor.advise(origin(), destination()).await.unwrap_err();
        assert_eq!(err.downcast_ref::<ComparisonError>(), Some(&ComparisonError::NoRoutes));
    }
}
