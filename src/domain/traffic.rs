use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::utils::mean;

/// Qualitative congestion level of a route.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TrafficLevel {
    Free,
    Light,
    Moderate,
    Heavy,
    Severe,
    #[default]
    #[serde(other)]
    Unknown,
}

impl TrafficLevel {
    /// Numeric scale used as a model feature. Higher means freer flow.
    pub fn score(self) -> f64 {
        match self {
            Self::Free => 1.0,
            Self::Light => 0.8,
            Self::Moderate => 0.6,
            Self::Heavy => 0.4,
            Self::Severe => 0.2,
            Self::Unknown => 0.5,
        }
    }

    pub fn from_speed_ratio(ratio: f64) -> Self {
        if ratio >= 0.9 {
            Self::Free
        } else if ratio >= 0.7 {
            Self::Light
        } else if ratio >= 0.5 {
            Self::Moderate
        } else if ratio >= 0.3 {
            Self::Heavy
        } else {
            Self::Severe
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Incident {
    /// Free-form provider tag, e.g. "minor", "major", "critical".
    #[serde(default)]
    pub severity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Incident {
    pub const SEVERE_TAGS: [&'static str; 3] = ["major", "severe", "critical"];

    pub fn new(severity: impl Into<String>) -> Self {
        Self {
            severity: severity.into(),
            description: None,
        }
    }

    pub fn is_severe(&self) -> bool {
        let tag = self.severity.trim();
        Self::SEVERE_TAGS
            .iter()
            .any(|severe| tag.eq_ignore_ascii_case(severe))
    }
}

/// Live conditions along one route candidate at one point in time.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficSnapshot {
    pub level: TrafficLevel,
    /// Observed speed / free-flow speed. `None` when no source reported a speed.
    pub avg_speed_ratio: Option<f64>,
    pub incidents: Vec<Incident>,
}

impl TrafficSnapshot {
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn new(level: TrafficLevel, avg_speed_ratio: f64) -> Self {
        Self {
            level,
            avg_speed_ratio: Some(avg_speed_ratio),
            incidents: Vec::new(),
        }
    }

    pub fn with_incidents(mut self, incidents: Vec<Incident>) -> Self {
        self.incidents = incidents;
        self
    }

    /// Aggregate raw per-point speed ratios into one snapshot.
    pub fn from_speed_samples(samples: &[f64], incidents: Vec<Incident>) -> Self {
        if samples.is_empty() {
            return Self::unknown().with_incidents(incidents);
        }
        let ratio = mean(samples);
        Self::new(TrafficLevel::from_speed_ratio(ratio), ratio).with_incidents(incidents)
    }

    /// Speed ratio with the free-flow default applied.
    pub fn speed_ratio_or_default(&self) -> f64 {
        self.avg_speed_ratio.unwrap_or(1.0)
    }

    pub fn has_severe_incident(&self) -> bool {
        self.incidents.iter().any(Incident::is_severe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_thresholds() {
        assert_eq!(TrafficLevel::from_speed_ratio(0.95), TrafficLevel::Free);
        assert_eq!(TrafficLevel::from_speed_ratio(0.7), TrafficLevel::Light);
        assert_eq!(TrafficLevel::from_speed_ratio(0.55), TrafficLevel::Moderate);
        assert_eq!(TrafficLevel::from_speed_ratio(0.3), TrafficLevel::Heavy);
        assert_eq!(TrafficLevel::from_speed_ratio(0.1), TrafficLevel::Severe);
    }

    #[test]
    fn parses_loose_json() {
        let snap: TrafficSnapshot = serde_json::from_str(
            r#"{"level":"gridlock","incidents":[{"severity":"Major"},{}]}"#,
        )
        .unwrap();
        assert_eq!(snap.level, TrafficLevel::Unknown);
        assert_eq!(snap.speed_ratio_or_default(), 1.0);
        assert!(snap.has_severe_incident());
        assert_eq!(snap.incidents.len(), 2);
    }

    #[test]
    fn aggregates_samples() {
        let snap = TrafficSnapshot::from_speed_samples(&[0.4, 0.6], vec![]);
        assert_eq!(snap.level, TrafficLevel::Moderate);
        assert!((snap.avg_speed_ratio.unwrap() - 0.5).abs() < 1e-12);

        let empty = TrafficSnapshot::from_speed_samples(&[], vec![Incident::new("minor")]);
        assert_eq!(empty.level, TrafficLevel::Unknown);
        assert!(empty.avg_speed_ratio.is_none());
        assert!(!empty.has_severe_incident());
    }

    #[test]
    fn every_level_scores_within_unit_range() {
        use strum::IntoEnumIterator;

        let scores: Vec<_> = TrafficLevel::iter().map(|l| (l, l.score())).collect();
        assert_eq!(scores.len(), 6);
        for (level, score) in &scores {
            assert!(*score > 0.0 && *score <= 1.0, "{level} scored {score}");
        }
        let graded: Vec<_> = TrafficLevel::iter()
            .filter(|l| *l != TrafficLevel::Unknown)
            .map(TrafficLevel::score)
            .collect();
        assert!(graded.windows(2).all(|w| w[0] > w[1]));
        assert_eq!(TrafficLevel::Unknown.score(), 0.5);
    }

    #[test]
    fn display_is_lowercase() {
        assert_eq!(TrafficLevel::Heavy.to_string(), "heavy");
    }
}
