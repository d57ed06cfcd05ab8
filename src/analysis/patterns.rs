//! Recurring day-of-week / hour-of-day patterns in a commute's history.

use serde::{Deserialize, Serialize};

use crate::config::constants::patterns::MIN_GAP_MINUTES;
#[cfg(debug_assertions)]
use crate::config::DF;
use crate::domain::TripRecord;
use crate::utils::{TimeUtils, WallClock, get_max, get_min, mean, round1};

pub const NO_DATA_MESSAGE: &str = "No data available";
pub const KEEP_TRACKING_MESSAGE: &str = "Keep tracking - more data will reveal patterns!";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayStats {
    pub weekday: u32,
    pub day: String,
    pub avg_minutes: f64,
    pub min_minutes: f64,
    pub max_minutes: f64,
    pub trips: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourStats {
    pub hour: u32,
    pub label: String,
    pub avg_minutes: f64,
    pub trips: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallStats {
    pub avg_minutes: f64,
    pub best_minutes: f64,
    pub worst_minutes: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PatternInsights {
    pub best_day: Option<String>,
    pub worst_day: Option<String>,
    pub best_departure: Option<String>,
    pub worst_departure: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternReport {
    pub trips_recorded: usize,
    /// Only set on the empty-history sentinel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub overall: Option<OverallStats>,
    /// Monday first
    pub by_day: Vec<DayStats>,
    /// Earliest hour first
    pub by_hour: Vec<HourStats>,
    pub insights: PatternInsights,
    pub recommendations: Vec<String>,
}

impl PatternReport {
    fn empty() -> Self {
        Self {
            trips_recorded: 0,
            message: Some(NO_DATA_MESSAGE.to_string()),
            overall: None,
            by_day: Vec::new(),
            by_hour: Vec::new(),
            insights: PatternInsights::default(),
            recommendations: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.trips_recorded == 0
    }

    pub fn day(&self, name: &str) -> Option<&DayStats> {
        self.by_day.iter().find(|d| d.day == name)
    }

    pub fn hour(&self, hour: u32) -> Option<&HourStats> {
        self.by_hour.iter().find(|h| h.hour == hour)
    }
}

/// Buckets keep first-seen order; ties in best/worst resolve to the earliest bucket.
struct OrderedGroups {
    groups: Vec<(u32, Vec<f64>)>,
}

impl OrderedGroups {
    fn new() -> Self {
        Self { groups: Vec::new() }
    }

    fn push(&mut self, key: u32, value: f64) {
        match self.groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value),
            None => self.groups.push((key, vec![value])),
        }
    }
}

/// Index of the first minimum / first maximum by `key`.
fn first_extremes<T>(items: &[T], key: impl Fn(&T) -> f64) -> Option<(usize, usize)> {
    if items.is_empty() {
        return None;
    }
    let (mut lo, mut hi) = (0, 0);
    for (i, item) in items.iter().enumerate().skip(1) {
        let v = key(item);
        if v < key(&items[lo]) {
            lo = i;
        }
        if v > key(&items[hi]) {
            hi = i;
        }
    }
    Some((lo, hi))
}

pub struct PatternAnalyzer;

impl PatternAnalyzer {
    pub fn analyze(history: &[TripRecord]) -> PatternReport {
        let mut by_day = OrderedGroups::new();
        let mut by_hour = OrderedGroups::new();
        let mut all_durations = Vec::new();

        for trip in history {
            let Some(duration) = trip.realized_duration() else {
                continue;
            };
            by_day.push(trip.started_at.weekday_index(), duration);
            by_hour.push(trip.started_at.hour_of_day(), duration);
            all_durations.push(duration);
        }

        if all_durations.is_empty() {
            return PatternReport::empty();
        }

        #[cfg(debug_assertions)]
        if DF.log_patterns {
            log::info!(
                "Pattern analysis: {} usable trips of {}, {} days, {} hours",
                all_durations.len(),
                history.len(),
                by_day.groups.len(),
                by_hour.groups.len()
            );
        }

        let mut day_stats: Vec<DayStats> = by_day
            .groups
            .into_iter()
            .map(|(weekday, durations)| DayStats {
                weekday,
                day: TimeUtils::weekday_name(weekday).to_string(),
                avg_minutes: round1(mean(&durations)),
                min_minutes: round1(get_min(&durations)),
                max_minutes: round1(get_max(&durations)),
                trips: durations.len(),
            })
            .collect();

        let mut hour_stats: Vec<HourStats> = by_hour
            .groups
            .into_iter()
            .map(|(hour, durations)| HourStats {
                hour,
                label: TimeUtils::hour_label(hour),
                avg_minutes: round1(mean(&durations)),
                trips: durations.len(),
            })
            .collect();

        let mut insights = PatternInsights::default();
        let mut recommendations = Vec::new();

        if let Some((best, worst)) = first_extremes(&day_stats, |d| d.avg_minutes) {
            let (best, worst) = (&day_stats[best], &day_stats[worst]);
            insights.best_day = Some(best.day.clone());
            insights.worst_day = Some(worst.day.clone());

            let diff = worst.avg_minutes - best.avg_minutes;
            if best.weekday != worst.weekday && diff > MIN_GAP_MINUTES {
                recommendations.push(format!(
                    "Consider remote work on {}s - you save ~{:.0} minutes vs {}s",
                    worst.day, diff, best.day
                ));
            }
        }

        if let Some((best, worst)) = first_extremes(&hour_stats, |h| h.avg_minutes) {
            let (best, worst) = (&hour_stats[best], &hour_stats[worst]);
            insights.best_departure = Some(best.label.clone());
            insights.worst_departure = Some(worst.label.clone());

            let diff = worst.avg_minutes - best.avg_minutes;
            if best.hour != worst.hour && diff > MIN_GAP_MINUTES {
                recommendations.push(format!(
                    "Leaving at {} saves ~{:.0} minutes compared to {}",
                    best.label, diff, worst.label
                ));
            }
        }

        if recommendations.is_empty() {
            recommendations.push(KEEP_TRACKING_MESSAGE.to_string());
        }

        day_stats.sort_by_key(|d| d.weekday);
        hour_stats.sort_by_key(|h| h.hour);

        PatternReport {
            trips_recorded: all_durations.len(),
            message: None,
            overall: Some(OverallStats {
                avg_minutes: round1(mean(&all_durations)),
                best_minutes: round1(get_min(&all_durations)),
                worst_minutes: round1(get_max(&all_durations)),
            }),
            by_day: day_stats,
            by_hour: hour_stats,
            insights,
            recommendations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn trip(ts: &str, minutes: Option<f64>) -> TripRecord {
        let mut t = TripRecord::started("h", "c", DateTime::parse_from_rfc3339(ts).unwrap());
        t.duration_minutes = minutes;
        t
    }

    #[test]
    fn empty_history_yields_sentinel() {
        let report = PatternAnalyzer::analyze(&[]);
        assert_eq!(report.trips_recorded, 0);
        assert_eq!(report.message.as_deref(), Some(NO_DATA_MESSAGE));
        assert!(report.overall.is_none());
    }

    #[test]
    fn history_without_durations_yields_sentinel() {
        let report = PatternAnalyzer::analyze(&[trip("2024-01-01T10:00:00Z", None)]);
        assert!(report.is_empty());
    }

    #[test]
    fn monday_vs_wednesday() {
        let history = [
            trip("2024-01-01T10:00:00Z", Some(20.0)),
            trip("2024-01-01T10:00:00Z", Some(22.0)),
            trip("2024-01-03T08:00:00Z", Some(35.0)),
        ];
        let report = PatternAnalyzer::analyze(&history);

        assert_eq!(report.trips_recorded, 3);
        let monday = report.day("Monday").unwrap();
        assert_eq!((monday.avg_minutes, monday.trips), (21.0, 2));
        assert_eq!((monday.min_minutes, monday.max_minutes), (20.0, 22.0));
        let wednesday = report.day("Wednesday").unwrap();
        assert_eq!((wednesday.avg_minutes, wednesday.trips), (35.0, 1));

        assert_eq!(report.insights.best_day.as_deref(), Some("Monday"));
        assert_eq!(report.insights.worst_day.as_deref(), Some("Wednesday"));
        assert_eq!(report.insights.best_departure.as_deref(), Some("10:00"));
        assert_eq!(report.insights.worst_departure.as_deref(), Some("08:00"));

        assert_eq!(
            report.recommendations,
            vec![
                "Consider remote work on Wednesdays - you save ~14 minutes vs Mondays".to_string(),
                "Leaving at 10:00 saves ~14 minutes compared to 08:00".to_string(),
            ]
        );

        let overall = report.overall.unwrap();
        assert_eq!(overall.avg_minutes, 25.7);
        assert_eq!(overall.best_minutes, 20.0);
        assert_eq!(overall.worst_minutes, 35.0);
        // Output buckets are ordered.
        assert_eq!(report.by_hour[0].hour, 8);
        assert_eq!(report.by_day[0].day, "Monday");
    }

    #[test]
    fn small_gaps_keep_tracking() {
        let history = [
            trip("2024-01-01T10:00:00Z", Some(20.0)),
            trip("2024-01-02T11:00:00Z", Some(24.0)),
            trip("2024-01-02T11:30:00Z", None),
        ];
        let report = PatternAnalyzer::analyze(&history);
        assert_eq!(report.trips_recorded, 2);
        assert_eq!(report.recommendations, vec![KEEP_TRACKING_MESSAGE.to_string()]);
    }

    #[test]
    fn ties_resolve_to_first_seen_bucket() {
        let history = [
            trip("2024-01-02T09:00:00Z", Some(30.0)), // Tuesday
            trip("2024-01-01T09:00:00Z", Some(30.0)), // Monday
        ];
        let report = PatternAnalyzer::analyze(&history);
        assert_eq!(report.insights.best_day.as_deref(), Some("Tuesday"));
        assert_eq!(report.insights.worst_day.as_deref(), Some("Tuesday"));
    }

    #[test]
    fn grouping_uses_recorded_offset() {
        // 23:30 local on a Sunday is Monday in UTC; the commuter's own clock wins.
        let report = PatternAnalyzer::analyze(&[trip("2024-01-07T23:30:00-05:00", Some(12.0))]);
        assert_eq!(report.by_day[0].day, "Sunday");
        assert_eq!(report.by_hour[0].hour, 23);
    }

    #[test]
    fn analysis_is_idempotent() {
        let history = [
            trip("2024-01-01T07:00:00Z", Some(40.0)),
            trip("2024-01-05T18:00:00Z", Some(25.0)),
        ];
        assert_eq!(
            PatternAnalyzer::analyze(&history),
            PatternAnalyzer::analyze(&history)
        );
    }
}
