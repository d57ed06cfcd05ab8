use chrono::{DateTime, Duration, FixedOffset};

use crate::domain::TripRecord;

/// Trips started within the last `days` days of `now`. Future-dated trips are kept.
pub fn within_window(records: &[TripRecord], now: &DateTime<FixedOffset>, days: u32) -> Vec<TripRecord> {
    let cutoff = *now - Duration::days(days as i64);
    records
        .iter()
        .filter(|r| r.started_at >= cutoff)
        .cloned()
        .collect()
}
