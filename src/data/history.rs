use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::config::PERSISTENCE;
use crate::domain::TripRecord;
use crate::utils::minutes_between;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum HistoryError {
    #[error("History entry {0} not found")]
    NotFound(String),
    #[error("History entry {0} has already ended")]
    AlreadyEnded(String),
}

/// Abstract interface for trip history storage
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Create a record for a trip that starts now and return its id.
    async fn start_trip(&self, commute_id: &str, started_at: DateTime<FixedOffset>) -> Result<String>;

    /// Complete a trip: end time, realized duration and the route driven.
    async fn end_trip(
        &self,
        trip_id: &str,
        ended_at: DateTime<FixedOffset>,
        route_taken: Option<String>,
    ) -> Result<TripRecord>;

    /// Store an already-built record (imports, backfills). Returns its id.
    async fn record_trip(&self, trip: TripRecord) -> Result<String>;

    async fn get_trip(&self, trip_id: &str) -> Result<Option<TripRecord>>;

    /// Most recent first.
    async fn history_for_commute(&self, commute_id: &str, limit: usize) -> Result<Vec<TripRecord>>;
}

fn new_trip_id() -> String {
    Uuid::new_v4().to_string()
}

/// The single allowed mutation of a trip record.
fn complete_trip(
    trip: &mut TripRecord,
    ended_at: DateTime<FixedOffset>,
    route_taken: Option<String>,
) -> Result<(), HistoryError> {
    if trip.is_completed() {
        return Err(HistoryError::AlreadyEnded(trip.id.clone()));
    }
    trip.duration_minutes = Some(minutes_between(&trip.started_at, &ended_at));
    trip.ended_at = Some(ended_at);
    if route_taken.is_some() {
        trip.route_taken = route_taken;
    }
    Ok(())
}

fn recent_for_commute(records: &[TripRecord], commute_id: &str, limit: usize) -> Vec<TripRecord> {
    let mut matching: Vec<TripRecord> = records
        .iter()
        .filter(|r| r.commute_id == commute_id)
        .cloned()
        .collect();
    matching.sort_by(|a, b| b.started_at.cmp(&a.started_at));
    matching.truncate(limit);
    matching
}

/// Deserialize records one at a time, skipping any that are malformed.
pub fn parse_history(values: &[serde_json::Value]) -> Vec<TripRecord> {
    values
        .iter()
        .enumerate()
        .filter_map(|(idx, value)| match serde_json::from_value::<TripRecord>(value.clone()) {
            Ok(trip) => Some(trip),
            Err(e) => {
                log::warn!("Skipping malformed history record #{}: {}", idx, e);
                None
            }
        })
        .collect()
}

// --- IN-MEMORY IMPLEMENTATION ---

#[derive(Default)]
pub struct InMemoryHistoryStore {
    records: RwLock<Vec<TripRecord>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<TripRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn start_trip(&self, commute_id: &str, started_at: DateTime<FixedOffset>) -> Result<String> {
        let id = new_trip_id();
        self.records
            .write()
            .await
            .push(TripRecord::started(id.clone(), commute_id, started_at));
        Ok(id)
    }

    async fn end_trip(
        &self,
        trip_id: &str,
        ended_at: DateTime<FixedOffset>,
        route_taken: Option<String>,
    ) -> Result<TripRecord> {
        let mut records = self.records.write().await;
        let trip = records
            .iter_mut()
            .find(|r| r.id == trip_id)
            .ok_or_else(|| HistoryError::NotFound(trip_id.to_string()))?;
        complete_trip(trip, ended_at, route_taken)?;
        Ok(trip.clone())
    }

    async fn record_trip(&self, mut trip: TripRecord) -> Result<String> {
        if trip.id.is_empty() {
            trip.id = new_trip_id();
        }
        let id = trip.id.clone();
        self.records.write().await.push(trip);
        Ok(id)
    }

    async fn get_trip(&self, trip_id: &str) -> Result<Option<TripRecord>> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .find(|r| r.id == trip_id)
            .cloned())
    }

    async fn history_for_commute(&self, commute_id: &str, limit: usize) -> Result<Vec<TripRecord>> {
        Ok(recent_for_commute(&self.records.read().await, commute_id, limit))
    }
}

// --- JSON FILE IMPLEMENTATION ---

/// Whole-file JSON array of trip records. Fine for a single commuter's history.
///
/// Entries that do not parse as trips are skipped on read but written back
/// unchanged, so a rewrite never drops them.
pub struct JsonFileHistoryStore {
    path: PathBuf,
    /// Serialises read-modify-write cycles.
    write_lock: Mutex<()>,
}

impl JsonFileHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    async fn load_raw(&self) -> Result<Vec<serde_json::Value>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", self.path.display()));
            }
        };
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", self.path.display()))
    }

    async fn load(&self) -> Result<Vec<TripRecord>> {
        Ok(parse_history(&self.load_raw().await?))
    }

    async fn save_raw(&self, values: &[serde_json::Value]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(values)?;
        tokio::fs::write(&self.path, json)
            .await
            .with_context(|| format!("writing {}", self.path.display()))
    }
}

/// Position and parsed form of the entry with `trip_id`, ignoring unparseable entries.
fn find_entry(values: &[serde_json::Value], trip_id: &str) -> Option<(usize, TripRecord)> {
    values.iter().enumerate().find_map(|(idx, value)| {
        serde_json::from_value::<TripRecord>(value.clone())
            .ok()
            .filter(|trip| trip.id == trip_id)
            .map(|trip| (idx, trip))
    })
}

impl Default for JsonFileHistoryStore {
    fn default() -> Self {
        Self::new(PERSISTENCE.history.path)
    }
}

#[async_trait]
impl HistoryStore for JsonFileHistoryStore {
    async fn start_trip(&self, commute_id: &str, started_at: DateTime<FixedOffset>) -> Result<String> {
        let id = new_trip_id();
        self.record_trip(TripRecord::started(id.clone(), commute_id, started_at))
            .await?;
        Ok(id)
    }

    async fn end_trip(
        &self,
        trip_id: &str,
        ended_at: DateTime<FixedOffset>,
        route_taken: Option<String>,
    ) -> Result<TripRecord> {
        let _guard = self.write_lock.lock().await;
        let mut values = self.load_raw().await?;
        let (idx, mut trip) = find_entry(&values, trip_id)
            .ok_or_else(|| HistoryError::NotFound(trip_id.to_string()))?;
        complete_trip(&mut trip, ended_at, route_taken)?;
        values[idx] = serde_json::to_value(&trip)?;
        self.save_raw(&values).await?;
        Ok(trip)
    }

    async fn record_trip(&self, mut trip: TripRecord) -> Result<String> {
        if trip.id.is_empty() {
            trip.id = new_trip_id();
        }
        let id = trip.id.clone();

        let _guard = self.write_lock.lock().await;
        let mut values = self.load_raw().await?;
        values.push(serde_json::to_value(&trip)?);
        self.save_raw(&values).await?;
        Ok(id)
    }

    async fn get_trip(&self, trip_id: &str) -> Result<Option<TripRecord>> {
        Ok(find_entry(&self.load_raw().await?, trip_id).map(|(_, trip)| trip))
    }

    async fn history_for_commute(&self, commute_id: &str, limit: usize) -> Result<Vec<TripRecord>> {
        Ok(recent_for_commute(&self.load().await?, commute_id, limit))
    }
}
