use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::config::PERSISTENCE;
use crate::models::PredictorSnapshot;

/// Opaque save/load of the complete trained state.
pub trait ModelStore: Send + Sync {
    fn save(&self, snapshot: &PredictorSnapshot) -> Result<()>;
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<PredictorSnapshot>>;
}

#[derive(Serialize)]
struct ModelBlobRef<'a> {
    version: u32,
    snapshot: &'a PredictorSnapshot,
}

#[derive(Deserialize)]
struct ModelBlob {
    version: u32,
    snapshot: PredictorSnapshot,
}

fn check_version(blob: ModelBlob) -> Result<PredictorSnapshot> {
    if blob.version != PERSISTENCE.model.version {
        bail!(
            "model blob version {} does not match expected {}",
            blob.version,
            PERSISTENCE.model.version
        );
    }
    if !blob.snapshot.is_consistent() {
        bail!("model blob failed structural validation");
    }
    Ok(blob.snapshot)
}

fn to_blob(snapshot: &PredictorSnapshot) -> ModelBlobRef<'_> {
    ModelBlobRef {
        version: PERSISTENCE.model.version,
        snapshot,
    }
}

/// Load a snapshot, degrading to an untrained one on any failure.
pub fn load_snapshot_or_default(store: &dyn ModelStore) -> PredictorSnapshot {
    match store.load() {
        Ok(Some(snapshot)) => {
            log::info!(
                "Loaded model snapshot (trained = {}, {} route baselines)",
                snapshot.is_trained(),
                snapshot.route_baselines.len()
            );
            snapshot
        }
        Ok(None) => PredictorSnapshot::default(),
        Err(e) => {
            log::warn!("Failed to load model (starting untrained): {:#}", e);
            PredictorSnapshot::default()
        }
    }
}

/// Bincode blob on disk. Writes go to a sibling temp file and are renamed into place.
pub struct FileModelStore {
    path: PathBuf,
}

impl FileModelStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileModelStore {
    fn default() -> Self {
        Self::new(PERSISTENCE.model.path)
    }
}

impl ModelStore for FileModelStore {
    fn save(&self, snapshot: &PredictorSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let tmp = self.path.with_extension("tmp");
        {
            let file = File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?;
            let writer = BufWriter::new(file);
            bincode::serialize_into(writer, &to_blob(snapshot))?;
        }
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }

    fn load(&self) -> Result<Option<PredictorSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let file = File::open(&self.path)
            .with_context(|| format!("opening {}", self.path.display()))?;
        let reader = BufReader::new(file);
        let blob: ModelBlob = bincode::deserialize_from(reader)?;
        check_version(blob).map(Some)
    }
}

/// Keeps the serialized blob in memory. Useful for tests and embedded hosts.
#[derive(Default)]
pub struct MemoryModelStore {
    blob: Mutex<Option<Vec<u8>>>,
}

impl MemoryModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            blob: Mutex::new(Some(bytes)),
        }
    }

    pub fn bytes(&self) -> Option<Vec<u8>> {
        self.blob
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl ModelStore for MemoryModelStore {
    fn save(&self, snapshot: &PredictorSnapshot) -> Result<()> {
        let bytes = bincode::serialize(&to_blob(snapshot))?;
        *self.blob.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(bytes);
        Ok(())
    }

    fn load(&self) -> Result<Option<PredictorSnapshot>> {
        match self.bytes() {
            Some(bytes) => {
                let blob: ModelBlob = bincode::deserialize(&bytes)?;
                check_version(blob).map(Some)
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("route-sniper-{}.bin", uuid::Uuid::new_v4()))
    }

    fn snapshot_with_baseline() -> PredictorSnapshot {
        let mut baselines = HashMap::new();
        baselines.insert("osrm_0".to_string(), 1.25);
        PredictorSnapshot::new(Default::default(), baselines)
    }

    #[test]
    fn file_store_roundtrip() {
        let store = FileModelStore::new(temp_path());
        assert!(store.load().unwrap().is_none());

        let snapshot = snapshot_with_baseline();
        store.save(&snapshot).unwrap();
        assert_eq!(store.load().unwrap(), Some(snapshot));
        let _ = fs::remove_file(store.path());
    }

    #[test]
    fn corrupt_blob_degrades_to_untrained() {
        let path = temp_path();
        fs::write(&path, b"definitely not bincode").unwrap();
        let store = FileModelStore::new(&path);
        assert!(store.load().is_err());
        let snapshot = load_snapshot_or_default(&store);
        assert!(!snapshot.is_trained());
        assert!(snapshot.route_baselines.is_empty());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn version_mismatch_is_rejected() {
        let bytes = bincode::serialize(&ModelBlobRef {
            version: PERSISTENCE.model.version + 1,
            snapshot: &snapshot_with_baseline(),
        })
        .unwrap();
        let store = MemoryModelStore::from_bytes(bytes);
        assert!(store.load().is_err());
        assert_eq!(load_snapshot_or_default(&store), PredictorSnapshot::default());
    }

    fn trained_snapshot() -> PredictorSnapshot {
        use crate::analysis::FeatureVector;
        use crate::config::FEATURE_COUNT;
        use crate::models::DurationModel;

        let features: Vec<FeatureVector> = (0..20)
            .map(|i| {
                let mut v = [0.0; FEATURE_COUNT];
                v[9] = 0.3 + i as f64 / 30.0;
                FeatureVector::from_array(v)
            })
            .collect();
        let targets: Vec<f64> = features.iter().map(|f| 1.0 / f.as_slice()[9]).collect();
        let mut model = DurationModel::untrained();
        model.fit(&features, &targets);
        assert!(model.is_trained());
        PredictorSnapshot::new(model, HashMap::new())
    }

    fn store_with_rewired_tree(to: fn(usize) -> usize) -> MemoryModelStore {
        let mut value = serde_json::to_value(trained_snapshot()).unwrap();
        crate::models::rewire_splits(&mut value, to);
        let broken: PredictorSnapshot = serde_json::from_value(value).unwrap();
        MemoryModelStore::from_bytes(bincode::serialize(&to_blob(&broken)).unwrap())
    }

    #[test]
    fn blob_with_broken_tree_links_loads_untrained() {
        let good = MemoryModelStore::new();
        good.save(&trained_snapshot()).unwrap();
        assert!(load_snapshot_or_default(&good).is_trained());

        for store in [
            store_with_rewired_tree(|_| 9999),
            store_with_rewired_tree(|id| id),
        ] {
            assert!(store.load().is_err());
            assert!(!load_snapshot_or_default(&store).is_trained());
        }
    }
}
