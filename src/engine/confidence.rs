use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Default)]
struct Entries {
    /// Bumped on every clear. A value computed under an older generation is not stored.
    generation: u64,
    values: HashMap<String, f64>,
}

/// Per-route confidence memo. Owned by one predictor and cleared whenever the
/// predictor installs a new snapshot.
#[derive(Debug, Default)]
pub struct ConfidenceCache {
    entries: RwLock<Entries>,
}

impl ConfidenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the memoised value for `route_id`, computing and storing it on a miss.
    ///
    /// `compute` must read whatever state it depends on after this call starts;
    /// if the cache is cleared while it runs, the result is returned but not kept.
    pub fn get_or_insert_with(&self, route_id: &str, compute: impl FnOnce() -> f64) -> f64 {
        let (cached, generation) = {
            let entries = match self.entries.read() {
                Ok(entries) => entries,
                Err(poisoned) => poisoned.into_inner(),
            };
            (entries.values.get(route_id).copied(), entries.generation)
        };
        if let Some(value) = cached {
            return value;
        }

        let value = compute();
        let mut entries = match self.entries.write() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        if entries.generation != generation {
            return value;
        }
        *entries.values.entry(route_id.to_string()).or_insert(value)
    }

    pub fn clear(&self) {
        let mut entries = match self.entries.write() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.generation = entries.generation.wrapping_add(1);
        entries.values.clear();
    }

    pub fn len(&self) -> usize {
        match self.entries.read() {
            Ok(entries) => entries.values.len(),
            Err(poisoned) => poisoned.into_inner().values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computes_once_per_key() {
        let cache = ConfidenceCache::new();
        let mut calls = 0;
        assert_eq!(cache.get_or_insert_with("r1", || { calls += 1; 0.4 }), 0.4);
        assert_eq!(cache.get_or_insert_with("r1", || { calls += 1; 0.7 }), 0.4);
        assert_eq!(calls, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn clear_forgets_everything() {
        let cache = ConfidenceCache::new();
        cache.get_or_insert_with("r1", || 0.4);
        cache.get_or_insert_with("r2", || 0.4);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get_or_insert_with("r1", || 0.7), 0.7);
    }

    #[test]
    fn value_computed_across_a_clear_is_not_kept() {
        let cache = ConfidenceCache::new();
        let stale = cache.get_or_insert_with("r1", || {
            // A retrain lands while the old value is being computed.
            cache.clear();
            0.4
        });
        assert_eq!(stale, 0.4);
        assert!(cache.is_empty());
        assert_eq!(cache.get_or_insert_with("r1", || 0.7), 0.7);
    }

    #[test]
    fn clear_racing_with_misses_never_strands_old_values() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicU64, Ordering};

        let cache = Arc::new(ConfidenceCache::new());
        // Stands in for the active snapshot: odd = old model, even = new model.
        let version = Arc::new(AtomicU64::new(1));

        let readers: Vec<_> = (0..4)
            .map(|t| {
                let cache = Arc::clone(&cache);
                let version = Arc::clone(&version);
                std::thread::spawn(move || {
                    for i in 0..2_000 {
                        let key = format!("r{}", (i + t) % 8);
                        cache.get_or_insert_with(&key, || version.load(Ordering::SeqCst) as f64);
                    }
                })
            })
            .collect();

        for _ in 0..200 {
            let v = version.load(Ordering::SeqCst);
            version.store(v + 1, Ordering::SeqCst);
            cache.clear();
        }
        for reader in readers {
            reader.join().unwrap();
        }

        let last = version.load(Ordering::SeqCst) as f64;
        for k in 0..8 {
            let key = format!("r{k}");
            assert_eq!(cache.get_or_insert_with(&key, || last), last);
        }
    }
}
