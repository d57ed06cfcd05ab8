use std::sync::{Arc, RwLock};

use crate::models::PredictorSnapshot;

/// The front buffer for the trained state.
///
/// Readers clone the `Arc` and release the lock immediately, so inference never
/// waits on training. A retrain builds its snapshot with no lock held and then
/// replaces the pointer; readers see either the old snapshot or the new one.
#[derive(Debug, Default)]
pub struct ModelHandle {
    current: RwLock<Arc<PredictorSnapshot>>,
}

impl ModelHandle {
    pub fn new(snapshot: PredictorSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// Cheap: one refcount bump under a momentary read lock.
    pub fn load(&self) -> Arc<PredictorSnapshot> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// The swap. Returns the snapshot that was active before.
    pub fn swap(&self, snapshot: Arc<PredictorSnapshot>) -> Arc<PredictorSnapshot> {
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::replace(&mut *guard, snapshot)
    }
}
