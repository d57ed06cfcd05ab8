//! File persistence and serialization configuration

/// Configuration for trained model persistence
pub struct ModelPersistenceConfig {
    /// Default path of the model blob (parameters + normalization + route baselines)
    pub path: &'static str,
    /// Current version of the blob serialization format.
    /// Blobs carrying any other version are ignored on load.
    pub version: u32,
}

/// Configuration for trip history persistence
pub struct HistoryPersistenceConfig {
    /// Default path of the JSON history file used by the file-backed store
    pub path: &'static str,
}

/// The Master Persistence Configuration
pub struct PersistenceConfig {
    pub model: ModelPersistenceConfig,
    pub history: HistoryPersistenceConfig,
}

pub const PERSISTENCE: PersistenceConfig = PersistenceConfig {
    model: ModelPersistenceConfig {
        path: "trained_model.bin",
        version: 1,
    },
    history: HistoryPersistenceConfig {
        path: "data/history.json",
    },
};
