// Boundaries to storage and external providers
mod history;
mod model_io;
mod suppliers;

pub use history::{
    HistoryError, HistoryStore, InMemoryHistoryStore, JsonFileHistoryStore, parse_history,
};
pub use model_io::{FileModelStore, MemoryModelStore, ModelStore, load_snapshot_or_default};
pub use suppliers::{RouteSupplier, TrafficSupplier};
