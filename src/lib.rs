#![allow(clippy::collapsible_if)]
#![allow(clippy::too_many_arguments)]

// Core modules
pub mod analysis;
pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod models;
pub mod utils;

// Re-export commonly used types outside of crate
pub use analysis::{FeatureVector, PatternAnalyzer, PatternReport, RouteComparison, compare};
pub use config::{PERSISTENCE, PredictionConfig};
pub use data::{FileModelStore, HistoryStore, JsonFileHistoryStore, ModelStore, parse_history};
pub use domain::{GeoPoint, RouteCandidate, TrafficLevel, TrafficSnapshot, TripRecord};
pub use engine::{CommuteAdvisor, TrafficPredictor};

// CLI argument parsing
use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Predict commute durations and decide when to reroute", long_about = None)]
pub struct Cli {
    /// Trained model blob (overrides MODEL_PATH)
    #[arg(long, global = true)]
    pub model: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Mine day-of-week and departure-hour patterns from trip history
    Patterns {
        /// JSON array of trip records
        #[arg(long)]
        history: PathBuf,
        /// Only consider trips for this commute
        #[arg(long)]
        commute: Option<String>,
        /// Print tables instead of JSON
        #[arg(long, default_value_t = false)]
        table: bool,
    },
    /// Train the duration model from trip history and persist it
    Train {
        #[arg(long)]
        history: PathBuf,
    },
    /// Predict each route's duration and apply the reroute threshold
    Compare {
        /// JSON array of routes, each optionally carrying a `traffic` snapshot
        #[arg(long)]
        routes: PathBuf,
        /// Minutes an alternative must save (overrides REROUTE_THRESHOLD_MINUTES)
        #[arg(long)]
        threshold: Option<f64>,
        /// Id of the route the traveler is already on
        #[arg(long)]
        current: Option<String>,
    },
    /// Record trips in the local history file
    Trip {
        #[command(subcommand)]
        action: TripAction,
        #[arg(long, global = true)]
        history: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum TripAction {
    /// Start a trip now and print its id
    Start {
        #[arg(long)]
        commute: String,
    },
    /// End a trip now, recording the route actually driven
    End {
        #[arg(long)]
        id: String,
        #[arg(long)]
        route: Option<String>,
    },
}
