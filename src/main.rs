use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use route_sniper::analysis::{PredictedRoute, compare_with_current, within_window};
use route_sniper::utils::now_local;
use route_sniper::{
    Cli, FileModelStore, HistoryStore, JsonFileHistoryStore, PERSISTENCE, PatternAnalyzer,
    PatternReport, PredictionConfig, RouteCandidate, TrafficPredictor, TrafficSnapshot,
    TripRecord, compare, parse_history,
};
use route_sniper::{Command, TripAction};

/// One entry of the `compare --routes` input file.
#[derive(Debug, Deserialize)]
struct RouteInput {
    #[serde(flatten)]
    route: RouteCandidate,
    #[serde(default)]
    traffic: Option<TrafficSnapshot>,
}

#[derive(Tabled)]
struct DayRow {
    day: String,
    avg: f64,
    min: f64,
    max: f64,
    trips: usize,
}

#[derive(Tabled)]
struct HourRow {
    departure: String,
    avg: f64,
    trips: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::force_capture();
        log::error!("CRITICAL PANIC:\n{}\nStack Trace:\n{}", info, backtrace);
    }));

    let (global_level, my_code_level) = if cfg!(debug_assertions) {
        (log::LevelFilter::Warn, log::LevelFilter::Info)
    } else {
        (log::LevelFilter::Error, log::LevelFilter::Error)
    };

    env_logger::Builder::new()
        .filter(None, global_level)
        .filter(Some("route_sniper"), my_code_level)
        .init();

    let args = Cli::parse();
    let mut config = PredictionConfig::from_env();
    if let Some(path) = &args.model {
        config.model_path = path.to_string_lossy().into_owned();
    }

    match args.command {
        Command::Patterns {
            history,
            commute,
            table,
        } => {
            let mut records = load_history(&history, &config).await?;
            if let Some(commute) = commute {
                records.retain(|r| r.commute_id == commute);
            }
            let report = PatternAnalyzer::analyze(&records);
            if table {
                print_pattern_tables(&report);
            } else {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
        }
        Command::Train { history } => {
            let records = load_history(&history, &config).await?;
            let predictor = predictor_for(&config);
            let outcome = predictor.train_on_records(&records)?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            if outcome.trained {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&predictor.feature_importance())?
                );
            }
        }
        Command::Compare {
            routes,
            threshold,
            current,
        } => {
            let inputs: Vec<RouteInput> = read_json(&routes).await?;
            let predictor = predictor_for(&config);
            let now = now_local();
            let horizon = config.prediction_horizon_minutes;

            let predicted: Vec<PredictedRoute> = inputs
                .into_iter()
                .map(|input| {
                    predictor.predict_route(input.route, input.traffic.as_ref(), horizon, &now)
                })
                .collect();

            let threshold = threshold.unwrap_or(config.reroute_threshold_minutes);
            let comparison = match current.as_deref() {
                Some(id) => compare_with_current(predicted, id, threshold)?,
                None => compare(predicted, threshold)?,
            };
            println!("{}", serde_json::to_string_pretty(&comparison)?);
        }
        Command::Trip { action, history } => {
            let path = history.unwrap_or_else(|| PathBuf::from(PERSISTENCE.history.path));
            let store = JsonFileHistoryStore::new(path);
            match action {
                TripAction::Start { commute } => {
                    let id = store.start_trip(&commute, now_local()).await?;
                    println!("{id}");
                }
                TripAction::End { id, route } => {
                    let trip = store.end_trip(&id, now_local(), route).await?;
                    println!("{}", serde_json::to_string_pretty(&trip)?);
                }
            }
        }
    }

    Ok(())
}

fn predictor_for(config: &PredictionConfig) -> TrafficPredictor {
    TrafficPredictor::with_store(Arc::new(FileModelStore::new(&config.model_path)))
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

/// Lenient load restricted to the configured history window.
async fn load_history(path: &Path, config: &PredictionConfig) -> Result<Vec<TripRecord>> {
    let values: Vec<serde_json::Value> = read_json(path).await?;
    let records = parse_history(&values);
    let kept = within_window(&records, &now_local(), config.historical_data_days);
    log::info!(
        "Loaded {} of {} history entries ({} within {} days)",
        records.len(),
        values.len(),
        kept.len(),
        config.historical_data_days
    );
    Ok(kept)
}

fn print_pattern_tables(report: &PatternReport) {
    if let Some(message) = &report.message {
        println!("{message}");
        return;
    }

    let days: Vec<DayRow> = report
        .by_day
        .iter()
        .map(|d| DayRow {
            day: d.day.clone(),
            avg: d.avg_minutes,
            min: d.min_minutes,
            max: d.max_minutes,
            trips: d.trips,
        })
        .collect();
    let hours: Vec<HourRow> = report
        .by_hour
        .iter()
        .map(|h| HourRow {
            departure: h.label.clone(),
            avg: h.avg_minutes,
            trips: h.trips,
        })
        .collect();

    println!("{}", Table::new(days).with(Style::rounded()));
    println!("{}", Table::new(hours).with(Style::rounded()));
    for rec in &report.recommendations {
        println!("- {rec}");
    }
}
