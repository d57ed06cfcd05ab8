use std::hint::black_box;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use criterion::{Criterion, criterion_group, criterion_main};

use route_sniper::analysis::{PredictedRoute, compare};
use route_sniper::{RouteCandidate, TrafficLevel, TrafficPredictor, TrafficSnapshot, TripRecord};

fn at(ts: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(ts).unwrap()
}

fn synthetic_history(n: usize) -> Vec<TripRecord> {
    (0..n)
        .map(|i| {
            let ratio = 0.3 + 0.7 * (i % 7) as f64 / 6.0;
            let hour = 6 + i % 14;
            let day = 1 + i % 28;
            TripRecord::started(
                format!("t{i}"),
                "bench",
                at(&format!("2024-05-{day:02}T{hour:02}:20:00+00:00")),
            )
            .with_route(RouteCandidate::new(format!("r{}", i % 3), "Route", 15.0, 22.0))
            .with_traffic(TrafficSnapshot::new(TrafficLevel::from_speed_ratio(ratio), ratio))
            .with_duration(22.0 / ratio)
        })
        .collect()
}

fn bench_predict_duration(c: &mut Criterion) {
    let predictor = TrafficPredictor::new();
    predictor
        .train_on_records(&synthetic_history(200))
        .expect("training in memory");

    let route = RouteCandidate::new("r1", "Route", 15.0, 22.0);
    let traffic = TrafficSnapshot::new(TrafficLevel::Moderate, 0.6);
    let now = at("2024-06-03T08:05:00+00:00");

    let mut group = c.benchmark_group("predictor");
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("estimate_duration_at", |b| {
        b.iter(|| {
            predictor.estimate_duration_at(black_box(&route), Some(black_box(&traffic)), 30, &now)
        })
    });

    group.bench_function("predict_and_compare_5_routes", |b| {
        b.iter(|| {
            let predicted: Vec<PredictedRoute> = (0..5)
                .map(|i| {
                    let candidate =
                        RouteCandidate::new(format!("r{i}"), "Route", 15.0, 20.0 + i as f64);
                    predictor.predict_route(candidate, Some(&traffic), 30, &now)
                })
                .collect();
            compare(black_box(predicted), 2.0)
        })
    });

    group.finish();
}

fn bench_training(c: &mut Criterion) {
    let history = synthetic_history(200);
    let mut group = c.benchmark_group("training");
    group.sample_size(10);
    group.bench_function("train_on_200_records", |b| {
        b.iter(|| {
            let predictor = TrafficPredictor::new();
            predictor.train_on_records(black_box(&history))
        })
    });
    group.finish();
}

criterion_group!(benches, bench_predict_duration, bench_training);
criterion_main!(benches);
