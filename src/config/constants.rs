/// Number of dimensions in a feature vector. Training and inference share this layout.
pub const FEATURE_COUNT: usize = 16;

pub mod features {
    /// Commutes longer than this are treated as "max distance".
    pub const MAX_DISTANCE_KM: f64 = 100.0;
    pub const MAX_DURATION_MINUTES: f64 = 120.0;
    /// Highway speed used to normalise average speed.
    pub const MAX_SPEED_KMH: f64 = 120.0;
    pub const NEUTRAL_AVG_SPEED: f64 = 0.5;
    pub const MAX_INCIDENTS: usize = 5;

    pub const MORNING_RUSH_HOURS: std::ops::RangeInclusive<u32> = 7..=9;
    pub const EVENING_RUSH_HOURS: std::ops::RangeInclusive<u32> = 16..=19;
    pub const MIDDAY_HOURS: std::ops::RangeInclusive<u32> = 9..=16;
    pub const FIRST_WEEKEND_DAY: u32 = 5;
}

pub mod model {
    /// Fewer samples than this and `fit` declines to train.
    pub const MIN_TRAINING_SAMPLES: usize = 10;

    pub const N_ESTIMATORS: usize = 100;
    pub const MAX_DEPTH: usize = 5;
    pub const LEARNING_RATE: f64 = 0.1;
    pub const MIN_SAMPLES_SPLIT: usize = 5;
    pub const MIN_SAMPLES_LEAF: usize = 3;

    pub const MIN_MULTIPLIER: f64 = 0.5;
    pub const MAX_MULTIPLIER: f64 = 3.0;
    pub const NEUTRAL_MULTIPLIER: f64 = 1.0;
}

pub mod ensemble {
    pub const WEIGHT_MODEL: f64 = 0.5;
    pub const WEIGHT_HISTORICAL: f64 = 0.3;
    pub const WEIGHT_CURRENT: f64 = 0.2;

    pub const CONFIDENCE_TRAINED: f64 = 0.7;
    pub const CONFIDENCE_HEURISTIC: f64 = 0.4;
}

pub mod heuristic {
    /// Assumed slowdown when the speed ratio is missing or non-positive.
    pub const DEFAULT_MULTIPLIER: f64 = 1.5;
    pub const RUSH_TREND: f64 = 1.1;
    pub const MIDDAY_TREND: f64 = 1.0;
    pub const OFF_PEAK_TREND: f64 = 0.95;
}

pub mod patterns {
    /// Minimum gap (minutes) between best and worst averages before we recommend anything.
    pub const MIN_GAP_MINUTES: f64 = 5.0;
}
