// Pure algorithms over domain values
pub mod features;
pub mod patterns;
pub mod route_comparison;
pub mod window;

pub use features::{FEATURE_NAMES, FeatureVector};
pub use patterns::{DayStats, HourStats, OverallStats, PatternAnalyzer, PatternInsights, PatternReport};
pub use route_comparison::{
    ComparisonError, PredictedRoute, RouteComparison, RouteOption, compare, compare_with_current,
};
pub use window::within_window;
