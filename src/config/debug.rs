//! Debugging feature flags.

#[allow(dead_code)]
pub struct LogFlags {
    /// Log every blended prediction (multiplier sources, weights, final minutes).
    pub log_predictions: bool,

    /// Log offline training batches (samples kept/skipped, swap events).
    pub log_training: bool,

    /// Log route comparison decisions.
    pub log_comparison: bool,

    /// Log pattern-analysis group sizes.
    pub log_patterns: bool,

    /// Activate trace_time macro (for cool scope-level timing)
    pub log_performance: bool,
}

pub const DF: LogFlags = LogFlags {
    log_predictions: false,
    log_training: true,
    log_comparison: false,
    log_patterns: false,
    log_performance: false,
};
