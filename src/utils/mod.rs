mod maths_utils;
mod perf;
mod time_utils;

pub use time_utils::{AppInstant, TimeUtils, WallClock, minutes_between, now_local};

pub use maths_utils::{mean, mean_and_stddev, round_to, round1};

pub(crate) use maths_utils::{get_max, get_min};
