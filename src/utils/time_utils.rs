use chrono::{DateTime, Datelike, FixedOffset, Local, NaiveDateTime, Timelike};

pub type AppInstant = std::time::Instant;

pub struct TimeUtils;

impl TimeUtils {
    pub const MINUTES_IN_H: i64 = 60;
    pub const SECS_IN_MIN: f64 = 60.0;
    pub const HOURS_IN_D: u32 = 24;
    pub const DAYS_IN_W: u32 = 7;
    pub const MONTHS_IN_Y: u32 = 12;
    pub const WEEKDAY_NAMES: [&'static str; 7] = [
        "Monday",
        "Tuesday",
        "Wednesday",
        "Thursday",
        "Friday",
        "Saturday",
        "Sunday",
    ];

    /// Day name for a Monday=0 weekday index. Out-of-range indices wrap.
    pub fn weekday_name(weekday: u32) -> &'static str {
        Self::WEEKDAY_NAMES[(weekday % Self::DAYS_IN_W) as usize]
    }

    /// Departure bucket label, e.g. `08:00`.
    pub fn hour_label(hour: u32) -> String {
        format!("{:02}:00", hour)
    }
}

/// Wall-clock components used by feature extraction and pattern grouping.
pub trait WallClock {
    fn weekday_index(&self) -> u32;
    fn hour_of_day(&self) -> u32;
    fn fractional_hour(&self) -> f64;
    /// 1 = January.
    fn month_of_year(&self) -> u32;
}

impl WallClock for NaiveDateTime {
    fn weekday_index(&self) -> u32 {
        self.weekday().num_days_from_monday()
    }

    fn hour_of_day(&self) -> u32 {
        self.hour()
    }

    fn fractional_hour(&self) -> f64 {
        self.hour() as f64 + self.minute() as f64 / TimeUtils::MINUTES_IN_H as f64
    }

    fn month_of_year(&self) -> u32 {
        self.month()
    }
}

impl WallClock for DateTime<FixedOffset> {
    fn weekday_index(&self) -> u32 {
        self.naive_local().weekday_index()
    }

    fn hour_of_day(&self) -> u32 {
        self.naive_local().hour_of_day()
    }

    fn fractional_hour(&self) -> f64 {
        self.naive_local().fractional_hour()
    }

    fn month_of_year(&self) -> u32 {
        self.naive_local().month_of_year()
    }
}

pub fn now_local() -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
}

/// Minutes elapsed between two instants, negative if `end` precedes `start`.
pub fn minutes_between(start: &DateTime<FixedOffset>, end: &DateTime<FixedOffset>) -> f64 {
    (*end - *start).num_milliseconds() as f64 / 1000.0 / TimeUtils::SECS_IN_MIN
}
