//! Time utilities for the app blocker
//!
//! Provides wall-clock time of day, the daily recurring block window, and a
//! `now()` wrapper used for every "what time is it" question.
//!
//! # Mock Time for Development
//!
//! In debug builds, the `BLOCKER_MOCK_TIME` environment variable can be set
//! to override the system time for all time-sensitive operations. This is useful
//! for checking overnight windows without waiting for midnight.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` (e.g., `2025-12-25 23:30:00`)
//!
//! Example:
//! ```bash
//! BLOCKER_MOCK_TIME="2025-12-25 23:30:00" blockerd check
//! ```

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

use crate::BlockerError;

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "BLOCKER_MOCK_TIME";

/// Format accepted by `BLOCKER_MOCK_TIME` and the CLI `--at` flag
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SECONDS_PER_DAY: u32 = 86_400;

/// Cached mock time offset from the real time when the process started.
/// This allows mock time to advance naturally.
static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            if let Ok(mock_time_str) = std::env::var(MOCK_TIME_ENV_VAR) {
                match parse_local_datetime(&mock_time_str) {
                    Ok(naive_dt) => {
                        if let Some(mock_dt) = Local.from_local_datetime(&naive_dt).single() {
                            let offset = mock_dt.signed_duration_since(chrono::Local::now());
                            tracing::info!(
                                mock_time = %mock_time_str,
                                offset_secs = offset.num_seconds(),
                                "Mock time enabled"
                            );
                            return Some(offset);
                        }
                        tracing::warn!(
                            mock_time = %mock_time_str,
                            "Failed to convert mock time to local timezone"
                        );
                    }
                    Err(_) => {
                        tracing::warn!(
                            mock_time = %mock_time_str,
                            expected_format = DATETIME_FORMAT,
                            "Invalid mock time format"
                        );
                    }
                }
            }
            None
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Returns whether mock time is currently active.
pub fn is_mock_time_active() -> bool {
    get_mock_time_offset().is_some()
}

/// Get the current local time, respecting mock time settings in debug builds.
pub fn now() -> DateTime<Local> {
    let real_now = chrono::Local::now();

    if let Some(offset) = get_mock_time_offset() {
        real_now + offset
    } else {
        real_now
    }
}

/// The device's current local calendar day
pub fn today() -> NaiveDate {
    now().date_naive()
}

/// Parse a local date-time in `YYYY-MM-DD HH:MM:SS` form
pub fn parse_local_datetime(s: &str) -> crate::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s.trim(), DATETIME_FORMAT).map_err(|e| {
        BlockerError::invalid_input(format!(
            "'{}' is not a date-time in {} form: {}",
            s, DATETIME_FORMAT, e
        ))
    })
}

/// Parse a calendar day in `YYYY-MM-DD` form
pub fn parse_day(s: &str) -> crate::Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|e| {
        BlockerError::invalid_input(format!("'{}' is not a YYYY-MM-DD day: {}", s, e))
    })
}

/// Wall-clock time of day with second precision.
///
/// The canonical text form is `HH:MM:SS`, which is also how the value is
/// serialized so stored plans stay readable regardless of the serializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WallClock {
    hour: u8,
    minute: u8,
    second: u8,
}

impl WallClock {
    pub const MIDNIGHT: WallClock = WallClock {
        hour: 0,
        minute: 0,
        second: 0,
    };

    pub fn new(hour: u8, minute: u8, second: u8) -> Option<Self> {
        if hour < 24 && minute < 60 && second < 60 {
            Some(Self {
                hour,
                minute,
                second,
            })
        } else {
            None
        }
    }

    /// Shorthand for a whole-minute time
    pub fn hm(hour: u8, minute: u8) -> Option<Self> {
        Self::new(hour, minute, 0)
    }

    pub fn to_naive_time(self) -> NaiveTime {
        NaiveTime::from_num_seconds_from_midnight_opt(self.as_seconds_from_midnight(), 0)
            .unwrap_or(NaiveTime::MIN)
    }

    /// Sub-second precision is dropped.
    pub fn from_naive_time(time: NaiveTime) -> Self {
        Self {
            hour: time.hour() as u8,
            minute: time.minute() as u8,
            // Leap seconds surface as second 59 with a large nanosecond part
            second: time.second().min(59) as u8,
        }
    }

    /// Returns seconds since midnight
    pub fn as_seconds_from_midnight(&self) -> u32 {
        (self.hour as u32) * 3600 + (self.minute as u32) * 60 + self.second as u32
    }

    /// Seconds from `self` forward to `later`, wrapping past midnight
    fn seconds_until(&self, later: WallClock) -> u32 {
        (later.as_seconds_from_midnight() + SECONDS_PER_DAY - self.as_seconds_from_midnight())
            % SECONDS_PER_DAY
    }
}

impl PartialOrd for WallClock {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WallClock {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_seconds_from_midnight()
            .cmp(&other.as_seconds_from_midnight())
    }
}

impl fmt::Display for WallClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)
    }
}

impl FromStr for WallClock {
    type Err = BlockerError;

    /// Accepts `HH:MM:SS`, `HH:MM:SS.fff` and `HH:MM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
            .map(Self::from_naive_time)
            .map_err(|_| {
                BlockerError::invalid_input(format!("'{}' is not a time of day (HH:MM:SS)", s))
            })
    }
}

impl Serialize for WallClock {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WallClock {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A daily recurring window, e.g. 22:00-06:00.
///
/// The window is half-open: it contains `start` and excludes `end`. When
/// `start > end` it wraps past midnight. When `start == end` it covers the
/// whole day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: WallClock,
    pub end: WallClock,
}

impl TimeWindow {
    pub fn new(start: WallClock, end: WallClock) -> Self {
        Self { start, end }
    }

    pub fn is_full_day(&self) -> bool {
        self.start == self.end
    }

    pub fn crosses_midnight(&self) -> bool {
        self.start > self.end
    }

    /// Check if the given local time of day falls within this window
    pub fn contains(&self, time: NaiveTime) -> bool {
        let time = WallClock::from_naive_time(time);

        if self.is_full_day() {
            true
        } else if self.start < self.end {
            time >= self.start && time < self.end
        } else {
            // Window crosses midnight (e.g., 22:00 - 06:00)
            time >= self.start || time < self.end
        }
    }

    /// Duration from `time` until the window closes, or `None` outside it.
    ///
    /// A full-day window "closes" at its next `end` boundary and reopens
    /// immediately; exactly at the boundary a whole day remains.
    pub fn remaining(&self, time: NaiveTime) -> Option<Duration> {
        if !self.contains(time) {
            return None;
        }

        let secs = match WallClock::from_naive_time(time).seconds_until(self.end) {
            0 => SECONDS_PER_DAY,
            n => n,
        };
        Some(Duration::from_secs(secs as u64))
    }

    /// Duration from `time` until the window next opens, or `None` inside it.
    pub fn until_open(&self, time: NaiveTime) -> Option<Duration> {
        if self.contains(time) {
            return None;
        }

        let secs = WallClock::from_naive_time(time).seconds_until(self.start);
        Some(Duration::from_secs(secs as u64))
    }

    /// Length of one occurrence of the window
    pub fn length(&self) -> Duration {
        let secs = match self.start.seconds_until(self.end) {
            0 => SECONDS_PER_DAY,
            n => n,
        };
        Duration::from_secs(secs as u64)
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Helper to format durations in human-readable form
pub fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
