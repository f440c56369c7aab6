use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer};

/// Visitors seen within this window count as "active now".
pub const ACTIVE_WINDOW_MINUTES: i64 = 5;

/// Symbolic window selector accepted by every aggregate query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeRange {
    Day,
    #[default]
    Week,
    Month,
}

impl TimeRange {
    /// Unrecognized selectors fall back to the 7 day window.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("1d") => TimeRange::Day,
            Some("7d") => TimeRange::Week,
            Some("30d") => TimeRange::Month,
            _ => TimeRange::default(),
        }
    }

    pub fn days(self) -> i64 {
        match self {
            TimeRange::Day => 1,
            TimeRange::Week => 7,
            TimeRange::Month => 30,
        }
    }

    /// Absolute cutoff (inclusive) for this window, in epoch millis.
    pub fn start_millis(self, now: DateTime<Utc>) -> i64 {
        (now - Duration::days(self.days())).timestamp_millis()
    }
}

impl<'de> Deserialize<'de> for TimeRange {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(TimeRange::parse(Some(&raw)))
    }
}

pub fn active_since_millis(now: DateTime<Utc>) -> i64 {
    (now - Duration::minutes(ACTIVE_WINDOW_MINUTES)).timestamp_millis()
}
