use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

use super::polling::PollingStatus;

const CLOCK_FORMAT: &str = "%H:%M";
const CLOCK_FORMAT_SECONDS: &str = "%H:%M:%S";

/// A wall-clock time of day, exchanged as `HH:MM`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime(pub NaiveTime);

impl ClockTime {
    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }
}

impl Display for ClockTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(CLOCK_FORMAT))
    }
}

impl FromStr for ClockTime {
    type Err = chrono::ParseError;

    /// Accepts `HH:MM`, and `HH:MM:SS` from clients that send seconds.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveTime::parse_from_str(s, CLOCK_FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(s, CLOCK_FORMAT_SECONDS))
            .map(Self)
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse()
            .map_err(|_| D::Error::custom(format!("invalid time of day `{raw}`, expected HH:MM")))
    }
}

/// Midnight UTC at the start of the given calendar date.
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).expect("midnight is always valid"))
}

/// The span of one calendar day during which an election is held.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TimeWindow {
    pub date: NaiveDate,
    pub start: ClockTime,
    pub end: ClockTime,
}

impl TimeWindow {
    pub fn new(date: NaiveDate, start: ClockTime, end: ClockTime) -> Self {
        Self { date, start, end }
    }

    /// The window must open before it closes.
    pub fn is_well_formed(&self) -> bool {
        self.start < self.end
    }

    pub fn opens_at(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.date.and_time(self.start.0))
    }

    pub fn closes_at(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.date.and_time(self.end.0))
    }

    /// Derive the polling status at the instant `now`. Both ends of the window are inclusive.
    pub fn status_at(&self, now: DateTime<Utc>) -> PollingStatus {
        if now < self.opens_at() {
            PollingStatus::NotStarted
        } else if now <= self.closes_at() {
            PollingStatus::Active
        } else {
            PollingStatus::Completed
        }
    }
}
