//! Observation instants.
//!
//! AHI full-disk observations start every 10 minutes; filenames carry the
//! nominal start as `YYYYMMDD_hhmm` in UTC. That string is also the key used
//! to group segment files into one observation.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Format of the grouping key embedded in filenames.
pub const GROUP_KEY_FORMAT: &str = "%Y%m%d_%H%M";

/// Format used for timestamps in the output table.
pub const TABLE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Nominal start of one observation, minute resolution, UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObservationTime(DateTime<Utc>);

impl ObservationTime {
    /// Build from a date and a time of day; seconds are dropped.
    pub fn new(date: NaiveDate, time: NaiveTime) -> Self {
        let time = time.with_second(0).and_then(|t| t.with_nanosecond(0)).unwrap_or(time);
        Self(NaiveDateTime::new(date, time).and_utc())
    }

    /// Parse the `YYYYMMDD` and `hhmm` filename fields.
    pub fn from_fields(date: &str, hhmm: &str) -> Option<Self> {
        if date.len() != 8 || hhmm.len() != 4 {
            return None;
        }
        Self::parse_group_key(&format!("{}_{}", date, hhmm))
    }

    /// Parse a `YYYYMMDD_hhmm` grouping key.
    pub fn parse_group_key(key: &str) -> Option<Self> {
        NaiveDateTime::parse_from_str(key, GROUP_KEY_FORMAT)
            .ok()
            .map(|dt| Self(dt.and_utc()))
    }

    pub fn utc(&self) -> DateTime<Utc> {
        self.0
    }

    pub fn date(&self) -> NaiveDate {
        self.0.date_naive()
    }

    /// The same instant on a fixed local offset (e.g. UTC+8 for Philippine time).
    pub fn local(&self, offset: FixedOffset) -> DateTime<FixedOffset> {
        self.0.with_timezone(&offset)
    }

    /// `YYYYMMDD_hhmm`
    pub fn group_key(&self) -> String {
        self.0.format(GROUP_KEY_FORMAT).to_string()
    }

    /// `YYYYMMDD`
    pub fn date_compact(&self) -> String {
        self.0.format("%Y%m%d").to_string()
    }

    /// `hhmm`
    pub fn hhmm(&self) -> String {
        self.0.format("%H%M").to_string()
    }

    /// `YYYY/MM/DD/hhmm`, the directory layout of the public AHI bucket.
    pub fn remote_dir(&self) -> String {
        self.0.format("%Y/%m/%d/%H%M").to_string()
    }
}

impl fmt::Display for ObservationTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.group_key())
    }
}
