//! Millisecond-resolution version timestamps
//!
//! A [`VersionTime`] is both the ordering key and the identity of a document
//! version. Its text form is fixed-width so that lexicographic order of the
//! text equals chronological order, which storage layouts rely on when they
//! list directories or keys.

use crate::context::Context;
use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Text layout of a version, e.g. `2024-01-03_14-30-00.123`
pub const VERSION_FORMAT: &str = "%Y-%m-%d_%H-%M-%S%.3f";

/// Length of the textual form
pub const VERSION_STRING_LEN: usize = 23;

/// 0000-01-01 00:00:00.000 UTC, the first four-digit year
const MIN_UNIX_MILLIS: i64 = -62_167_219_200_000;

/// 9999-12-31 23:59:59.999 UTC, the last four-digit year
const MAX_UNIX_MILLIS: i64 = 253_402_300_799_999;

/// UTC timestamp truncated to milliseconds; the null value means "no version"
#[derive(Copy, Clone, Default, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct VersionTime(Option<DateTime<Utc>>);

impl VersionTime {
    /// The null version
    pub const fn null() -> Self {
        Self(None)
    }

    /// Current time, or the time pinned in the context
    pub fn now(ctx: &Context) -> Self {
        match ctx.pinned_time() {
            Some(pinned) => pinned,
            None => Self::from_datetime(Utc::now()),
        }
    }

    /// [`VersionTime::now`], bumped to one millisecond after `prev` if the clock
    /// has not moved past it
    pub fn next_after(ctx: &Context, prev: VersionTime) -> Self {
        let now = Self::now(ctx);
        match prev.0 {
            Some(_) if !now.after(&prev) => prev.add_millis(1),
            _ => now,
        }
    }

    /// Truncates to milliseconds
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self::from_unix_millis(dt.timestamp_millis())
    }

    /// Null outside years 0000 through 9999, where the text form would not
    /// keep its fixed width
    pub fn from_unix_millis(millis: i64) -> Self {
        if !(MIN_UNIX_MILLIS..=MAX_UNIX_MILLIS).contains(&millis) {
            return Self::null();
        }
        Self(Utc.timestamp_millis_opt(millis).single())
    }

    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        self.0
    }

    pub fn unix_millis(&self) -> Option<i64> {
        self.0.map(|dt| dt.timestamp_millis())
    }

    pub fn is_null(&self) -> bool {
        self.0.is_none()
    }

    pub fn before(&self, other: &VersionTime) -> bool {
        self < other
    }

    pub fn after(&self, other: &VersionTime) -> bool {
        self > other
    }

    pub fn equal(&self, other: &VersionTime) -> bool {
        self == other
    }

    /// Null stays null
    pub fn add_millis(&self, millis: i64) -> Self {
        match self.unix_millis() {
            Some(ms) => Self::from_unix_millis(ms + millis),
            None => *self,
        }
    }
}

impl From<DateTime<Utc>> for VersionTime {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_datetime(dt)
    }
}

impl fmt::Display for VersionTime {
    /// Null formats as the empty string
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(dt) => write!(f, "{}", dt.format(VERSION_FORMAT)),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for VersionTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(_) => write!(f, "VersionTime({self})"),
            None => write!(f, "VersionTime(null)"),
        }
    }
}

impl FromStr for VersionTime {
    type Err = Error;

    /// The empty string parses as null
    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Ok(Self::null());
        }
        if s.len() != VERSION_STRING_LEN {
            return Err(Error::invalid(format!(
                "version {s:?}: expected {VERSION_STRING_LEN} characters"
            )));
        }
        let naive = NaiveDateTime::parse_from_str(s, VERSION_FORMAT)
            .map_err(|e| Error::invalid(format!("version {s:?}: {e}")))?;
        Ok(Self::from_datetime(Utc.from_utc_datetime(&naive)))
    }
}

impl Serialize for VersionTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.0 {
            Some(_) => serializer.serialize_str(&self.to_string()),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for VersionTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text: Option<String> = Option::deserialize(deserializer)?;
        match text {
            Some(s) => s.parse().map_err(serde::de::Error::custom),
            None => Ok(Self::null()),
        }
    }
}
