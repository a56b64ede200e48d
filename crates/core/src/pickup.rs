//! Pickup time selection.
//!
//! The selection is a tagged value internally. The string form (`ASAP` or
//! `2025-03-01 at 02:00 PM`) exists only at the storage and checkout
//! boundaries.

use core::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Serialized form of [`PickupSelection::Immediate`].
pub const ASAP: &str = "ASAP";

static SCHEDULED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})-(\d{2})-(\d{2}) at (\d{1,2}):(\d{2}) (AM|PM)$").expect("Invalid regex")
});

/// Errors that can occur when parsing a [`PickupSelection`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PickupParseError {
    /// The input is neither `ASAP` nor `YYYY-MM-DD at H:MM AM|PM`.
    #[error("pickup time must be ASAP or YYYY-MM-DD at H:MM AM|PM")]
    Format,
    /// The date part does not name a real calendar day.
    #[error("pickup date is not a valid calendar date")]
    Date,
    /// The time part is out of range (e.g. `13:00 PM`).
    #[error("pickup time of day is out of range")]
    Time,
}

/// When the customer wants to collect their order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PickupSelection {
    /// As soon as possible. Only offered while the store is open.
    #[default]
    Immediate,
    /// A specific slot on the pickup grid.
    Scheduled {
        /// Pickup day.
        date: NaiveDate,
        /// Pickup time of day, store-local.
        time: NaiveTime,
    },
}

impl PickupSelection {
    /// Create a scheduled selection.
    #[must_use]
    pub const fn scheduled(date: NaiveDate, time: NaiveTime) -> Self {
        Self::Scheduled { date, time }
    }

    /// Whether this is the `ASAP` selection.
    #[must_use]
    pub const fn is_immediate(&self) -> bool {
        matches!(self, Self::Immediate)
    }

    /// Parse the serialized form.
    ///
    /// Leading and trailing whitespace is ignored. The hour may have one or
    /// two digits.
    ///
    /// # Errors
    ///
    /// Returns an error if the input has the wrong shape or names a date or
    /// time that does not exist.
    pub fn parse(s: &str) -> Result<Self, PickupParseError> {
        let s = s.trim();
        if s == ASAP {
            return Ok(Self::Immediate);
        }

        let caps = SCHEDULED_RE.captures(s).ok_or(PickupParseError::Format)?;
        let num = |i: usize| -> Result<u32, PickupParseError> {
            caps.get(i)
                .and_then(|m| m.as_str().parse().ok())
                .ok_or(PickupParseError::Format)
        };

        let year = i32::try_from(num(1)?).map_err(|_| PickupParseError::Date)?;
        let date =
            NaiveDate::from_ymd_opt(year, num(2)?, num(3)?).ok_or(PickupParseError::Date)?;

        let hour12 = num(4)?;
        let minute = num(5)?;
        if !(1..=12).contains(&hour12) {
            return Err(PickupParseError::Time);
        }
        let pm = caps.get(6).is_some_and(|m| m.as_str() == "PM");
        let hour = match (hour12, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, false) => h,
            (h, true) => h + 12,
        };
        let time = NaiveTime::from_hms_opt(hour, minute, 0).ok_or(PickupParseError::Time)?;

        Ok(Self::Scheduled { date, time })
    }
}

/// Format a time of day the way the pickup grid shows it: `08:30 AM`.
#[must_use]
pub fn format_slot(time: NaiveTime) -> String {
    time.format("%I:%M %p").to_string()
}

impl fmt::Display for PickupSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Immediate => f.write_str(ASAP),
            Self::Scheduled { date, time } => {
                write!(f, "{} at {}", date.format("%Y-%m-%d"), format_slot(*time))
            }
        }
    }
}

impl FromStr for PickupSelection {
    type Err = PickupParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for PickupSelection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PickupSelection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
