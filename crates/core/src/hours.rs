//! Store opening hours and the pickup slot grid.
//!
//! All times are store-local. Callers convert from UTC before asking.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

use crate::pickup::PickupSelection;

/// Distance between pickup slots.
pub const SLOT_MINUTES: i64 = 30;

const fn hm(hour: u32, minute: u32) -> NaiveTime {
    match NaiveTime::from_hms_opt(hour, minute, 0) {
        Some(t) => t,
        None => panic!("invalid constant time"),
    }
}

/// Opening hours for one weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreHours {
    /// First minute the store is open.
    pub open: NaiveTime,
    /// First minute the store is closed again.
    pub close: NaiveTime,
    /// Latest slot offered on the pickup grid.
    pub last_slot: NaiveTime,
}

impl StoreHours {
    /// Wednesday is the early-close day.
    pub const WEDNESDAY: Self = Self {
        open: hm(8, 0),
        close: hm(15, 0),
        last_slot: hm(14, 30),
    };

    /// Every other day of the week.
    pub const REGULAR: Self = Self {
        open: hm(8, 0),
        close: hm(20, 0),
        last_slot: hm(20, 0),
    };

    /// Hours for a given weekday.
    #[must_use]
    pub const fn for_weekday(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Wed => Self::WEDNESDAY,
            _ => Self::REGULAR,
        }
    }

    /// Whether the store is open at `time` (`open <= time < close`).
    #[must_use]
    pub fn is_open_at(&self, time: NaiveTime) -> bool {
        self.open <= time && time < self.close
    }

    /// Every slot on this day's grid, earliest first.
    #[must_use]
    pub fn slots(&self) -> Vec<NaiveTime> {
        let step = Duration::minutes(SLOT_MINUTES);
        let mut slots = Vec::new();
        let mut slot = self.open;
        while slot <= self.last_slot {
            slots.push(slot);
            let (next, wrapped) = slot.overflowing_add_signed(step);
            if wrapped != 0 {
                break;
            }
            slot = next;
        }
        slots
    }

    /// Closing hour as shown to customers, e.g. `3pm`.
    fn close_label(&self) -> String {
        self.close.format("%-I%P").to_string()
    }
}

/// Whether the store is open at the given local date and time.
#[must_use]
pub fn is_open(now: NaiveDateTime) -> bool {
    StoreHours::for_weekday(now.weekday()).is_open_at(now.time())
}

/// Pickup slots still available on `date` as seen at `now`.
///
/// Past dates have no slots. On the current day, slots at or before the
/// current time are dropped.
#[must_use]
pub fn pickup_slots(date: NaiveDate, now: NaiveDateTime) -> Vec<NaiveTime> {
    let today = now.date();
    if date < today {
        return Vec::new();
    }

    let slots = StoreHours::for_weekday(date.weekday()).slots();
    if date == today {
        slots.into_iter().filter(|slot| *slot > now.time()).collect()
    } else {
        slots
    }
}

/// One-line store status for the menu header.
#[must_use]
pub fn status_message(now: NaiveDateTime) -> String {
    let hours = StoreHours::for_weekday(now.weekday());
    if hours.is_open_at(now.time()) {
        return format!("Pickup Available • Closes at {}", hours.close_label());
    }

    let next_open_day = if now.time() < hours.open {
        now.weekday()
    } else {
        now.weekday().succ()
    };

    if next_open_day == Weekday::Wed {
        "Closed • Opens Wed 8am-3pm".to_string()
    } else {
        "Closed • Opens 8am-8pm".to_string()
    }
}

impl PickupSelection {
    /// Whether this selection can be honored when ordering at `now`.
    ///
    /// `ASAP` requires the store to be open right now; a scheduled slot must
    /// still be on the grid for its day.
    #[must_use]
    pub fn is_valid_at(&self, now: NaiveDateTime) -> bool {
        match self {
            Self::Immediate => is_open(now),
            Self::Scheduled { date, time } => pickup_slots(*date, now).contains(time),
        }
    }
}
