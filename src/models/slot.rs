use std::fmt;

use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

pub const OPENING_HOUR: u8 = 6;
pub const CLOSING_HOUR: u8 = 22;
pub const SLOT_MINUTES: i64 = 30;

/// A start time on the operating-hours ladder. Construction guarantees ladder membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SlotTime {
    hour: u8,
    minute: u8,
}

impl SlotTime {
    fn new(hour: u8, minute: u8) -> Option<Self> {
        let on_ladder = match minute {
            0 => (OPENING_HOUR..=CLOSING_HOUR).contains(&hour),
            30 => (OPENING_HOUR..CLOSING_HOUR).contains(&hour),
            _ => false,
        };
        on_ladder.then_some(Self { hour, minute })
    }

    /// Parses a zero-padded `HH:MM` label.
    pub fn parse(label: &str) -> Result<Self, AppError> {
        let invalid = || AppError::validation(format!("invalid slot label: {label}"));

        let (h, m) = label.split_once(':').ok_or_else(invalid)?;
        if h.len() != 2 || m.len() != 2 {
            return Err(invalid());
        }
        let hour: u8 = h.parse().map_err(|_| invalid())?;
        let minute: u8 = m.parse().map_err(|_| invalid())?;

        Self::new(hour, minute).ok_or_else(|| {
            AppError::validation(format!(
                "slot {label} is outside operating hours {OPENING_HOUR:02}:00-{CLOSING_HOUR:02}:00"
            ))
        })
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    /// `slot-6` for on-the-hour slots, `slot-6-30` for half past.
    pub fn slot_id(&self) -> String {
        if self.minute == 0 {
            format!("slot-{}", self.hour)
        } else {
            format!("slot-{}-{}", self.hour, self.minute)
        }
    }

    pub fn start(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour.into(), self.minute.into(), 0).unwrap_or_default()
    }

    pub fn end(&self) -> NaiveTime {
        self.start() + Duration::minutes(SLOT_MINUTES)
    }

    /// True when `next` starts exactly where this slot ends.
    pub fn is_followed_by(&self, next: &SlotTime) -> bool {
        self.end() == next.start()
    }
}

impl fmt::Display for SlotTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl TryFrom<String> for SlotTime {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        SlotTime::parse(&value)
    }
}

impl From<SlotTime> for String {
    fn from(value: SlotTime) -> Self {
        value.to_string()
    }
}

/// Every slot of a day, ascending: 06:00, 06:30, ..., 21:30, 22:00.
pub fn ladder() -> Vec<SlotTime> {
    let mut slots = Vec::with_capacity(ladder_len());
    for hour in OPENING_HOUR..=CLOSING_HOUR {
        slots.push(SlotTime { hour, minute: 0 });
        if hour < CLOSING_HOUR {
            slots.push(SlotTime { hour, minute: 30 });
        }
    }
    slots
}

pub const fn ladder_len() -> usize {
    let hours = (CLOSING_HOUR - OPENING_HOUR) as usize;
    hours * 2 + 1
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeSlot {
    pub id: String,
    pub start_time: SlotTime,
    pub is_booked: bool,
    pub price: i64,
}
