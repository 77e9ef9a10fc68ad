use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::SlotTime;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub user_id: Option<UserId>,
    pub court_id: String,
    pub date: NaiveDate,
    pub slots: Vec<SlotTime>,
    #[serde(rename = "type")]
    pub booking_type: BookingType,
    pub total_price: i64,
    pub status: BookingStatus,
    pub event_name: Option<String>,
    pub participants: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Booking {
    pub fn is_active(&self) -> bool {
        self.status != BookingStatus::Cancelled
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }

    /// Re-applying the current status is allowed; a cancelled booking never comes back.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (*self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Cancelled)
                | (Confirmed, Confirmed)
                | (Cancelled, Cancelled)
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingType {
    #[default]
    Single,
    Group,
    Event,
}

impl BookingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingType::Single => "single",
            BookingType::Group => "group",
            BookingType::Event => "event",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "single" => Some(BookingType::Single),
            "group" => Some(BookingType::Group),
            "event" => Some(BookingType::Event),
            _ => None,
        }
    }
}

/// Canonical user identifier: a non-empty, trimmed string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// User references as clients send them: some send the numeric row id, some a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawUserId {
    Number(i64),
    Text(String),
}

impl RawUserId {
    pub fn normalize(&self) -> Option<UserId> {
        match self {
            RawUserId::Number(n) => UserId::new(&n.to_string()),
            RawUserId::Text(s) => UserId::new(s),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookingRequest {
    #[serde(default)]
    pub user_id: Option<RawUserId>,
    pub court_id: String,
    pub date: String,
    pub slots: Vec<String>,
    #[serde(default, rename = "type")]
    pub booking_type: BookingType,
    #[serde(default)]
    pub total_price: Option<i64>,
    #[serde(default)]
    pub event_name: Option<String>,
    #[serde(default)]
    pub participants: Option<i32>,
}
