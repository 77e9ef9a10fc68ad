use std::env;

use chrono::{FixedOffset, Offset, Utc};

pub const DEFAULT_SLOT_PRICE: i64 = 50_000;

/// Venue local time (UTC+07:00), used to turn client timestamps into booking dates.
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 7 * 60;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    pub slot_price: i64,
    pub utc_offset_minutes: i32,
    pub venue_name: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "courtbook.db".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            slot_price: slot_price(env::var("SLOT_PRICE").ok().and_then(|v| v.parse().ok())),
            utc_offset_minutes: env::var("REPORTING_UTC_OFFSET_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_UTC_OFFSET_MINUTES),
            venue_name: env::var("VENUE_NAME").unwrap_or_else(|_| "Court Booking".to_string()),
        }
    }

    /// Falls back to the default offset when the configured one is out of range.
    pub fn reporting_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or_else(|| {
            tracing::warn!(
                minutes = self.utc_offset_minutes,
                "invalid reporting offset, using default"
            );
            default_offset()
        })
    }
}

fn slot_price(configured: Option<i64>) -> i64 {
    match configured {
        Some(price) if price > 0 => price,
        Some(price) => {
            tracing::warn!(price, "slot price must be positive, using default");
            DEFAULT_SLOT_PRICE
        }
        None => DEFAULT_SLOT_PRICE,
    }
}

fn default_offset() -> FixedOffset {
    FixedOffset::east_opt(DEFAULT_UTC_OFFSET_MINUTES * 60).unwrap_or(Utc.fix())
}
