use chrono::NaiveDate;

use crate::models::SlotTime;

/// Price of one half-hour slot, in currency minor units.
pub trait PricingRule: Send + Sync {
    fn price(&self, court_id: &str, date: NaiveDate, start: SlotTime) -> i64;
}

/// Same rate for every court, day and time.
#[derive(Debug, Clone, Copy)]
pub struct FlatRate {
    pub per_slot: i64,
}

impl FlatRate {
    pub fn new(per_slot: i64) -> Self {
        Self { per_slot }
    }
}

impl PricingRule for FlatRate {
    fn price(&self, _court_id: &str, _date: NaiveDate, _start: SlotTime) -> i64 {
        self.per_slot
    }
}
