use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::AppResult;
use crate::models::{Booking, BookingStatus, UserId};

/// Persistence for bookings. The only shared mutable state in the service.
///
/// Implementations must make `insert_booking` atomic: either the booking and all
/// of its slots are recorded, or nothing is, and a label already held by an
/// active booking for the same court and date yields `AppError::Conflict`.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Non-cancelled bookings for one court on one date.
    async fn active_bookings(&self, court_id: &str, date: NaiveDate) -> AppResult<Vec<Booking>>;

    async fn insert_booking(&self, booking: &Booking) -> AppResult<()>;

    /// Moving to `Cancelled` frees the booking's slots in the same write.
    async fn update_status(&self, id: &str, status: BookingStatus) -> AppResult<Booking>;

    async fn get_booking(&self, id: &str) -> AppResult<Option<Booking>>;

    /// Newest first.
    async fn list_bookings(
        &self,
        status: Option<BookingStatus>,
        limit: i64,
    ) -> AppResult<Vec<Booking>>;

    /// Newest first.
    async fn bookings_for_user(&self, user_id: &UserId) -> AppResult<Vec<Booking>>;
}
