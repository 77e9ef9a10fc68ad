use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::{Booking, BookingStatus, UserId};
use crate::services::store::BookingStore;

/// SQLite-backed store. One connection, serialised behind a mutex; writes run
/// in `IMMEDIATE` transactions.
#[derive(Clone)]
pub struct SqliteBookingStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteBookingStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Store("database connection lock poisoned".to_string()))
    }
}

#[async_trait]
impl BookingStore for SqliteBookingStore {
    async fn active_bookings(&self, court_id: &str, date: NaiveDate) -> AppResult<Vec<Booking>> {
        let db = self.lock()?;
        queries::get_active_bookings(&db, court_id, date)
    }

    async fn insert_booking(&self, booking: &Booking) -> AppResult<()> {
        let mut db = self.lock()?;
        queries::insert_booking(&mut db, booking)
    }

    async fn update_status(&self, id: &str, status: BookingStatus) -> AppResult<Booking> {
        let mut db = self.lock()?;
        queries::update_booking_status(&mut db, id, status)
    }

    async fn get_booking(&self, id: &str) -> AppResult<Option<Booking>> {
        let db = self.lock()?;
        queries::get_booking_by_id(&db, id)
    }

    async fn list_bookings(
        &self,
        status: Option<BookingStatus>,
        limit: i64,
    ) -> AppResult<Vec<Booking>> {
        let db = self.lock()?;
        queries::get_all_bookings(&db, status, limit)
    }

    async fn bookings_for_user(&self, user_id: &UserId) -> AppResult<Vec<Booking>> {
        let db = self.lock()?;
        queries::get_bookings_for_user(&db, user_id)
    }
}
