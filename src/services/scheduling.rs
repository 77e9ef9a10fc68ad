use std::collections::HashSet;
use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate};

use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::{
    ladder, normalize_date, Booking, BookingStatus, CreateBookingRequest, SlotTime, TimeSlot,
    UserId,
};
use crate::services::pricing::PricingRule;
use crate::services::store::BookingStore;

pub const DEFAULT_LIST_LIMIT: i64 = 50;

/// Availability and booking operations over a `BookingStore`.
///
/// Holds no state of its own: every call reads the store, so slot listings are
/// never stale with respect to committed bookings.
#[derive(Clone)]
pub struct BookingEngine {
    store: Arc<dyn BookingStore>,
    pricing: Arc<dyn PricingRule>,
    offset: FixedOffset,
}

impl BookingEngine {
    pub fn new(
        store: Arc<dyn BookingStore>,
        pricing: Arc<dyn PricingRule>,
        offset: FixedOffset,
    ) -> Self {
        Self {
            store,
            pricing,
            offset,
        }
    }

    /// The full day's ladder for a court with occupancy from active bookings.
    pub async fn list_slots(&self, date: &str, court_id: &str) -> AppResult<Vec<TimeSlot>> {
        let date = normalize_date(date, self.offset)?;
        let court_id = require_court(court_id)?;

        let bookings = self.store.active_bookings(court_id, date).await?;
        let occupied: HashSet<SlotTime> = bookings
            .iter()
            .filter(|b| b.is_active())
            .flat_map(|b| b.slots.iter().copied())
            .collect();

        Ok(ladder()
            .into_iter()
            .map(|start| TimeSlot {
                id: start.slot_id(),
                start_time: start,
                is_booked: occupied.contains(&start),
                price: self.pricing.price(court_id, date, start),
            })
            .collect())
    }

    pub async fn create_booking(&self, request: CreateBookingRequest) -> AppResult<Booking> {
        let date = normalize_date(&request.date, self.offset)?;
        let court_id = require_court(&request.court_id)?.to_string();
        let slots = parse_slots(&request.slots)?;

        if let Some(participants) = request.participants {
            if participants < 1 {
                return Err(AppError::validation("participants must be at least 1"));
            }
        }

        let total_price = self.total_price(&court_id, date, &slots)?;
        if let Some(claimed) = request.total_price {
            if claimed != total_price {
                return Err(AppError::validation(format!(
                    "total price {claimed} does not match slot prices ({total_price})"
                )));
            }
        }

        let now = queries::now();
        let booking = Booking {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: request.user_id.as_ref().and_then(|raw| raw.normalize()),
            court_id,
            date,
            slots,
            booking_type: request.booking_type,
            total_price,
            status: BookingStatus::Pending,
            event_name: request
                .event_name
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty()),
            participants: request.participants,
            created_at: now,
            updated_at: now,
        };

        match self.store.insert_booking(&booking).await {
            Ok(()) => {
                tracing::info!(
                    booking_id = %booking.id,
                    court_id = %booking.court_id,
                    date = %booking.date,
                    slots = booking.slots.len(),
                    "booking created"
                );
                Ok(booking)
            }
            Err(AppError::Conflict { labels }) => {
                tracing::warn!(
                    court_id = %booking.court_id,
                    date = %booking.date,
                    taken = ?labels,
                    "booking rejected, slots already taken"
                );
                Err(AppError::Conflict { labels })
            }
            Err(e) => Err(e),
        }
    }

    /// Only `confirmed` and `cancelled` are valid targets.
    pub async fn update_booking_status(&self, id: &str, status: BookingStatus) -> AppResult<Booking> {
        if status == BookingStatus::Pending {
            return Err(AppError::validation(
                "status must be either confirmed or cancelled",
            ));
        }

        let booking = self.store.update_status(id, status).await?;
        tracing::info!(booking_id = %id, status = %status, "booking status updated");
        Ok(booking)
    }

    pub async fn get_booking(&self, id: &str) -> AppResult<Booking> {
        self.store
            .get_booking(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("booking {id}")))
    }

    pub async fn list_bookings(
        &self,
        status: Option<BookingStatus>,
        limit: Option<i64>,
    ) -> AppResult<Vec<Booking>> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT);
        if limit < 1 {
            return Err(AppError::validation("limit must be positive"));
        }
        self.store.list_bookings(status, limit).await
    }

    pub async fn user_bookings(&self, user_id: &str) -> AppResult<Vec<Booking>> {
        let user_id =
            UserId::new(user_id).ok_or_else(|| AppError::validation("user id must not be empty"))?;
        self.store.bookings_for_user(&user_id).await
    }

    fn total_price(&self, court_id: &str, date: NaiveDate, slots: &[SlotTime]) -> AppResult<i64> {
        slots
            .iter()
            .try_fold(0i64, |total, slot| {
                total.checked_add(self.pricing.price(court_id, date, *slot))
            })
            .ok_or_else(|| AppError::validation("total price is out of range"))
    }
}

fn require_court(court_id: &str) -> AppResult<&str> {
    let court_id = court_id.trim();
    if court_id.is_empty() {
        return Err(AppError::validation("court id must not be empty"));
    }
    Ok(court_id)
}

/// Parses and sorts the requested labels, rejecting duplicates.
fn parse_slots(labels: &[String]) -> AppResult<Vec<SlotTime>> {
    if labels.is_empty() {
        return Err(AppError::validation("at least one slot is required"));
    }

    let mut slots = labels
        .iter()
        .map(|label| SlotTime::parse(label.trim()))
        .collect::<AppResult<Vec<_>>>()?;
    slots.sort();

    if let Some(pair) = slots.windows(2).find(|w| w[0] == w[1]) {
        return Err(AppError::validation(format!(
            "slot {} requested more than once",
            pair[0]
        )));
    }
    Ok(slots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{self, SqliteBookingStore};
    use crate::errors::ErrorKind;
    use crate::models::{BookingType, RawUserId};
    use crate::services::pricing::FlatRate;
    use async_trait::async_trait;

    fn ict() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    fn engine() -> BookingEngine {
        let store = SqliteBookingStore::new(db::init_db(":memory:").unwrap());
        BookingEngine::new(Arc::new(store), Arc::new(FlatRate::new(50_000)), ict())
    }

    fn request(court: &str, date: &str, slots: &[&str]) -> CreateBookingRequest {
        CreateBookingRequest {
            user_id: None,
            court_id: court.to_string(),
            date: date.to_string(),
            slots: slots.iter().map(|s| s.to_string()).collect(),
            booking_type: BookingType::Single,
            total_price: None,
            event_name: None,
            participants: None,
        }
    }

    fn booked_labels(slots: &[TimeSlot]) -> Vec<String> {
        slots
            .iter()
            .filter(|s| s.is_booked)
            .map(|s| s.start_time.to_string())
            .collect()
    }

    struct UnreachableStore;

    #[async_trait]
    impl BookingStore for UnreachableStore {
        async fn active_bookings(&self, _: &str, _: NaiveDate) -> AppResult<Vec<Booking>> {
            Err(AppError::Store("connection refused".to_string()))
        }
        async fn insert_booking(&self, _: &Booking) -> AppResult<()> {
            Err(AppError::Store("connection refused".to_string()))
        }
        async fn update_status(&self, _: &str, _: BookingStatus) -> AppResult<Booking> {
            Err(AppError::Store("connection refused".to_string()))
        }
        async fn get_booking(&self, _: &str) -> AppResult<Option<Booking>> {
            Err(AppError::Store("connection refused".to_string()))
        }
        async fn list_bookings(&self, _: Option<BookingStatus>, _: i64) -> AppResult<Vec<Booking>> {
            Err(AppError::Store("connection refused".to_string()))
        }
        async fn bookings_for_user(&self, _: &UserId) -> AppResult<Vec<Booking>> {
            Err(AppError::Store("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_empty_day_is_fully_free() {
        let engine = engine();
        let slots = engine.list_slots("2025-03-01", "court-1").await.unwrap();
        assert_eq!(slots.len(), 33);
        assert!(slots.iter().all(|s| !s.is_booked && s.price == 50_000));
        assert_eq!(slots[0].id, "slot-6");
        assert_eq!(slots[1].id, "slot-6-30");
        assert_eq!(slots[32].start_time.to_string(), "22:00");
    }

    #[tokio::test]
    async fn test_booking_lifecycle_scenario() {
        let engine = engine();
        let mut req = request("court-1", "2025-03-01", &["10:00", "10:30"]);
        req.total_price = Some(100_000);

        let booking = engine.create_booking(req).await.unwrap();
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.total_price, 100_000);

        let slots = engine.list_slots("2025-03-01", "court-1").await.unwrap();
        assert_eq!(booked_labels(&slots), vec!["10:00", "10:30"]);

        engine
            .update_booking_status(&booking.id, BookingStatus::Cancelled)
            .await
            .unwrap();
        let slots = engine.list_slots("2025-03-01", "court-1").await.unwrap();
        assert!(booked_labels(&slots).is_empty());
    }

    #[tokio::test]
    async fn test_slot_ids_do_not_depend_on_occupancy() {
        let engine = engine();
        let before: Vec<String> = engine
            .list_slots("2025-03-01", "court-1")
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        engine
            .create_booking(request("court-1", "2025-03-01", &["06:00", "22:00"]))
            .await
            .unwrap();
        let after: Vec<String> = engine
            .list_slots("2025-03-01", "court-1")
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_confirmed_booking_still_occupies() {
        let engine = engine();
        let booking = engine
            .create_booking(request("court-1", "2025-03-01", &["10:00"]))
            .await
            .unwrap();
        engine
            .update_booking_status(&booking.id, BookingStatus::Confirmed)
            .await
            .unwrap();

        let slots = engine.list_slots("2025-03-01", "court-1").await.unwrap();
        assert_eq!(booked_labels(&slots), vec!["10:00"]);
    }

    #[tokio::test]
    async fn test_isolation_across_courts_and_dates() {
        let engine = engine();
        engine
            .create_booking(request("court-1", "2025-03-01", &["10:00"]))
            .await
            .unwrap();

        let other_court = engine.list_slots("2025-03-01", "court-2").await.unwrap();
        assert!(booked_labels(&other_court).is_empty());
        let other_day = engine.list_slots("2025-03-02", "court-1").await.unwrap();
        assert!(booked_labels(&other_day).is_empty());
    }

    #[tokio::test]
    async fn test_iso_timestamp_resolves_to_same_day() {
        let engine = engine();
        engine
            .create_booking(request("court-1", "2025-02-28T17:00:00.000Z", &["10:00"]))
            .await
            .unwrap();

        let slots = engine.list_slots("2025-03-01", "court-1").await.unwrap();
        assert_eq!(booked_labels(&slots), vec!["10:00"]);
    }

    #[tokio::test]
    async fn test_cancel_twice_is_idempotent() {
        let engine = engine();
        let booking = engine
            .create_booking(request("court-1", "2025-03-01", &["10:00"]))
            .await
            .unwrap();

        engine
            .update_booking_status(&booking.id, BookingStatus::Cancelled)
            .await
            .unwrap();
        let again = engine
            .update_booking_status(&booking.id, BookingStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(again.status, BookingStatus::Cancelled);

        let slots = engine.list_slots("2025-03-01", "court-1").await.unwrap();
        assert!(booked_labels(&slots).is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_booking_cannot_be_reconfirmed() {
        let engine = engine();
        let booking = engine
            .create_booking(request("court-1", "2025-03-01", &["10:00"]))
            .await
            .unwrap();
        engine
            .update_booking_status(&booking.id, BookingStatus::Cancelled)
            .await
            .unwrap();

        let err = engine
            .update_booking_status(&booking.id, BookingStatus::Confirmed)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_status_update_errors() {
        let engine = engine();
        let err = engine
            .update_booking_status("missing", BookingStatus::Confirmed)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = engine
            .update_booking_status("missing", BookingStatus::Pending)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_second_booking_for_same_slot_conflicts() {
        let engine = engine();
        engine
            .create_booking(request("court-1", "2025-03-01", &["10:00"]))
            .await
            .unwrap();

        let err = engine
            .create_booking(request("court-1", "2025-03-01", &["09:30", "10:00"]))
            .await
            .unwrap_err();
        match err {
            AppError::Conflict { labels } => assert_eq!(labels, vec!["10:00".to_string()]),
            other => panic!("expected conflict, got {other:?}"),
        }

        // The rejected request claimed nothing
        let slots = engine.list_slots("2025-03-01", "court-1").await.unwrap();
        assert_eq!(booked_labels(&slots), vec!["10:00"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_for_same_slot() {
        let engine = Arc::new(engine());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = Arc::clone(&engine);
                tokio::spawn(async move {
                    engine
                        .create_booking(request("court-1", "2025-03-01", &["18:00", "18:30"]))
                        .await
                })
            })
            .collect();

        let mut successes = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(AppError::Conflict { .. }) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(conflicts, 7);
    }

    #[tokio::test]
    async fn test_validation_failures() {
        let engine = engine();
        let cases = [
            request("court-1", "2025-03-01", &[]),
            request("court-1", "2025-03-01", &["05:30"]),
            request("court-1", "2025-03-01", &["22:30"]),
            request("court-1", "2025-03-01", &["10:15"]),
            request("court-1", "2025-03-01", &["10:00", "10:00"]),
            request("  ", "2025-03-01", &["10:00"]),
            request("court-1", "someday", &["10:00"]),
        ];
        for req in cases {
            let err = engine.create_booking(req.clone()).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{req:?}");
        }

        let mut wrong_total = request("court-1", "2025-03-01", &["10:00"]);
        wrong_total.total_price = Some(1);
        assert_eq!(
            engine.create_booking(wrong_total).await.unwrap_err().kind(),
            ErrorKind::Validation
        );

        let mut no_people = request("court-1", "2025-03-01", &["10:00"]);
        no_people.participants = Some(0);
        assert_eq!(
            engine.create_booking(no_people).await.unwrap_err().kind(),
            ErrorKind::Validation
        );
    }

    #[tokio::test]
    async fn test_total_price_overflow_is_rejected() {
        let store = SqliteBookingStore::new(db::init_db(":memory:").unwrap());
        let engine =
            BookingEngine::new(Arc::new(store), Arc::new(FlatRate::new(i64::MAX / 2 + 1)), ict());

        let err = engine
            .create_booking(request("court-1", "2025-03-01", &["10:00", "10:30"]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let slots = engine.list_slots("2025-03-01", "court-1").await.unwrap();
        assert!(booked_labels(&slots).is_empty());

        let single = engine
            .create_booking(request("court-1", "2025-03-01", &["10:00"]))
            .await
            .unwrap();
        assert_eq!(single.total_price, i64::MAX / 2 + 1);
    }

    #[tokio::test]
    async fn test_slots_are_stored_sorted_and_user_id_normalized() {
        let engine = engine();
        let mut req = request("court-1", "2025-03-01", &["11:00", "10:30"]);
        req.user_id = Some(RawUserId::Number(15));
        req.booking_type = BookingType::Group;
        req.participants = Some(4);

        let booking = engine.create_booking(req).await.unwrap();
        let labels: Vec<String> = booking.slots.iter().map(|s| s.to_string()).collect();
        assert_eq!(labels, vec!["10:30", "11:00"]);
        assert_eq!(booking.user_id.as_ref().unwrap().as_str(), "15");

        let mine = engine.user_bookings("15").await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].booking_type, BookingType::Group);
        assert_eq!(mine[0].participants, Some(4));
    }

    #[tokio::test]
    async fn test_get_and_list_bookings() {
        let engine = engine();
        let first = engine
            .create_booking(request("court-1", "2025-03-01", &["10:00"]))
            .await
            .unwrap();
        engine
            .create_booking(request("court-2", "2025-03-01", &["10:00"]))
            .await
            .unwrap();

        assert_eq!(engine.get_booking(&first.id).await.unwrap().court_id, "court-1");
        assert_eq!(
            engine.get_booking("missing").await.unwrap_err().kind(),
            ErrorKind::NotFound
        );

        assert_eq!(engine.list_bookings(None, None).await.unwrap().len(), 2);
        assert_eq!(
            engine
                .list_bookings(Some(BookingStatus::Confirmed), None)
                .await
                .unwrap()
                .len(),
            0
        );
        assert!(engine.list_bookings(None, Some(0)).await.is_err());
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let engine = BookingEngine::new(
            Arc::new(UnreachableStore),
            Arc::new(FlatRate::new(50_000)),
            ict(),
        );

        let err = engine.list_slots("2025-03-01", "court-1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.is_retryable());

        let err = engine
            .create_booking(request("court-1", "2025-03-01", &["10:00"]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);

        let err = engine
            .update_booking_status("b1", BookingStatus::Confirmed)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }
}
