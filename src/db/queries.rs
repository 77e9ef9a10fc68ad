use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, TransactionBehavior};

use crate::errors::{AppError, AppResult};
use crate::models::booking_date::DATE_FORMAT;
use crate::models::{Booking, BookingStatus, BookingType, SlotTime, UserId};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

const BOOKING_COLUMNS: &str = "id, user_id, court_id, date, slots, type, total_price, status, \
                               event_name, participants, created_at, updated_at";

pub fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

// ── Bookings ──

/// Inserts the booking and claims its slots in one transaction.
///
/// Fails with `Conflict` when any label is already claimed by an active booking
/// for the same court and date; nothing is written in that case.
pub fn insert_booking(conn: &mut Connection, booking: &Booking) -> AppResult<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let date = booking.date.format(DATE_FORMAT).to_string();

    let taken = claimed_labels(&tx, &booking.court_id, &date)?;
    let conflicts: Vec<String> = booking
        .slots
        .iter()
        .map(SlotTime::to_string)
        .filter(|label| taken.contains(label))
        .collect();
    if !conflicts.is_empty() {
        return Err(AppError::Conflict { labels: conflicts });
    }

    let slots_json = serde_json::to_string(&booking.slots)?;
    tx.execute(
        &format!(
            "INSERT INTO bookings ({BOOKING_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
        ),
        params![
            booking.id,
            booking.user_id.as_ref().map(UserId::as_str),
            booking.court_id,
            date,
            slots_json,
            booking.booking_type.as_str(),
            booking.total_price,
            booking.status.as_str(),
            booking.event_name,
            booking.participants,
            booking.created_at.format(TIMESTAMP_FORMAT).to_string(),
            booking.updated_at.format(TIMESTAMP_FORMAT).to_string(),
        ],
    )?;

    {
        let mut stmt = tx.prepare(
            "INSERT INTO booking_slots (booking_id, court_id, date, slot_label) VALUES (?1, ?2, ?3, ?4)",
        )?;
        for slot in &booking.slots {
            let label = slot.to_string();
            stmt.execute(params![booking.id, booking.court_id, date, label])
                .map_err(|e| {
                    if is_constraint_violation(&e) {
                        AppError::Conflict {
                            labels: vec![label.clone()],
                        }
                    } else {
                        e.into()
                    }
                })?;
        }
    }

    tx.commit()?;
    Ok(())
}

fn claimed_labels(conn: &Connection, court_id: &str, date: &str) -> AppResult<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT slot_label FROM booking_slots WHERE court_id = ?1 AND date = ?2")?;
    let rows = stmt.query_map(params![court_id, date], |row| row.get::<_, String>(0))?;

    let mut labels = vec![];
    for row in rows {
        labels.push(row?);
    }
    Ok(labels)
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(e, rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation)
}

pub fn get_active_bookings(
    conn: &Connection,
    court_id: &str,
    date: NaiveDate,
) -> AppResult<Vec<Booking>> {
    let date = date.format(DATE_FORMAT).to_string();
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE court_id = ?1 AND date = ?2 AND status != 'cancelled'
         ORDER BY created_at ASC, rowid ASC"
    ))?;

    let rows = stmt.query_map(params![court_id, date], |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> AppResult<Option<Booking>> {
    let result = conn.query_row(
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
        params![id],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Applies a status change and releases the slot claims on cancellation.
pub fn update_booking_status(
    conn: &mut Connection,
    id: &str,
    status: BookingStatus,
) -> AppResult<Booking> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let current =
        get_booking_by_id(&tx, id)?.ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;

    if !current.status.can_transition_to(status) {
        return Err(AppError::validation(format!(
            "booking {id} cannot move from {} to {status}",
            current.status
        )));
    }
    if current.status == status {
        return Ok(current);
    }

    let updated_at = now();
    tx.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![
            status.as_str(),
            updated_at.format(TIMESTAMP_FORMAT).to_string(),
            id
        ],
    )?;

    if status == BookingStatus::Cancelled {
        tx.execute("DELETE FROM booking_slots WHERE booking_id = ?1", params![id])?;
    }

    tx.commit()?;

    Ok(Booking {
        status,
        updated_at,
        ..current
    })
}

pub fn get_all_bookings(
    conn: &Connection,
    status_filter: Option<BookingStatus>,
    limit: i64,
) -> AppResult<Vec<Booking>> {
    let (sql, params_vec): (String, Vec<Box<dyn rusqlite::types::ToSql>>) = match status_filter {
        Some(status) => (
            format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings WHERE status = ?1 \
                 ORDER BY created_at DESC, rowid DESC LIMIT ?2"
            ),
            vec![
                Box::new(status.as_str()) as Box<dyn rusqlite::types::ToSql>,
                Box::new(limit),
            ],
        ),
        None => (
            format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings \
                 ORDER BY created_at DESC, rowid DESC LIMIT ?1"
            ),
            vec![Box::new(limit) as Box<dyn rusqlite::types::ToSql>],
        ),
    };

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn get_bookings_for_user(conn: &Connection, user_id: &UserId) -> AppResult<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE user_id = ?1
         ORDER BY created_at DESC, rowid DESC"
    ))?;

    let rows = stmt.query_map(params![user_id.as_str()], |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

fn parse_booking_row(row: &rusqlite::Row) -> AppResult<Booking> {
    let id: String = row.get(0)?;
    let user_id: Option<String> = row.get(1)?;
    let court_id: String = row.get(2)?;
    let date_str: String = row.get(3)?;
    let slots_json: String = row.get(4)?;
    let type_str: String = row.get(5)?;
    let total_price: i64 = row.get(6)?;
    let status_str: String = row.get(7)?;
    let event_name: Option<String> = row.get(8)?;
    let participants: Option<i32> = row.get(9)?;
    let created_at_str: String = row.get(10)?;
    let updated_at_str: String = row.get(11)?;

    let corrupt = |field: &str, value: &str| {
        AppError::Store(format!("booking {id} has unreadable {field}: {value}"))
    };

    let date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT)
        .map_err(|_| corrupt("date", &date_str))?;
    let slots: Vec<SlotTime> = serde_json::from_str(&slots_json)?;
    let booking_type = BookingType::parse(&type_str).ok_or_else(|| corrupt("type", &type_str))?;
    let status = BookingStatus::parse(&status_str).ok_or_else(|| corrupt("status", &status_str))?;
    let created_at = NaiveDateTime::parse_from_str(&created_at_str, TIMESTAMP_FORMAT)
        .map_err(|_| corrupt("created_at", &created_at_str))?;
    let updated_at = NaiveDateTime::parse_from_str(&updated_at_str, TIMESTAMP_FORMAT)
        .map_err(|_| corrupt("updated_at", &updated_at_str))?;

    Ok(Booking {
        user_id: user_id.as_deref().and_then(UserId::new),
        court_id,
        date,
        slots,
        booking_type,
        total_price,
        status,
        event_name,
        participants,
        created_at,
        updated_at,
        id,
    })
}
