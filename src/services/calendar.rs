use crate::models::{Booking, BookingStatus, SlotTime};

/// Groups sorted slots into runs of back-to-back slots.
fn contiguous_runs(slots: &[SlotTime]) -> Vec<(SlotTime, SlotTime)> {
    let mut runs: Vec<(SlotTime, SlotTime)> = vec![];
    for slot in slots {
        match runs.last_mut() {
            Some((_, last)) if last.is_followed_by(slot) => *last = *slot,
            _ => runs.push((*slot, *slot)),
        }
    }
    runs
}

pub fn generate_ics(booking: &Booking, venue_name: &str) -> String {
    let dtstamp = booking.created_at.format("%Y%m%dT%H%M%S").to_string();
    let status = match booking.status {
        BookingStatus::Pending => "TENTATIVE",
        BookingStatus::Confirmed => "CONFIRMED",
        BookingStatus::Cancelled => "CANCELLED",
    };
    let summary = match booking.event_name.as_deref() {
        Some(event) => format!("{event} at {venue_name}"),
        None => format!("Court {} at {venue_name}", booking.court_id),
    };

    let mut ics = String::from(
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//Courtbook//Court Booking//EN\r\n",
    );

    for (i, (first, last)) in contiguous_runs(&booking.slots).into_iter().enumerate() {
        let dtstart = booking
            .date
            .and_time(first.start())
            .format("%Y%m%dT%H%M%S")
            .to_string();
        let dtend = booking
            .date
            .and_time(last.end())
            .format("%Y%m%dT%H%M%S")
            .to_string();
        let uid = format!("{}-{i}@courtbook", booking.id);

        ics.push_str(&format!(
            "BEGIN:VEVENT\r\n\
             UID:{uid}\r\n\
             DTSTAMP:{dtstamp}\r\n\
             DTSTART:{dtstart}\r\n\
             DTEND:{dtend}\r\n\
             SUMMARY:{summary}\r\n\
             STATUS:{status}\r\n\
             END:VEVENT\r\n"
        ));
    }

    ics.push_str("END:VCALENDAR\r\n");
    ics
}
