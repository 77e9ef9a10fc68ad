pub mod booking;
pub mod booking_date;
pub mod slot;

pub use booking::{Booking, BookingStatus, BookingType, CreateBookingRequest, RawUserId, UserId};
pub use booking_date::normalize_date;
pub use slot::{ladder, SlotTime, TimeSlot};
