pub mod calendar;
pub mod pricing;
pub mod scheduling;
pub mod store;
