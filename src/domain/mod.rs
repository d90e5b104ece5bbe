pub mod availability;
pub mod booking;
pub mod date_range;
pub mod pricing;
