pub mod booking_store;
pub mod rate_limiter;
