pub mod rate_limiter;
pub mod snapshot_store;
