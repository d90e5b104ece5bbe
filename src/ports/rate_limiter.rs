/// Request throttling keyed by caller (IP address, requester id).
pub trait RateLimiter: Send + Sync {
    /// Take one request slot for `key`; `false` if the key is over its limit.
    fn try_consume(&self, key: &str) -> bool;
}
