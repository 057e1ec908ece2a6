//! Request-deduplicating query cache
//!
//! Results of logical upstream queries are cached under a normalized
//! [`CacheKey`] with a per-entry TTL. Misses are single-flight per key.

pub mod key;
pub mod store;

pub use key::CacheKey;
pub use store::{CacheEntry, QueryCache};
