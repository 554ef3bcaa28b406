//! Boundary caching
//!
//! Processed boundary sets are cached in memory under an exact-match
//! [`CacheKey`] with a per-granularity TTL chosen by the source resolver.

mod memory;
mod types;

pub use memory::BoundaryCache;
pub use types::{CacheEntry, CacheEntryInfo, CacheKey, CacheStats};
