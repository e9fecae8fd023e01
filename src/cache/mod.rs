//! Request-scoped caching for upstream API responses
//!
//! Unlike a persistent cache, entries here live exactly as long as one
//! logical unit of work. Terminal failures are cached alongside payloads so
//! a known-bad endpoint is never retried within the same request.

pub mod request;

pub use request::{CacheEntry, CachedFetch, RequestCache};
