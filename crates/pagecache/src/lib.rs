//! # pagecache
//!
//! Counting fetch-through cache for web pages.
//!
//! ## Architecture
//! - **KeyValueStore**: async seam over the backing store (embedded or RESP)
//! - **Fetcher**: async seam over page retrieval (HTTP in the shipped impl)
//! - **PageCache**: count-then-cache-or-fetch orchestration
//!
//! ## Guarantees
//! - The access counter bumps exactly once per `get_page` call, hit, miss,
//!   or failed fetch
//! - Cache entries are never served at or past their deadline
//! - Counter keys and content keys never collide

#![warn(missing_docs)]

mod cache;
mod error;
mod fetch;
mod remote;
mod resp;
mod single_flight;
mod stats;
mod store;

pub use cache::PageCache;
pub use error::{Error, Result};
pub use fetch::{Fetcher, HttpFetcher};
pub use remote::RemoteStore;
pub use single_flight::SingleFlight;
pub use stats::CacheStats;
pub use store::{KeyValueStore, MemoryStore};

use std::time::Duration;

/// Default cache entry lifetime
pub const DEFAULT_TTL: Duration = Duration::from_secs(10);
