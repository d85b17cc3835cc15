//! Rate-limited cached reads of volatile upstreams.

mod cache;
mod fetcher;
mod policy;

pub use cache::{CacheEntry, FetchCache};
pub use fetcher::{CachedFetcher, FetchOptions, FetchSource, Fetched};
pub use policy::RetryPolicy;
pub use tenantsync_core::upstream::RemoteError;
