mod cache;
mod store;

pub use cache::{Clock, StravaCache, SystemClock};
pub use store::{CacheStore, JsonFileStore, MemoryCacheStore, StravaCacheEntry};
