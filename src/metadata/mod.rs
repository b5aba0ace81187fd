//! Metadata cache for roster data
//!
//! Users, channel memberships, user groups and the channel list are cached as
//! time-boxed snapshots behind a pluggable [`CacheStore`].
//!
//! Key features:
//! - Fetch-through: misses and stale entries are refetched from Slack
//! - TTL-based expiry: 15-minute default (configurable)
//! - No poisoning: a failed fetch leaves the entry absent
//! - Swappable backend: in-memory or JSON file

mod cache;
mod clock;
mod store;
mod types;

pub use cache::{DEFAULT_TTL, MetadataCache};
pub use clock::{Clock, SystemClock};
pub use store::{CacheStore, InMemoryStore, JsonFileStore, StoredEntry};
pub use types::{
    CacheEntry, CacheKey, CacheStats, CacheStatus, ChannelRecord, SLACKBOT_USER_ID, UserRecord,
};
