//! Metadata cache for users, channel memberships, user groups and channels

use crate::error::Result;
use crate::metadata::clock::{Clock, SystemClock};
use crate::metadata::store::CacheStore;
use crate::metadata::types::{
    CacheEntry, CacheKey, CacheStats, CacheStatus, ChannelRecord, UserRecord,
};
use crate::slack::{ChannelId, ChatGateway, GroupId, UserId};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Default time-to-live for cached roster data
pub const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);

/// Metadata cache with fetch-through from the chat platform
///
/// Values are snapshots of remote truth: a read returns only entries written less than
/// `ttl` ago, anything older is refetched. Failed fetches are never written.
pub struct MetadataCache {
    /// Source of truth for misses
    gateway: Arc<dyn ChatGateway>,

    store: Arc<dyn CacheStore>,

    clock: Arc<dyn Clock>,

    ttl: Duration,

    stats: Arc<RwLock<CacheStats>>,
}

impl MetadataCache {
    /// Create a new metadata cache with the default TTL
    pub fn new(gateway: Arc<dyn ChatGateway>, store: Arc<dyn CacheStore>) -> Self {
        Self::with_ttl(gateway, store, DEFAULT_TTL)
    }

    /// Create a new metadata cache with custom TTL
    pub fn with_ttl(
        gateway: Arc<dyn ChatGateway>,
        store: Arc<dyn CacheStore>,
        ttl: Duration,
    ) -> Self {
        Self::with_clock(gateway, store, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(
        gateway: Arc<dyn ChatGateway>,
        store: Arc<dyn CacheStore>,
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        tracing::info!(ttl_secs = ttl.as_secs(), "Creating metadata cache");

        Self {
            gateway,
            store,
            clock,
            ttl,
            stats: Arc::new(RwLock::new(CacheStats::default())),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn ttl_ms(&self) -> i64 {
        i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX)
    }

    /// Read a fresh value; stale, missing and undecodable entries all read as absent
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let key_str = key.to_string();
        let now = self.clock.now_ms();

        let fresh = match self.store.get(&key_str) {
            Some(entry) if entry.is_fresh(now, self.ttl_ms()) => Some(entry),
            Some(entry) => {
                tracing::debug!(
                    key = %key_str,
                    age_ms = now.saturating_sub(entry.written_at_ms),
                    "Cache entry stale"
                );
                None
            }
            None => None,
        };

        let value = fresh.and_then(|entry| match serde_json::from_value(entry.value) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key = %key_str, error = %e, "Discarding undecodable cache entry");
                None
            }
        });

        let mut stats = self.stats.write().await;
        if value.is_some() {
            stats.hits += 1;
            tracing::trace!(key = %key_str, "Cache hit");
        } else {
            stats.misses += 1;
            tracing::trace!(key = %key_str, "Cache miss");
        }

        value
    }

    /// Write a value stamped with the current time, purging expired entries first
    pub async fn put<T: Serialize>(&self, key: &CacheKey, value: &T) -> Result<()> {
        let now = self.purge(self.clock.now_ms())?;

        let entry = CacheEntry::new(serde_json::to_value(value)?, now);
        self.store.put(&key.to_string(), entry)
    }

    /// Write several values with one purge and one store write
    pub async fn put_many<'a, T, I>(&self, values: I) -> Result<()>
    where
        T: Serialize + 'a,
        I: IntoIterator<Item = (CacheKey, &'a T)>,
    {
        let now = self.purge(self.clock.now_ms())?;

        let batch = values
            .into_iter()
            .map(|(key, value)| {
                let entry = CacheEntry::new(serde_json::to_value(value)?, now);
                Ok((key.to_string(), entry))
            })
            .collect::<Result<Vec<_>>>()?;
        self.store.put_many(batch)
    }

    fn purge(&self, now: i64) -> Result<i64> {
        let purged = self.store.purge_expired(now, self.ttl_ms())?;
        if purged > 0 {
            tracing::debug!(purged = purged, "Purged expired cache entries");
        }
        Ok(now)
    }

    pub async fn invalidate(&self, key: &CacheKey) -> Result<()> {
        tracing::debug!(key = %key, "Invalidating cache entry");
        self.store.remove(&key.to_string())
    }

    pub async fn clear(&self) -> Result<()> {
        tracing::info!("Clearing metadata cache");
        self.store.clear()
    }

    /// Count active and expired entries
    pub fn status(&self) -> CacheStatus {
        CacheStatus::from_write_times(&self.store.write_times(), self.clock.now_ms(), self.ttl)
    }

    /// Get cache statistics
    pub async fn stats(&self) -> CacheStats {
        self.stats.read().await.clone()
    }

    /// Log cache statistics (for periodic monitoring)
    pub async fn log_stats(&self) {
        let stats = self.stats().await;
        let status = self.status();

        tracing::info!(
            entries = status.total_entries,
            expired = status.expired_entries,
            hit_rate = stats.hit_rate(),
            api_calls = stats.api_calls,
            api_errors = stats.api_errors,
            "Metadata cache statistics"
        );
    }

    /// Return the cached value or fetch, store and return a fresh one
    async fn get_or_fetch<T, F, Fut>(&self, key: CacheKey, fetch: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(value) = self.get(&key).await {
            return Ok(value);
        }
        self.fetch_and_store(&key, fetch).await
    }

    async fn fetch_and_store<T, F, Fut>(&self, key: &CacheKey, fetch: F) -> Result<T>
    where
        T: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.stats.write().await.api_calls += 1;
        tracing::debug!(key = %key, "Fetching from Slack API");

        match fetch().await {
            Ok(value) => {
                if let Err(e) = self.put(key, &value).await {
                    tracing::warn!(key = %key, error = %e, "Failed to write cache entry");
                }
                Ok(value)
            }
            Err(e) => {
                self.stats.write().await.api_errors += 1;
                Err(e)
            }
        }
    }

    /// User record, or `None` when the user cannot be looked up
    pub async fn user_record(&self, user: &UserId) -> Option<UserRecord> {
        let key = CacheKey::User(user.clone());
        match self
            .get_or_fetch(key, || self.gateway.get_user_record(user))
            .await
        {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(user_id = %user, error = %e, "Failed to fetch user info");
                None
            }
        }
    }

    /// Raw member ids of a channel, unfiltered
    pub async fn channel_members(&self, channel: &ChannelId) -> Result<Vec<UserId>> {
        let key = CacheKey::ChannelMembers(channel.clone());
        self.get_or_fetch(key, || self.gateway.get_channel_members(channel))
            .await
    }

    pub async fn group_members(&self, group: &GroupId) -> Result<Vec<UserId>> {
        let key = CacheKey::UserGroup(group.clone());
        self.get_or_fetch(key, || self.gateway.get_group_members(group))
            .await
    }

    /// Whole workspace user list; a fresh fetch also primes the per-user entries
    pub async fn users(&self) -> Result<Vec<UserRecord>> {
        if let Some(users) = self.get(&CacheKey::Users).await {
            return Ok(users);
        }

        let users = self
            .fetch_and_store(&CacheKey::Users, || self.gateway.list_users())
            .await?;

        let entries = users.iter().map(|user| (CacheKey::User(user.id.clone()), user));
        match self.put_many(entries).await {
            Ok(()) => tracing::info!(users = users.len(), "Primed user cache from users.list"),
            Err(e) => tracing::warn!(error = %e, "Failed to prime user entries"),
        }

        Ok(users)
    }

    pub async fn channels(&self) -> Result<Vec<ChannelRecord>> {
        self.get_or_fetch(CacheKey::Channels, || self.gateway.list_channels())
            .await
    }
}
