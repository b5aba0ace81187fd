//! Metadata records and cache bookkeeping types

use crate::slack::{ChannelId, GroupId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Slack's built-in automation account; never a real audience member
pub const SLACKBOT_USER_ID: &str = "USLACKBOT";

/// User metadata as reported by Slack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// User ID (e.g., U09JDBT2MCM)
    pub id: UserId,

    /// Username/handle (e.g., "john.doe")
    #[serde(default)]
    pub name: String,

    /// Real name (e.g., "John Doe")
    #[serde(default)]
    pub real_name: Option<String>,

    /// Display name (what shows in Slack)
    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub is_bot: bool,

    #[serde(default)]
    pub is_deleted: bool,
}

impl UserRecord {
    /// Get best available name for display
    pub fn best_name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or(self.real_name.as_deref().filter(|n| !n.is_empty()))
            .unwrap_or(&self.name)
    }

    /// Whether this account can be addressed by a reminder
    pub fn is_addressable(&self) -> bool {
        !self.is_bot && !self.is_deleted && self.id.as_str() != SLACKBOT_USER_ID
    }
}

/// Channel metadata information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRecord {
    pub id: ChannelId,

    /// Channel name without # (e.g., "engineering")
    pub name: String,

    #[serde(default)]
    pub is_private: bool,

    /// Whether the bot is a member
    #[serde(default)]
    pub is_member: bool,
}

impl ChannelRecord {
    pub fn display_name(&self) -> String {
        format!("#{}", self.name)
    }
}

/// A cached value together with its write time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub value: T,
    pub written_at_ms: i64,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, written_at_ms: i64) -> Self {
        Self {
            value,
            written_at_ms,
        }
    }

    /// An entry is fresh while `now - written_at < ttl`
    pub fn is_fresh(&self, now_ms: i64, ttl_ms: i64) -> bool {
        now_ms.saturating_sub(self.written_at_ms) < ttl_ms
    }
}

/// Namespaced cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    User(UserId),
    ChannelMembers(ChannelId),
    UserGroup(GroupId),
    Users,
    Channels,
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::User(id) => write!(f, "user:{}", id),
            CacheKey::ChannelMembers(id) => write!(f, "channel-members:{}", id),
            CacheKey::UserGroup(id) => write!(f, "user-groups:{}", id),
            CacheKey::Users => f.write_str("users:all"),
            CacheKey::Channels => f.write_str("channels:all"),
        }
    }
}

/// Cache statistics for monitoring
#[derive(Debug, Default, Clone, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub api_calls: u64,
    pub api_errors: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> u32 {
        let lookups = self.hits + self.misses;
        if lookups > 0 {
            (self.hits as f32 / lookups as f32 * 100.0) as u32
        } else {
            0
        }
    }
}

/// Point-in-time view of what the store holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStatus {
    pub total_entries: usize,
    pub active_entries: usize,
    pub expired_entries: usize,
}

impl CacheStatus {
    /// Classify entries by write time against `ttl`
    pub fn from_write_times(times: &[i64], now_ms: i64, ttl: Duration) -> Self {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let active = times
            .iter()
            .filter(|written| CacheEntry::new((), **written).is_fresh(now_ms, ttl_ms))
            .count();

        CacheStatus {
            total_entries: times.len(),
            active_entries: active,
            expired_entries: times.len() - active,
        }
    }

    pub fn summary(&self) -> String {
        if self.total_entries == 0 {
            "Cache is empty".to_string()
        } else {
            format!(
                "Cache contains {} active and {} expired entries",
                self.active_entries, self.expired_entries
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserRecord {
        UserRecord {
            id: UserId::new(id),
            name: "john.doe".to_string(),
            real_name: Some("John Doe".to_string()),
            display_name: Some(String::new()),
            is_bot: false,
            is_deleted: false,
        }
    }

    #[test]
    fn test_user_best_name_skips_empty_display_name() {
        assert_eq!(user("U1").best_name(), "John Doe");
    }

    #[test]
    fn test_user_addressable() {
        assert!(user("U1").is_addressable());
        assert!(!user(SLACKBOT_USER_ID).is_addressable());

        let bot = UserRecord {
            is_bot: true,
            ..user("B1")
        };
        assert!(!bot.is_addressable());

        let gone = UserRecord {
            is_deleted: true,
            ..user("U2")
        };
        assert!(!gone.is_addressable());
    }

    #[test]
    fn test_cache_key_namespaces() {
        assert_eq!(CacheKey::User(UserId::new("U1")).to_string(), "user:U1");
        assert_eq!(
            CacheKey::ChannelMembers(ChannelId::new("C1")).to_string(),
            "channel-members:C1"
        );
        assert_eq!(
            CacheKey::UserGroup(GroupId::new("S1")).to_string(),
            "user-groups:S1"
        );
        assert_eq!(CacheKey::Users.to_string(), "users:all");
        assert_eq!(CacheKey::Channels.to_string(), "channels:all");
    }

    #[test]
    fn test_entry_freshness_boundary() {
        let entry = CacheEntry::new((), 1_000);
        assert!(entry.is_fresh(1_000, 500));
        assert!(entry.is_fresh(1_499, 500));
        assert!(!entry.is_fresh(1_500, 500));
    }

    #[test]
    fn test_status_from_write_times() {
        let ttl = Duration::from_millis(1_000);
        let status = CacheStatus::from_write_times(&[0, 500, 1_000], 1_500, ttl);
        assert_eq!(status.total_entries, 3);
        assert_eq!(status.active_entries, 2);
        assert_eq!(status.expired_entries, 1);

        let empty = CacheStatus::from_write_times(&[], 0, Duration::from_secs(60));
        assert_eq!(empty.summary(), "Cache is empty");
    }

    #[test]
    fn test_status_summary() {
        let empty = CacheStatus {
            total_entries: 0,
            active_entries: 0,
            expired_entries: 0,
        };
        assert_eq!(empty.summary(), "Cache is empty");

        let some = CacheStatus {
            total_entries: 3,
            active_entries: 2,
            expired_entries: 1,
        };
        assert_eq!(
            some.summary(),
            "Cache contains 2 active and 1 expired entries"
        );
    }
}
