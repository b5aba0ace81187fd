//! Filtering raw user ids down to addressable humans

use crate::config::IgnoreList;
use crate::error::Result;
use crate::metadata::{MetadataCache, SLACKBOT_USER_ID};
use crate::slack::{ChannelId, UserId};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Every raw id list (channel members, mentions, group members) passes through here
/// before it is treated as audience
pub struct MembershipResolver {
    cache: Arc<MetadataCache>,
    ignore_users: IgnoreList,
}

impl MembershipResolver {
    pub fn new(cache: Arc<MetadataCache>, ignore_users: IgnoreList) -> Self {
        Self {
            cache,
            ignore_users,
        }
    }

    pub fn cache(&self) -> &Arc<MetadataCache> {
        &self.cache
    }

    /// Drop bots, ignored and deleted accounts; output is deduplicated and sorted
    ///
    /// Ids whose record cannot be fetched are dropped as if they were bots.
    pub async fn filter_members<I>(&self, ids: I) -> Vec<UserId>
    where
        I: IntoIterator<Item = UserId>,
    {
        let unique: BTreeSet<UserId> = ids.into_iter().collect();
        let mut kept = Vec::with_capacity(unique.len());

        for id in unique {
            // Cheap exclusions first so they never cost a lookup
            if id.as_str() == SLACKBOT_USER_ID {
                continue;
            }
            if self.ignore_users.contains(&id) {
                tracing::trace!(user_id = %id, "Ignored user excluded");
                continue;
            }

            match self.cache.user_record(&id).await {
                Some(record) if record.is_addressable() => kept.push(id),
                Some(record) => {
                    tracing::trace!(
                        user_id = %id,
                        is_bot = record.is_bot,
                        is_deleted = record.is_deleted,
                        "User excluded"
                    );
                }
                None => {
                    tracing::debug!(user_id = %id, "Unknown user excluded");
                }
            }
        }

        kept
    }

    /// Filtered current membership of a channel
    pub async fn channel_members(&self, channel: &ChannelId) -> Result<Vec<UserId>> {
        let raw = self.cache.channel_members(channel).await?;
        let members = self.filter_members(raw).await;
        tracing::debug!(channel_id = %channel, members = members.len(), "Resolved channel members");
        Ok(members)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::InMemoryStore;
    use crate::test_support::{Call, FakeGateway};

    fn resolver(gateway: Arc<FakeGateway>, ignore: &str) -> MembershipResolver {
        let cache = MetadataCache::new(gateway, Arc::new(InMemoryStore::new()));
        MembershipResolver::new(Arc::new(cache), IgnoreList::parse(ignore))
    }

    fn ids(raw: &[&str]) -> Vec<UserId> {
        raw.iter().map(|u| UserId::new(*u)).collect()
    }

    fn gateway() -> Arc<FakeGateway> {
        Arc::new(
            FakeGateway::new()
                .with_users(&["U1", "U2", "U3", "U4"])
                .with_bot("B1")
                .with_deleted("UDEL")
                .with_user(SLACKBOT_USER_ID),
        )
    }

    #[tokio::test]
    async fn test_excludes_bots_ignored_deleted_and_unknown() {
        let resolver = resolver(gateway(), "U4");

        let kept = resolver
            .filter_members(ids(&["U3", "B1", "U1", "UDEL", "U4", "UNKNOWN", SLACKBOT_USER_ID]))
            .await;

        assert_eq!(kept, ids(&["U1", "U3"]));
    }

    #[tokio::test]
    async fn test_output_is_deduplicated_and_sorted() {
        let resolver = resolver(gateway(), "");
        let kept = resolver.filter_members(ids(&["U2", "U1", "U2", "U1"])).await;
        assert_eq!(kept, ids(&["U1", "U2"]));
    }

    #[tokio::test]
    async fn test_filter_is_idempotent() {
        let resolver = resolver(gateway(), "U2");
        let input = ids(&["U4", "U2", "B1", "U1", "UDEL", "U3", "U1", "UX"]);

        let once = resolver.filter_members(input).await;
        let twice = resolver.filter_members(once.clone()).await;
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn test_cheap_exclusions_skip_lookup() {
        let gw = gateway();
        let resolver = resolver(gw.clone(), "U4");

        resolver
            .filter_members(ids(&["U4", SLACKBOT_USER_ID]))
            .await;
        assert_eq!(gw.count(|c| matches!(c, Call::UserRecord(_))), 0);
    }

    #[tokio::test]
    async fn test_channel_members_are_filtered() {
        let gw = Arc::new(
            FakeGateway::new()
                .with_channel("C1", &["U1", "B1", "U2"])
                .with_users(&["U1", "U2"])
                .with_bot("B1"),
        );
        let resolver = resolver(gw, "U2");

        let members = resolver.channel_members(&ChannelId::new("C1")).await.unwrap();
        assert_eq!(members, ids(&["U1"]));
    }

    #[tokio::test]
    async fn test_channel_lookup_failure_propagates() {
        let resolver = resolver(gateway(), "");
        assert!(resolver.channel_members(&ChannelId::new("CNONE")).await.is_err());
    }
}
