use crate::error::{ReminderError, Result};
use crate::logging::{Timer, log_tolerated, preview};
use crate::membership::MembershipResolver;
use crate::mentions::tokenizer::{MentionToken, mention_tokens, split_zones};
use crate::slack::{ChannelId, ChatGateway, MessageTs, UserId};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Users addressed by one message
///
/// `to_users` and `cc_users` are disjoint and sorted; `all_users` is their sorted union.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Audience {
    pub to_users: Vec<UserId>,
    pub cc_users: Vec<UserId>,
    pub all_users: Vec<UserId>,
}

impl Audience {
    /// Build from raw sets, letting `to` win over `cc`
    pub fn new(to: BTreeSet<UserId>, mut cc: BTreeSet<UserId>) -> Self {
        cc.retain(|user| !to.contains(user));
        let all_users = to.union(&cc).cloned().collect();

        Self {
            to_users: to.into_iter().collect(),
            cc_users: cc.into_iter().collect(),
            all_users,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.all_users.is_empty()
    }

    pub fn len(&self) -> usize {
        self.all_users.len()
    }
}

/// Turns a message into its audience
pub struct MentionResolver {
    gateway: Arc<dyn ChatGateway>,
    membership: Arc<MembershipResolver>,
}

impl MentionResolver {
    pub fn new(gateway: Arc<dyn ChatGateway>, membership: Arc<MembershipResolver>) -> Self {
        Self {
            gateway,
            membership,
        }
    }

    pub async fn resolve_mentions(&self, channel: &ChannelId, ts: &MessageTs) -> Result<Audience> {
        let _timer = Timer::new("resolve_mentions");

        let message = self.gateway.get_message(channel, ts).await?;
        tracing::debug!(
            channel_id = %channel,
            ts = %ts,
            text = %preview(&message.text, 80),
            "Resolving mentions"
        );

        let members: BTreeSet<UserId> = self
            .membership
            .channel_members(channel)
            .await
            .map_err(|e| ReminderError::ChannelLookupFailed {
                channel: channel.to_string(),
                reason: e.to_string(),
            })?
            .into_iter()
            .collect();

        let zones = split_zones(&message.text);
        let raw_to = self.collect_zone(zones.to, &members).await;
        let raw_cc = self.collect_zone(zones.cc, &members).await;

        let to: BTreeSet<UserId> = self
            .membership
            .filter_members(raw_to)
            .await
            .into_iter()
            .filter(|user| members.contains(user))
            .collect();
        let cc: BTreeSet<UserId> = self
            .membership
            .filter_members(raw_cc)
            .await
            .into_iter()
            .filter(|user| members.contains(user))
            .collect();

        let audience = Audience::new(to, cc);
        tracing::info!(
            channel_id = %channel,
            ts = %ts,
            to = audience.to_users.len(),
            cc = audience.cc_users.len(),
            "Audience resolved"
        );

        Ok(audience)
    }

    /// Raw ids mentioned in one zone; failed group lookups are skipped
    async fn collect_zone(&self, zone: &str, members: &BTreeSet<UserId>) -> BTreeSet<UserId> {
        let mut ids = BTreeSet::new();
        let mut broadcast = false;

        for token in mention_tokens(zone) {
            match token {
                MentionToken::Direct(user) => {
                    ids.insert(user);
                }
                MentionToken::Group(group) => {
                    match self.membership.cache().group_members(&group).await {
                        Ok(users) => ids.extend(users),
                        Err(e) => {
                            let err = ReminderError::GroupLookupFailed {
                                group: group.to_string(),
                                reason: e.to_string(),
                            };
                            log_tolerated("group_members", &err);
                        }
                    }
                }
                MentionToken::Broadcast if !broadcast => {
                    broadcast = true;
                    ids.extend(members.iter().cloned());
                }
                MentionToken::Broadcast => {}
            }
        }

        ids
    }
}
