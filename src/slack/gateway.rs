use crate::error::Result;
use crate::metadata::{ChannelRecord, UserRecord};
use crate::slack::{ChannelId, GroupId, MessageTs, ReactionMap, SlackMessage, UserId};
use async_trait::async_trait;

/// Remote calls the reminder core makes against the chat platform
///
/// Every call is a single request/response. Implementations do not retry.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Fetch one message; `MessageNotFound` when `ts` matches nothing in the thread
    async fn get_message(&self, channel: &ChannelId, ts: &MessageTs) -> Result<SlackMessage>;

    async fn get_channel_members(&self, channel: &ChannelId) -> Result<Vec<UserId>>;

    async fn get_user_record(&self, user: &UserId) -> Result<UserRecord>;

    async fn get_group_members(&self, group: &GroupId) -> Result<Vec<UserId>>;

    async fn get_reaction_snapshot(&self, channel: &ChannelId, ts: &MessageTs)
    -> Result<ReactionMap>;

    async fn add_reaction(&self, channel: &ChannelId, ts: &MessageTs, name: &str) -> Result<()>;

    async fn remove_reaction(&self, channel: &ChannelId, ts: &MessageTs, name: &str)
    -> Result<()>;

    /// Post `text` as a reply in the thread of `ts`, shown with the `icon` emoji
    async fn post_thread_reply(
        &self,
        channel: &ChannelId,
        ts: &MessageTs,
        icon: &str,
        text: &str,
    ) -> Result<MessageTs>;

    async fn list_channels(&self) -> Result<Vec<ChannelRecord>>;

    async fn list_users(&self) -> Result<Vec<UserRecord>>;
}
