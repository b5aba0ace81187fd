use crate::config::SlackConfig;
use crate::error::{ReminderError, Result};
use crate::metadata::{ChannelRecord, UserRecord};
use crate::slack::{
    ChannelId, ChatGateway, GroupId, MessageTs, ReactionMap, SlackMessage, UserId,
};
use async_trait::async_trait;
use slack_morphism::prelude::*;
use std::future::Future;
use std::sync::Arc;

/// Upper bound on cursor pages followed for one listing
const MAX_PAGES: usize = 100;
const PAGE_LIMIT: u16 = 200;

pub struct SlackClient {
    client: Arc<SlackHyperClient>,
    token: SlackApiToken,
    /// Username shown on thread replies
    username: String,
}

impl SlackClient {
    pub fn new(config: &SlackConfig, username: impl Into<String>) -> Result<Self> {
        if config.bot_token.trim().is_empty() {
            return Err(ReminderError::ConfigMissing(
                "Slack bot token is empty".to_string(),
            ));
        }

        let connector = SlackClientHyperConnector::new()
            .map_err(|e| ReminderError::RemoteCallFailed(e.to_string()))?
            .with_slack_api_url(config.api_base_url.trim_end_matches('/'));

        let client = Arc::new(slack_morphism::SlackClient::new(connector));
        let token = SlackApiToken::new(config.bot_token.clone().into());

        Ok(Self {
            client,
            token,
            username: username.into(),
        })
    }

    fn slack_channel(channel: &ChannelId) -> SlackChannelId {
        SlackChannelId(channel.as_str().to_string())
    }

    fn slack_ts(ts: &MessageTs) -> SlackTs {
        SlackTs(ts.as_str().to_string())
    }
}

fn api_error(method: &str, e: impl std::fmt::Display) -> ReminderError {
    ReminderError::RemoteCallFailed(format!("{}: {}", method, e))
}

fn user_record(user: SlackUser) -> UserRecord {
    UserRecord {
        id: UserId::new(user.id.0),
        name: user.name.unwrap_or_default(),
        real_name: user.real_name,
        display_name: user.profile.and_then(|p| p.display_name),
        is_bot: user.flags.is_bot.unwrap_or(false),
        is_deleted: user.deleted.unwrap_or(false),
    }
}

fn next_cursor(meta: Option<SlackResponseMetadata>) -> Option<SlackCursorId> {
    meta.and_then(|m| m.next_cursor).filter(|c| !c.0.is_empty())
}

/// Follow `response_metadata.next_cursor` until Slack stops returning one
async fn collect_pages<T, F, Fut>(method: &str, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(Option<SlackCursorId>) -> Fut,
    Fut: Future<Output = Result<(Vec<T>, Option<SlackResponseMetadata>)>>,
{
    let mut items = Vec::new();
    let mut cursor = None;

    for page_num in 0..MAX_PAGES {
        let (page, meta) = fetch(cursor.take()).await?;
        items.extend(page);
        tracing::trace!(method = method, page = page_num, "Fetched page");

        match next_cursor(meta) {
            Some(next) => cursor = Some(next),
            None => return Ok(items),
        }
    }

    tracing::warn!(
        method = method,
        max_pages = MAX_PAGES,
        "Stopped following cursor after page limit"
    );
    Ok(items)
}

#[async_trait]
impl ChatGateway for SlackClient {
    async fn get_message(&self, channel: &ChannelId, ts: &MessageTs) -> Result<SlackMessage> {
        let session = self.client.open_session(&self.token);

        let request =
            SlackApiConversationsRepliesRequest::new(Self::slack_channel(channel), Self::slack_ts(ts));

        let response = session
            .conversations_replies(&request)
            .await
            .map_err(|e| api_error("conversations.replies", e))?;

        tracing::debug!(
            channel_id = %channel,
            ts = %ts,
            messages = response.messages.len(),
            "Fetched thread replies"
        );

        response
            .messages
            .into_iter()
            .find(|m| m.origin.ts.0 == ts.as_str())
            .map(|m| SlackMessage {
                channel: channel.clone(),
                ts: ts.clone(),
                user: m.sender.user.map(|u| UserId::new(u.0)),
                text: m.content.text.unwrap_or_default(),
            })
            .ok_or_else(|| ReminderError::MessageNotFound {
                channel: channel.to_string(),
                ts: ts.to_string(),
            })
    }

    async fn get_channel_members(&self, channel: &ChannelId) -> Result<Vec<UserId>> {
        let session = self.client.open_session(&self.token);
        let session = &session;
        let slack_channel = Self::slack_channel(channel);

        let members = collect_pages("conversations.members", |cursor| {
            let request = SlackApiConversationsMembersRequest::new()
                .with_channel(slack_channel.clone())
                .with_limit(PAGE_LIMIT)
                .opt_cursor(cursor);
            async move {
                let response = session
                    .conversations_members(&request)
                    .await
                    .map_err(|e| api_error("conversations.members", e))?;
                Ok((response.members, response.response_metadata))
            }
        })
        .await?;

        let members: Vec<UserId> = members.into_iter().map(|u| UserId::new(u.0)).collect();
        tracing::debug!(channel_id = %channel, members = members.len(), "Members fetched");
        Ok(members)
    }

    async fn get_user_record(&self, user: &UserId) -> Result<UserRecord> {
        let session = self.client.open_session(&self.token);

        let request = SlackApiUsersInfoRequest::new(SlackUserId(user.as_str().to_string()));

        let response = session
            .users_info(&request)
            .await
            .map_err(|e| api_error("users.info", e))?;

        Ok(user_record(response.user))
    }

    async fn get_group_members(&self, group: &GroupId) -> Result<Vec<UserId>> {
        let session = self.client.open_session(&self.token);

        let request =
            SlackApiUserGroupsUsersListRequest::new(SlackUserGroupId(group.as_str().to_string()));

        let response = session
            .usergroups_users_list(&request)
            .await
            .map_err(|e| api_error("usergroups.users.list", e))?;

        Ok(response
            .users
            .into_iter()
            .map(|u| UserId::new(u.0))
            .collect())
    }

    async fn get_reaction_snapshot(
        &self,
        channel: &ChannelId,
        ts: &MessageTs,
    ) -> Result<ReactionMap> {
        let session = self.client.open_session(&self.token);

        let request = SlackApiReactionsGetRequest::new()
            .with_channel(Self::slack_channel(channel))
            .with_timestamp(Self::slack_ts(ts))
            .with_full(true);

        let response = session
            .reactions_get(&request)
            .await
            .map_err(|e| api_error("reactions.get", e))?;

        match response {
            SlackApiReactionsGetResponse::Message(item) => Ok(item
                .message
                .content
                .reactions
                .unwrap_or_default()
                .into_iter()
                .map(|r| {
                    let users: Vec<UserId> =
                        r.users.into_iter().map(|u| UserId::new(u.0)).collect();
                    (r.name.0, users)
                })
                .collect()),
            SlackApiReactionsGetResponse::File(_) => Err(ReminderError::MessageNotFound {
                channel: channel.to_string(),
                ts: ts.to_string(),
            }),
        }
    }

    async fn add_reaction(&self, channel: &ChannelId, ts: &MessageTs, name: &str) -> Result<()> {
        let session = self.client.open_session(&self.token);

        let request = SlackApiReactionsAddRequest::new(
            Self::slack_channel(channel),
            SlackReactionName(name.to_string()),
            Self::slack_ts(ts),
        );

        session
            .reactions_add(&request)
            .await
            .map_err(|e| api_error("reactions.add", e))?;

        Ok(())
    }

    async fn remove_reaction(
        &self,
        channel: &ChannelId,
        ts: &MessageTs,
        name: &str,
    ) -> Result<()> {
        let session = self.client.open_session(&self.token);

        let request = SlackApiReactionsRemoveRequest::new(SlackReactionName(name.to_string()))
            .with_channel(Self::slack_channel(channel))
            .with_timestamp(Self::slack_ts(ts));

        session
            .reactions_remove(&request)
            .await
            .map_err(|e| api_error("reactions.remove", e))?;

        Ok(())
    }

    async fn post_thread_reply(
        &self,
        channel: &ChannelId,
        ts: &MessageTs,
        icon: &str,
        text: &str,
    ) -> Result<MessageTs> {
        let session = self.client.open_session(&self.token);

        let mut request = SlackApiChatPostMessageRequest::new(
            Self::slack_channel(channel),
            SlackMessageContent::new().with_text(text.into()),
        );
        request.thread_ts = Some(Self::slack_ts(ts));
        request.username = Some(self.username.clone());
        request.icon_emoji = Some(format!(":{}:", icon));
        request.unfurl_links = Some(false);
        request.unfurl_media = Some(false);

        let response = session
            .chat_post_message(&request)
            .await
            .map_err(|e| api_error("chat.postMessage", e))?;

        Ok(MessageTs::new(response.ts.to_string()))
    }

    async fn list_channels(&self) -> Result<Vec<ChannelRecord>> {
        tracing::debug!("Fetching channel list from Slack API");
        let session = self.client.open_session(&self.token);
        let session = &session;

        let channels = collect_pages("conversations.list", |cursor| {
            let request = SlackApiConversationsListRequest::new()
                .with_types(vec![
                    SlackConversationType::Public,
                    SlackConversationType::Private,
                ])
                .with_limit(PAGE_LIMIT)
                .opt_cursor(cursor);
            async move {
                let response = session
                    .conversations_list(&request)
                    .await
                    .map_err(|e| api_error("conversations.list", e))?;
                Ok((response.channels, response.response_metadata))
            }
        })
        .await?;

        let channels: Vec<ChannelRecord> = channels
            .into_iter()
            .map(|c| ChannelRecord {
                id: ChannelId::new(c.id.to_string()),
                name: c.name.unwrap_or_else(|| c.id.to_string()),
                is_private: c.flags.is_private.unwrap_or(false),
                is_member: c.flags.is_member.unwrap_or(false),
            })
            .collect();

        tracing::info!(channels = channels.len(), "Fetched channel list");
        Ok(channels)
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>> {
        let session = self.client.open_session(&self.token);
        let session = &session;

        let users = collect_pages("users.list", |cursor| {
            let request = SlackApiUsersListRequest::new()
                .with_limit(PAGE_LIMIT)
                .opt_cursor(cursor);
            async move {
                let response = session
                    .users_list(&request)
                    .await
                    .map_err(|e| api_error("users.list", e))?;
                Ok((response.members, response.response_metadata))
            }
        })
        .await?;

        tracing::info!(users = users.len(), "Fetched user list");
        Ok(users.into_iter().map(user_record).collect())
    }
}
