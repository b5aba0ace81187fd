//! In-crate fakes for unit tests

use crate::error::{ReminderError, Result};
use crate::metadata::{ChannelRecord, Clock, UserRecord};
use crate::slack::{ChannelId, ChatGateway, GroupId, MessageTs, ReactionMap, SlackMessage, UserId};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

/// User id the fake reports for reactions added by the bot itself
pub const BOT_USER: &str = "UBOT";

/// Every gateway call the fake has served, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    GetMessage(String),
    ChannelMembers(String),
    UserRecord(String),
    GroupMembers(String),
    Snapshot,
    Add(String),
    Remove(String),
    Post { icon: String, text: String },
    ListChannels,
    ListUsers,
}

#[derive(Default)]
struct State {
    messages: HashMap<String, SlackMessage>,
    channels: BTreeMap<String, Vec<UserId>>,
    users: BTreeMap<String, UserRecord>,
    groups: HashMap<String, Vec<UserId>>,
    reactions: BTreeMap<String, BTreeSet<UserId>>,
    failing: HashSet<&'static str>,
    calls: Vec<Call>,
}

/// Recording chat gateway serving canned data
#[derive(Default)]
pub struct FakeGateway {
    state: Mutex<State>,
}

fn record(id: &str, is_bot: bool, is_deleted: bool) -> UserRecord {
    UserRecord {
        id: UserId::new(id),
        name: id.to_lowercase(),
        real_name: None,
        display_name: None,
        is_bot,
        is_deleted,
    }
}

fn ids(users: &[&str]) -> Vec<UserId> {
    users.iter().map(|u| UserId::new(*u)).collect()
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn edit(self, f: impl FnOnce(&mut State)) -> Self {
        f(&mut self.state.lock().unwrap());
        self
    }

    pub fn with_message(self, channel: &str, ts: &str, text: &str) -> Self {
        self.edit(|s| {
            s.messages.insert(
                ts.to_string(),
                SlackMessage {
                    channel: ChannelId::new(channel),
                    ts: MessageTs::new(ts),
                    user: Some(UserId::new("UAUTHOR")),
                    text: text.to_string(),
                },
            );
        })
    }

    pub fn with_channel(self, channel: &str, members: &[&str]) -> Self {
        self.edit(|s| {
            s.channels.insert(channel.to_string(), ids(members));
        })
    }

    pub fn with_user(self, id: &str) -> Self {
        self.edit(|s| {
            s.users.insert(id.to_string(), record(id, false, false));
        })
    }

    pub fn with_users(self, users: &[&str]) -> Self {
        users.iter().fold(self, |gw, id| gw.with_user(id))
    }

    pub fn with_bot(self, id: &str) -> Self {
        self.edit(|s| {
            s.users.insert(id.to_string(), record(id, true, false));
        })
    }

    pub fn with_deleted(self, id: &str) -> Self {
        self.edit(|s| {
            s.users.insert(id.to_string(), record(id, false, true));
        })
    }

    pub fn with_group(self, group: &str, members: &[&str]) -> Self {
        self.add_group(group, members);
        self
    }

    pub fn with_reaction(self, name: &str, users: &[&str]) -> Self {
        self.edit(|s| {
            s.reactions
                .entry(name.to_string())
                .or_default()
                .extend(ids(users));
        })
    }

    /// Make every call of the named operation fail
    pub fn failing(self, op: &'static str) -> Self {
        self.edit(|s| {
            s.failing.insert(op);
        })
    }

    pub fn add_group(&self, group: &str, members: &[&str]) {
        self.state
            .lock()
            .unwrap()
            .groups
            .insert(group.to_string(), ids(members));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.state.lock().unwrap().calls.iter().filter(|c| pred(c)).count()
    }

    /// Add/Remove calls only, in order
    pub fn reaction_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Add(_) | Call::Remove(_)))
            .collect()
    }

    pub fn posts(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Post { icon, text } => Some((icon, text)),
                _ => None,
            })
            .collect()
    }

    /// Reaction names currently on the message
    pub fn reactions_present(&self) -> Vec<String> {
        self.state.lock().unwrap().reactions.keys().cloned().collect()
    }

    fn begin(&self, call: Call, op: &'static str) -> Result<std::sync::MutexGuard<'_, State>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if state.failing.contains(op) {
            return Err(ReminderError::RemoteCallFailed(format!("{}: fake_failure", op)));
        }
        Ok(state)
    }
}

fn not_found(method: &str, error: &str) -> ReminderError {
    ReminderError::RemoteCallFailed(format!("{}: {}", method, error))
}

#[async_trait]
impl ChatGateway for FakeGateway {
    async fn get_message(&self, channel: &ChannelId, ts: &MessageTs) -> Result<SlackMessage> {
        let state = self.begin(Call::GetMessage(ts.to_string()), "get_message")?;
        state
            .messages
            .get(ts.as_str())
            .filter(|m| &m.channel == channel)
            .cloned()
            .ok_or_else(|| ReminderError::MessageNotFound {
                channel: channel.to_string(),
                ts: ts.to_string(),
            })
    }

    async fn get_channel_members(&self, channel: &ChannelId) -> Result<Vec<UserId>> {
        let state = self.begin(Call::ChannelMembers(channel.to_string()), "channel_members")?;
        state
            .channels
            .get(channel.as_str())
            .cloned()
            .ok_or_else(|| not_found("conversations.members", "channel_not_found"))
    }

    async fn get_user_record(&self, user: &UserId) -> Result<UserRecord> {
        let state = self.begin(Call::UserRecord(user.to_string()), "user_record")?;
        state
            .users
            .get(user.as_str())
            .cloned()
            .ok_or_else(|| not_found("users.info", "user_not_found"))
    }

    async fn get_group_members(&self, group: &GroupId) -> Result<Vec<UserId>> {
        let state = self.begin(Call::GroupMembers(group.to_string()), "group_members")?;
        state
            .groups
            .get(group.as_str())
            .cloned()
            .ok_or_else(|| not_found("usergroups.users.list", "no_such_subteam"))
    }

    async fn get_reaction_snapshot(
        &self,
        _channel: &ChannelId,
        _ts: &MessageTs,
    ) -> Result<ReactionMap> {
        let state = self.begin(Call::Snapshot, "snapshot")?;
        let mut map = ReactionMap::new();
        for (name, users) in &state.reactions {
            map.insert(name.clone(), users.iter().cloned());
        }
        Ok(map)
    }

    async fn add_reaction(&self, _channel: &ChannelId, _ts: &MessageTs, name: &str) -> Result<()> {
        let mut state = self.begin(Call::Add(name.to_string()), "add")?;
        state
            .reactions
            .entry(name.to_string())
            .or_default()
            .insert(UserId::new(BOT_USER));
        Ok(())
    }

    async fn remove_reaction(
        &self,
        _channel: &ChannelId,
        _ts: &MessageTs,
        name: &str,
    ) -> Result<()> {
        let mut state = self.begin(Call::Remove(name.to_string()), "remove")?;
        let bot = UserId::new(BOT_USER);
        let removed = state
            .reactions
            .get_mut(name)
            .map(|users| users.remove(&bot))
            .unwrap_or(false);
        if !removed {
            return Err(not_found("reactions.remove", "no_reaction"));
        }
        if state.reactions.get(name).is_some_and(BTreeSet::is_empty) {
            state.reactions.remove(name);
        }
        Ok(())
    }

    async fn post_thread_reply(
        &self,
        _channel: &ChannelId,
        _ts: &MessageTs,
        icon: &str,
        text: &str,
    ) -> Result<MessageTs> {
        let call = Call::Post {
            icon: icon.to_string(),
            text: text.to_string(),
        };
        let state = self.begin(call, "post")?;
        Ok(MessageTs::new(format!("1700000000.{:06}", state.calls.len())))
    }

    async fn list_channels(&self) -> Result<Vec<ChannelRecord>> {
        let state = self.begin(Call::ListChannels, "list_channels")?;
        Ok(state
            .channels
            .keys()
            .map(|id| ChannelRecord {
                id: ChannelId::new(id.clone()),
                name: id.to_lowercase(),
                is_private: false,
                is_member: true,
            })
            .collect())
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>> {
        let state = self.begin(Call::ListUsers, "list_users")?;
        Ok(state.users.values().cloned().collect())
    }
}

/// Clock under test control
pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
        Self(AtomicI64::new(now_ms))
    }

    pub fn advance(&self, ms: i64) {
        self.0.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}
