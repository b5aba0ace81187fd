use crate::config::{Locale, ReactionConfig, Settings};
use crate::error::{ReminderError, Result};
use crate::logging::{Timer, log_error, log_tolerated};
use crate::mentions::{Audience, MentionResolver};
use crate::reminder::message::{any_reminder, no_reactions, read_reminder};
use crate::reminder::order::{candidate_reactions, missing_users};
use crate::reminder::status::StatusReaction;
use crate::slack::{ChannelId, ChatGateway, MessageTs, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::Instrument;

/// What counts as acknowledging a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionPolicy {
    /// The acknowledgement reaction only
    ReadReceipt,
    /// Any reaction already on the message, status reactions excluded
    AnyOf,
}

impl fmt::Display for ReactionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReactionPolicy::ReadReceipt => f.write_str("read"),
            ReactionPolicy::AnyOf => f.write_str("any"),
        }
    }
}

impl FromStr for ReactionPolicy {
    type Err = ReminderError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "read" | "read_receipt" => Ok(ReactionPolicy::ReadReceipt),
            "any" | "any_of" => Ok(ReactionPolicy::AnyOf),
            other => Err(ReminderError::Config(format!(
                "Unknown reaction policy '{}', expected 'read' or 'any'",
                other
            ))),
        }
    }
}

/// Result of one reconciliation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReminderOutcome {
    pub policy: ReactionPolicy,
    pub audience: Audience,
    /// Reactions accepted as acknowledgement, in prompt order
    pub candidate_reactions: Vec<String>,
    /// Every user seen on an accepted reaction
    pub acknowledged: Vec<UserId>,
    pub missing: Vec<UserId>,
    pub message: String,
    pub reply_ts: MessageTs,
    /// Whether the status reaction was removed at the end of the run
    pub status_cleared: bool,
}

/// Drives read-receipt and any-of reminder runs against one message at a time
pub struct ReactionReconciler {
    gateway: Arc<dyn ChatGateway>,
    mentions: MentionResolver,
    reactions: ReactionConfig,
    locale: Locale,
}

impl ReactionReconciler {
    pub fn new(gateway: Arc<dyn ChatGateway>, mentions: MentionResolver, settings: &Settings) -> Self {
        Self {
            gateway,
            mentions,
            reactions: settings.reactions.clone(),
            locale: settings.reminder.locale,
        }
    }

    pub async fn process(
        &self,
        policy: ReactionPolicy,
        channel: &ChannelId,
        ts: &MessageTs,
    ) -> Result<ReminderOutcome> {
        match policy {
            ReactionPolicy::ReadReceipt => self.process_reaction_read(channel, ts).await,
            ReactionPolicy::AnyOf => self.process_reaction_any(channel, ts).await,
        }
    }

    /// Remind everyone addressed who has not applied the acknowledgement reaction
    pub async fn process_reaction_read(
        &self,
        channel: &ChannelId,
        ts: &MessageTs,
    ) -> Result<ReminderOutcome> {
        let span = run_span(ReactionPolicy::ReadReceipt, channel, ts);

        async {
            let _timer = Timer::new("process_reaction_read");

            let mut status = StatusReaction::arm(
                self.gateway.clone(),
                channel,
                ts,
                &self.reactions.read_check,
            )
            .await;
            // Reset so the snapshot only holds acknowledgements made after this run
            self.best_effort_remove(channel, ts, &self.reactions.acknowledgement)
                .await;

            let result = self.read_pipeline(&mut status, channel, ts).await;
            let cleared = status.disarm().await;
            finish(result, cleared)
        }
        .instrument(span)
        .await
    }

    async fn read_pipeline(
        &self,
        status: &mut StatusReaction,
        channel: &ChannelId,
        ts: &MessageTs,
    ) -> Result<ReminderOutcome> {
        let audience = self.mentions.resolve_mentions(channel, ts).await?;
        let ack = &self.reactions.acknowledgement;

        // The bot's own acknowledgement reaction doubles as a readiness signal
        self.best_effort_add(channel, ts, ack).await;

        let snapshot = self.gateway.get_reaction_snapshot(channel, ts).await?;
        status.measured();

        let acknowledged = snapshot.users(ack);
        let missing = missing_users(&audience.all_users, &acknowledged);
        let message = read_reminder(self.locale, &missing, ack);

        let reply_ts = self
            .gateway
            .post_thread_reply(channel, ts, status.name(), &message)
            .await?;
        status.announced();

        tracing::info!(
            audience = audience.len(),
            missing = missing.len(),
            "Read receipt reminder posted"
        );

        Ok(ReminderOutcome {
            policy: ReactionPolicy::ReadReceipt,
            audience,
            candidate_reactions: vec![ack.clone()],
            acknowledged: acknowledged.into_iter().collect(),
            missing,
            message,
            reply_ts,
            status_cleared: false,
        })
    }

    /// Remind everyone addressed who has not applied any of the reactions on the message
    pub async fn process_reaction_any(
        &self,
        channel: &ChannelId,
        ts: &MessageTs,
    ) -> Result<ReminderOutcome> {
        let span = run_span(ReactionPolicy::AnyOf, channel, ts);

        async {
            let _timer = Timer::new("process_reaction_any");

            let mut status = StatusReaction::arm(
                self.gateway.clone(),
                channel,
                ts,
                &self.reactions.any_check,
            )
            .await;

            let result = self.any_pipeline(&mut status, channel, ts).await;
            let cleared = status.disarm().await;
            finish(result, cleared)
        }
        .instrument(span)
        .await
    }

    async fn any_pipeline(
        &self,
        status: &mut StatusReaction,
        channel: &ChannelId,
        ts: &MessageTs,
    ) -> Result<ReminderOutcome> {
        let audience = self.mentions.resolve_mentions(channel, ts).await?;

        let snapshot = self.gateway.get_reaction_snapshot(channel, ts).await?;
        status.measured();

        let candidates = candidate_reactions(&snapshot, &self.reactions);
        tracing::debug!(candidates = ?candidates, "Candidate reactions");

        let (acknowledged, missing, message) = if candidates.is_empty() {
            (
                BTreeSet::new(),
                audience.all_users.clone(),
                no_reactions(self.locale).to_string(),
            )
        } else {
            let mut acknowledged = BTreeSet::new();
            for name in &candidates {
                // Remove then add, so the bot's presence is re-asserted either way
                self.best_effort_remove(channel, ts, name).await;
                self.best_effort_add(channel, ts, name).await;
                acknowledged.extend(snapshot.users(name));
            }
            let missing = missing_users(&audience.all_users, &acknowledged);
            let message = any_reminder(self.locale, &missing, &candidates);
            (acknowledged, missing, message)
        };

        let reply_ts = self
            .gateway
            .post_thread_reply(channel, ts, status.name(), &message)
            .await?;
        status.announced();

        tracing::info!(
            audience = audience.len(),
            candidates = candidates.len(),
            missing = missing.len(),
            "Any-of reminder posted"
        );

        Ok(ReminderOutcome {
            policy: ReactionPolicy::AnyOf,
            audience,
            candidate_reactions: candidates,
            acknowledged: acknowledged.into_iter().collect(),
            missing,
            message,
            reply_ts,
            status_cleared: false,
        })
    }

    async fn best_effort_add(&self, channel: &ChannelId, ts: &MessageTs, name: &str) {
        if let Err(e) = self.gateway.add_reaction(channel, ts, name).await {
            log_tolerated("add_reaction", &e);
        }
    }

    async fn best_effort_remove(&self, channel: &ChannelId, ts: &MessageTs, name: &str) {
        if let Err(e) = self.gateway.remove_reaction(channel, ts, name).await {
            log_tolerated("remove_reaction", &e);
        }
    }
}

fn run_span(policy: ReactionPolicy, channel: &ChannelId, ts: &MessageTs) -> tracing::Span {
    tracing::info_span!(
        "reminder_run",
        run_id = %uuid::Uuid::new_v4(),
        policy = %policy,
        channel_id = %channel,
        ts = %ts,
    )
}

fn finish(result: Result<ReminderOutcome>, cleared: bool) -> Result<ReminderOutcome> {
    match result {
        Ok(mut outcome) => {
            outcome.status_cleared = cleared;
            Ok(outcome)
        }
        Err(e) => {
            log_error("reminder_run", &e);
            Err(e)
        }
    }
}
