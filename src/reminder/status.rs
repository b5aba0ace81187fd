//! Status reaction lifecycle on the message being checked
//!
//! `Idle -> Armed -> Measured -> Announced -> Idle`. Leaving any phase other than
//! `Idle` goes through [`StatusReaction::disarm`], which removes the reaction.

use crate::logging::log_tolerated;
use crate::slack::{ChannelId, ChatGateway, MessageTs};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusPhase {
    Idle,
    /// Status reaction applied
    Armed,
    /// Audience and reactions fetched
    Measured,
    /// Reminder posted
    Announced,
}

pub struct StatusReaction {
    gateway: Arc<dyn ChatGateway>,
    channel: ChannelId,
    ts: MessageTs,
    name: String,
    phase: StatusPhase,
}

impl StatusReaction {
    /// Apply the status reaction; a failed add is logged and the guard is still armed
    pub async fn arm(
        gateway: Arc<dyn ChatGateway>,
        channel: &ChannelId,
        ts: &MessageTs,
        name: &str,
    ) -> Self {
        if let Err(e) = gateway.add_reaction(channel, ts, name).await {
            log_tolerated("arm_status_reaction", &e);
        } else {
            tracing::debug!(channel_id = %channel, ts = %ts, reaction = name, "Status reaction armed");
        }

        Self {
            gateway,
            channel: channel.clone(),
            ts: ts.clone(),
            name: name.to_string(),
            phase: StatusPhase::Armed,
        }
    }

    pub fn phase(&self) -> StatusPhase {
        self.phase
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn measured(&mut self) {
        self.advance(StatusPhase::Measured);
    }

    pub fn announced(&mut self) {
        self.advance(StatusPhase::Announced);
    }

    fn advance(&mut self, next: StatusPhase) {
        tracing::trace!(from = ?self.phase, to = ?next, reaction = %self.name, "Status phase");
        self.phase = next;
    }

    /// Remove the status reaction and return to `Idle`
    ///
    /// Returns whether the remove call succeeded. A failure is logged, never retried.
    pub async fn disarm(mut self) -> bool {
        let from = self.phase;
        self.phase = StatusPhase::Idle;

        match self
            .gateway
            .remove_reaction(&self.channel, &self.ts, &self.name)
            .await
        {
            Ok(()) => {
                tracing::debug!(reaction = %self.name, from = ?from, "Status reaction cleared");
                true
            }
            Err(e) => {
                log_tolerated("disarm_status_reaction", &e);
                false
            }
        }
    }
}

impl Drop for StatusReaction {
    fn drop(&mut self) {
        if self.phase != StatusPhase::Idle {
            tracing::warn!(
                channel_id = %self.channel,
                ts = %self.ts,
                reaction = %self.name,
                phase = ?self.phase,
                "Status reaction dropped without disarm"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Call, FakeGateway};

    fn target() -> (ChannelId, MessageTs) {
        (ChannelId::new("C1"), MessageTs::new("1.0"))
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let gateway = Arc::new(FakeGateway::new());
        let (channel, ts) = target();

        let mut status = StatusReaction::arm(gateway.clone(), &channel, &ts, "check_eyes").await;
        assert_eq!(status.phase(), StatusPhase::Armed);
        assert_eq!(gateway.reactions_present(), vec!["check_eyes"]);

        status.measured();
        status.announced();
        assert_eq!(status.phase(), StatusPhase::Announced);

        assert!(status.disarm().await);
        assert!(gateway.reactions_present().is_empty());
        assert_eq!(
            gateway.reaction_calls(),
            vec![
                Call::Add("check_eyes".to_string()),
                Call::Remove("check_eyes".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_disarm_from_armed() {
        let gateway = Arc::new(FakeGateway::new());
        let (channel, ts) = target();

        let status = StatusReaction::arm(gateway.clone(), &channel, &ts, "check_any").await;
        assert!(status.disarm().await);
        assert!(gateway.reactions_present().is_empty());
    }

    #[tokio::test]
    async fn test_failed_arm_still_attempts_disarm() {
        let gateway = Arc::new(FakeGateway::new().failing("add"));
        let (channel, ts) = target();

        let status = StatusReaction::arm(gateway.clone(), &channel, &ts, "check_eyes").await;
        assert_eq!(status.phase(), StatusPhase::Armed);
        assert!(!status.disarm().await);
        assert_eq!(gateway.count(|c| matches!(c, Call::Remove(_))), 1);
    }

    #[tokio::test]
    async fn test_failed_disarm_is_reported() {
        let gateway = Arc::new(FakeGateway::new().failing("remove"));
        let (channel, ts) = target();

        let status = StatusReaction::arm(gateway.clone(), &channel, &ts, "check_eyes").await;
        assert!(!status.disarm().await);
        assert_eq!(gateway.reactions_present(), vec!["check_eyes"]);
    }
}
