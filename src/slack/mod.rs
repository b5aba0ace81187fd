mod client;
mod gateway;
mod types;

pub use client::SlackClient;
pub use gateway::ChatGateway;
pub use types::{ChannelId, GroupId, MessageTs, ReactionMap, SlackMessage, UserId};
