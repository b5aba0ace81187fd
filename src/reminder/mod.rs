//! Reaction reconciliation
//!
//! Compares a message's audience against the users behind its reactions and posts
//! a threaded reminder naming whoever is missing. Both policies share one shape:
//! arm the status reaction, measure, compare, announce, disarm.

mod message;
mod order;
mod reconciler;
mod status;

pub use message::{any_reminder, fully_acknowledged, no_reactions, read_reminder};
pub use order::{candidate_reactions, missing_users, order_reactions};
pub use reconciler::{ReactionPolicy, ReactionReconciler, ReminderOutcome};
pub use status::{StatusPhase, StatusReaction};
