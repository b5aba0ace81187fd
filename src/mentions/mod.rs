//! Mention parsing
//!
//! Scanning (`tokenizer`) is kept apart from resolution (`resolver`): the scan yields
//! typed tokens per zone, resolution turns them into users via the membership resolver.

mod resolver;
mod tokenizer;

pub use resolver::{Audience, MentionResolver};
pub use tokenizer::{MentionToken, MentionTokens, Zones, mention_tokens, split_zones};
