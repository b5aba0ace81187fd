//! Finite scan over Slack mention markup
//!
//! Recognized forms: `<@USER>`, `<!subteam^GROUP>`, `<!channel>`, each optionally
//! carrying a `|label` suffix as Slack renders them in some payloads.

use crate::slack::{GroupId, UserId};

const ZONE_SEPARATOR: &[u8] = b"cc";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MentionToken {
    Direct(UserId),
    Group(GroupId),
    /// Notify everyone in the channel
    Broadcast,
}

/// Text before and after the first whole-word `cc`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Zones<'a> {
    pub to: &'a str,
    pub cc: &'a str,
    /// Whether a separator was found; `cc` may still be empty when it ends the text
    pub separated: bool,
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Split on the first case-insensitive whole-word `cc`
///
/// Word boundaries are ASCII: `cc` inside `accelerate` or `<@UCC1>` is not a
/// separator, `cc:` and `ccさん` are.
pub fn split_zones(text: &str) -> Zones<'_> {
    let bytes = text.as_bytes();
    let n = ZONE_SEPARATOR.len();

    for start in 0..bytes.len().saturating_sub(n - 1) {
        let end = start + n;
        if !bytes[start..end].eq_ignore_ascii_case(ZONE_SEPARATOR) {
            continue;
        }
        let left_ok = start == 0 || !is_word_byte(bytes[start - 1]);
        let right_ok = end == bytes.len() || !is_word_byte(bytes[end]);
        if left_ok && right_ok {
            // Separator is ASCII, so both offsets are char boundaries
            return Zones {
                to: &text[..start],
                cc: &text[end..],
                separated: true,
            };
        }
    }

    Zones {
        to: text,
        cc: "",
        separated: false,
    }
}

/// Lazy sequence of mention tokens in order of appearance
pub struct MentionTokens<'a> {
    rest: &'a str,
}

pub fn mention_tokens(text: &str) -> MentionTokens<'_> {
    MentionTokens { rest: text }
}

fn is_id(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(is_word_byte)
}

/// Interpret the inside of one `<...>` pair
fn parse_markup(inner: &str) -> Option<MentionToken> {
    let target = inner.split_once('|').map_or(inner, |(target, _label)| target);

    if let Some(user) = target.strip_prefix('@') {
        return is_id(user).then(|| MentionToken::Direct(UserId::new(user)));
    }
    if let Some(group) = target.strip_prefix("!subteam^") {
        return is_id(group).then(|| MentionToken::Group(GroupId::new(group)));
    }
    (target == "!channel").then_some(MentionToken::Broadcast)
}

impl Iterator for MentionTokens<'_> {
    type Item = MentionToken;

    fn next(&mut self) -> Option<MentionToken> {
        loop {
            let open = self.rest.find('<')?;
            let after_open = &self.rest[open + 1..];

            let Some(close) = after_open.find(['<', '>']) else {
                self.rest = "";
                return None;
            };

            // A second `<` before any `>` means this one opened nothing
            if after_open.as_bytes()[close] == b'<' {
                self.rest = &after_open[close..];
                continue;
            }

            let inner = &after_open[..close];
            self.rest = &after_open[close + 1..];
            if let Some(token) = parse_markup(inner) {
                return Some(token);
            }
        }
    }
}
