use crate::error::{ReminderError, Result};
use crate::slack::UserId;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

static BOT_TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^xoxb-[0-9]+-[0-9]+-[a-zA-Z0-9]+$").expect("bot token pattern is valid")
});

#[derive(Debug, Clone)]
pub struct Settings {
    pub slack: SlackConfig,
    pub reactions: ReactionConfig,
    pub reminder: ReminderConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone)]
pub struct SlackConfig {
    pub bot_token: String,
    pub api_base_url: String,
}

/// Reaction names the bot treats specially
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionConfig {
    /// Reaction that marks a user as having read the message
    pub acknowledgement: String,
    /// Status reaction shown while a read-receipt check runs
    pub read_check: String,
    /// Status reaction shown while an any-reaction check runs
    pub any_check: String,
}

impl Default for ReactionConfig {
    fn default() -> Self {
        Self {
            acknowledgement: "eyes".to_string(),
            read_check: "check_eyes".to_string(),
            any_check: "check_any".to_string(),
        }
    }
}

impl ReactionConfig {
    /// Names that never count as an acknowledgement candidate
    pub fn reserved(&self) -> [&str; 3] {
        [
            self.acknowledgement.as_str(),
            self.any_check.as_str(),
            self.read_check.as_str(),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct ReminderConfig {
    /// Username shown on posted thread replies
    pub username: String,
    pub locale: Locale,
    pub ignore_users: IgnoreList,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub ttl: Duration,
    /// When set, cache entries are persisted to this JSON file
    pub store_path: Option<PathBuf>,
}

/// Language of the posted reminder text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Locale {
    #[default]
    En,
    Ja,
}

impl FromStr for Locale {
    type Err = ReminderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Locale::En),
            "ja" => Ok(Locale::Ja),
            other => Err(ReminderError::Config(format!(
                "Invalid REMINDER_LOCALE '{}', expected 'en' or 'ja'",
                other
            ))),
        }
    }
}

/// Users administratively excluded from every audience
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreList(BTreeSet<UserId>);

impl IgnoreList {
    /// Parse a comma-separated list, trimming entries and dropping empty ones
    pub fn parse(raw: &str) -> Self {
        Self(
            raw.split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(UserId::new)
                .collect(),
        )
    }

    pub fn contains(&self, user: &UserId) -> bool {
        self.0.contains(user)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<UserId> for IgnoreList {
    fn from_iter<I: IntoIterator<Item = UserId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Settings {
    /// Build settings from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bot_token = lookup("SLACK_BOT_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ReminderError::ConfigMissing("SLACK_BOT_TOKEN not set".to_string()))?;
        if !BOT_TOKEN_PATTERN.is_match(bot_token.trim()) {
            return Err(ReminderError::Config(
                "SLACK_BOT_TOKEN does not look like a bot token (xoxb-...)".to_string(),
            ));
        }

        let slack = SlackConfig {
            bot_token: bot_token.trim().to_string(),
            api_base_url: lookup("SLACK_API_BASE_URL")
                .unwrap_or_else(|| "https://slack.com/api".to_string())
                .trim_end_matches('/')
                .to_string(),
        };

        let defaults = ReactionConfig::default();
        let reactions = ReactionConfig {
            acknowledgement: reaction_name(lookup("REACTION_ACK"), defaults.acknowledgement),
            read_check: reaction_name(lookup("REACTION_READ_CHECK"), defaults.read_check),
            any_check: reaction_name(lookup("REACTION_ANY_CHECK"), defaults.any_check),
        };

        let reminder = ReminderConfig {
            username: lookup("REMINDER_USERNAME")
                .unwrap_or_else(|| "Reaction Reminder".to_string()),
            locale: lookup("REMINDER_LOCALE")
                .map(|l| l.parse::<Locale>())
                .transpose()?
                .unwrap_or_default(),
            ignore_users: lookup("SLACK_IGNORE_USERS")
                .map(|raw| IgnoreList::parse(&raw))
                .unwrap_or_default(),
        };

        let cache = CacheConfig::from_lookup(&lookup)?;

        Ok(Settings {
            slack,
            reactions,
            reminder,
            cache,
        })
    }
}

impl CacheConfig {
    /// Cache settings alone; needs no Slack credentials
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let ttl_minutes: u64 = lookup("CACHE_TTL_MINUTES")
            .unwrap_or_else(|| "15".to_string())
            .trim()
            .parse()
            .map_err(|_| ReminderError::Config("Invalid CACHE_TTL_MINUTES".to_string()))?;
        if ttl_minutes == 0 {
            return Err(ReminderError::Config(
                "CACHE_TTL_MINUTES must be greater than zero".to_string(),
            ));
        }

        Ok(CacheConfig {
            ttl: Duration::from_secs(ttl_minutes * 60),
            store_path: lookup("CACHE_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
        })
    }
}

/// Accepts `eyes` as well as `:eyes:`
fn reaction_name(value: Option<String>, default: String) -> String {
    value
        .map(|v| v.trim().trim_matches(':').to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
}

pub fn load_settings() -> Result<Settings> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    Settings::from_lookup(|key| std::env::var(key).ok())
}

pub fn load_cache_config() -> Result<CacheConfig> {
    dotenvy::dotenv().ok();

    CacheConfig::from_lookup(|key| std::env::var(key).ok())
}
