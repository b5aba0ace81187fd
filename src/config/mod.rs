mod settings;

pub use settings::{
    CacheConfig, IgnoreList, Locale, ReactionConfig, ReminderConfig, Settings, SlackConfig,
    load_cache_config, load_settings,
};
