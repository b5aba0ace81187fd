use anyhow::Context;
use clap::{Parser, Subcommand};
use reaction_reminder::config::{Settings, load_cache_config, load_settings};
use reaction_reminder::membership::MembershipResolver;
use reaction_reminder::mentions::MentionResolver;
use reaction_reminder::metadata::{
    CacheStatus, CacheStore, Clock, InMemoryStore, JsonFileStore, MetadataCache, SystemClock,
};
use reaction_reminder::reminder::{ReactionPolicy, ReactionReconciler};
use reaction_reminder::slack::{ChannelId, ChatGateway, MessageTs, SlackClient};
use serde::Serialize;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "reaction-reminder",
    version,
    about = "Remind mentioned Slack users who have not reacted to a message"
)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Remind users who have not added the acknowledgement reaction
    Read {
        /// Channel ID (e.g. C0123ABCD)
        channel: String,
        /// Message timestamp (e.g. 1700000000.000100)
        ts: String,
    },
    /// Remind users who have not added any of the reactions on the message
    Any {
        channel: String,
        ts: String,
    },
    /// Show entry counts of the cache file (requires CACHE_PATH)
    CacheStatus,
    /// Remove every entry from the cache file (requires CACHE_PATH)
    ClearCache,
    /// List channels visible to the bot
    Channels,
    /// List workspace users and prime the per-user cache
    Users,
}

enum Job {
    Remind(ReactionPolicy, String, String),
    Channels,
    Users,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("reaction_reminder=info"));

    // Logs go to stderr so stdout stays machine readable
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_line_number(true)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn open_store(settings: &Settings) -> anyhow::Result<Arc<dyn CacheStore>> {
    match &settings.cache.store_path {
        Some(path) => {
            let store = JsonFileStore::open(path)
                .with_context(|| format!("Failed to open cache file {}", path.display()))?;
            tracing::info!(path = %path.display(), "Using file-backed metadata cache");
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(InMemoryStore::new())),
    }
}

/// Cache maintenance works on the file store alone, without Slack credentials
fn run_cache_command(clear: bool) -> anyhow::Result<()> {
    let config = load_cache_config().context("Failed to load cache configuration")?;
    let path = config
        .store_path
        .context("CACHE_PATH must be set for cache-status and clear-cache")?;
    let store = JsonFileStore::open(&path)
        .with_context(|| format!("Failed to open cache file {}", path.display()))?;

    if clear {
        tracing::info!(path = %path.display(), "Clearing metadata cache");
        store.clear()?;
    }

    let now = SystemClock.now_ms();
    let status = CacheStatus::from_write_times(&store.write_times(), now, config.ttl);
    tracing::info!("{}", status.summary());
    print_json(&status)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    // Only the Slack-facing commands need a token and client
    let job = match cli.command {
        Commands::CacheStatus => return run_cache_command(false),
        Commands::ClearCache => return run_cache_command(true),
        Commands::Read { channel, ts } => Job::Remind(ReactionPolicy::ReadReceipt, channel, ts),
        Commands::Any { channel, ts } => Job::Remind(ReactionPolicy::AnyOf, channel, ts),
        Commands::Channels => Job::Channels,
        Commands::Users => Job::Users,
    };

    let settings = Arc::new(load_settings().context("Failed to load configuration")?);
    tracing::debug!(
        locale = ?settings.reminder.locale,
        ignored_users = settings.reminder.ignore_users.len(),
        ttl_secs = settings.cache.ttl.as_secs(),
        "Configuration loaded"
    );

    let gateway: Arc<dyn ChatGateway> = Arc::new(
        SlackClient::new(&settings.slack, settings.reminder.username.clone())
            .context("Failed to create Slack client")?,
    );
    let cache = Arc::new(MetadataCache::with_ttl(
        gateway.clone(),
        open_store(&settings)?,
        settings.cache.ttl,
    ));

    match job {
        Job::Remind(policy, channel, ts) => {
            let reconciler = build_reconciler(&settings, gateway, cache.clone());
            let outcome = reconciler
                .process(policy, &ChannelId::new(channel), &MessageTs::new(ts))
                .await?;
            print_json(&outcome)?;
        }
        Job::Channels => {
            print_json(&cache.channels().await?)?;
        }
        Job::Users => {
            print_json(&cache.users().await?)?;
        }
    }

    cache.log_stats().await;
    Ok(())
}

fn build_reconciler(
    settings: &Settings,
    gateway: Arc<dyn ChatGateway>,
    cache: Arc<MetadataCache>,
) -> ReactionReconciler {
    let membership = Arc::new(MembershipResolver::new(
        cache,
        settings.reminder.ignore_users.clone(),
    ));
    let mentions = MentionResolver::new(gateway.clone(), membership);
    ReactionReconciler::new(gateway, mentions, settings)
}
