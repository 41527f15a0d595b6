//! `huginn` — operator CLI for the shared model cache.
//!
//! Talks to the Redis shared tier and change channel directly, using the same
//! record shape and envelope the library reads.
//!
//! Build: `cargo build --bin huginn --features cli`

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::{fs, process};

use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use huginn::cache::{CacheCoordinator, LocalCache, RedisSharedCache};
use huginn::config::Config;
use huginn::feed::{self, ChangeAction, ChangeEvent, ChangeFeedSubscriber};
use huginn::types::ModelRecord;
use huginn::{HuginnError, LocalCacheConfig, Result};

// ── CLI ─────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "huginn", about = "inspect and maintain the shared model cache")]
#[command(version = huginn::PKG_VERSION)]
struct Args {
    /// path to config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// print a cached model as JSON
    Get {
        /// model id
        id: String,
    },
    /// remove a model from the shared cache
    Evict {
        /// model id
        id: String,
    },
    /// apply change events to the shared cache until interrupted
    Watch,
    /// publish a change event built from a JSON model record
    Publish {
        action: Action,
        /// file holding the model record
        file: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Action {
    Update,
    Status,
    Delete,
}

impl From<Action> for ChangeAction {
    fn from(action: Action) -> Self {
        match action {
            Action::Update => ChangeAction::Update,
            Action::Status => ChangeAction::Status,
            Action::Delete => ChangeAction::Delete,
        }
    }
}

// ── commands ────────────────────────────────────────────────────────

fn coordinator(config: &Config, shared: &RedisSharedCache) -> CacheCoordinator {
    CacheCoordinator::new(
        LocalCache::with_config(&LocalCacheConfig::from(&config.cache)),
        Arc::new(shared.clone()),
        config.redis.namespace.clone(),
    )
}

async fn get(config: &Config, shared: &RedisSharedCache, id: &str) -> Result<()> {
    let model = coordinator(config, shared).get_one(id).await?;
    println!("{}", serde_json::to_string_pretty(&model)?);
    Ok(())
}

async fn evict(config: &Config, shared: &RedisSharedCache, id: &str) -> Result<()> {
    coordinator(config, shared).remove_one(id).await?;
    println!("evicted '{id}'.");
    Ok(())
}

async fn watch(config: &Config, shared: &RedisSharedCache) -> Result<()> {
    shared.ping().await?;
    let channel = &config.redis.change_channel;
    let stream = feed::redis::subscribe(shared.client(), channel).await?;
    let subscriber = ChangeFeedSubscriber::new(Arc::new(coordinator(config, shared)));

    info!(channel = %channel, namespace = %config.redis.namespace, "watching model changes");
    tokio::select! {
        _ = subscriber.run(stream) => {}
        _ = tokio::signal::ctrl_c() => info!("interrupted"),
    }
    Ok(())
}

async fn publish(
    config: &Config,
    shared: &RedisSharedCache,
    action: Action,
    file: &Path,
) -> Result<()> {
    let content = fs::read_to_string(file).map_err(|e| {
        HuginnError::Configuration(format!("Failed to read record file {file:?}: {e}"))
    })?;
    let record: ModelRecord = serde_json::from_str(&content)?;

    let event = match action {
        Action::Delete => ChangeEvent {
            action: action.into(),
            old_data: Some(record),
            new_data: None,
        },
        Action::Update | Action::Status => ChangeEvent {
            action: action.into(),
            old_data: None,
            new_data: Some(record),
        },
    };
    let receivers =
        feed::redis::publish(shared.client(), &config.redis.change_channel, &event).await?;
    println!("published {} event to {receivers} subscriber(s).", event.action);
    Ok(())
}

// ── main ────────────────────────────────────────────────────────────

async fn run(args: Args) -> Result<()> {
    let config = Config::load(args.config.as_deref())?;
    let shared = RedisSharedCache::new(&config.redis.url)?;

    match args.command {
        Command::Get { ref id } => get(&config, &shared, id).await,
        Command::Evict { ref id } => evict(&config, &shared, id).await,
        Command::Watch => watch(&config, &shared).await,
        Command::Publish { action, ref file } => publish(&config, &shared, action, file).await,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run(Args::parse()).await {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
