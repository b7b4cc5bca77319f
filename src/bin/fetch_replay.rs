//! CLI tool for replaying media-server configuration fetches
//!
//! Reads JSON-line `FetchRequest`s, answers them with a handler backed by the
//! configured in-memory store, and prints one JSON-line `FetchReply` per
//! answered fetch on stdout. Console logs go to stderr, JSON logs to `log/`.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use config_fetch::logging::init_structured_logging;
use config_fetch::{
    ConfigFetchHandler, ConfigManager, FetchEventListener, FetchRequest, InMemoryConfigStore,
    MpscFetchChannel,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "fetch-replay")]
#[command(about = "Replay configuration fetch events against a seeded store")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay fetch events from a file or stdin
    Replay(ReplayArgs),
    /// Validate a configuration directory
    ValidateConfig(ValidateConfigArgs),
}

#[derive(Args)]
struct ReplayArgs {
    /// Directory containing fetch-config.yaml
    #[arg(short, long, default_value = "config")]
    config_dir: PathBuf,

    /// Environment section to apply (defaults to FETCH_ENV / APP_ENV)
    #[arg(short, long)]
    env: Option<String>,

    /// JSON-lines file of fetch requests; stdin when omitted
    #[arg(short, long)]
    input: Option<PathBuf>,
}

#[derive(Args)]
struct ValidateConfigArgs {
    /// Directory containing fetch-config.yaml
    config_dir: PathBuf,

    /// Environment section to apply
    #[arg(short, long)]
    env: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the JSON-line replies
    init_structured_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Replay(args) => replay(args).await,
        Commands::ValidateConfig(args) => validate_config(args),
    }
}

fn load_config(config_dir: PathBuf, env: Option<String>) -> Result<Arc<ConfigManager>> {
    let environment = env.unwrap_or_else(ConfigManager::detect_environment);
    ConfigManager::load_from_directory_with_env(Some(config_dir.clone()), &environment)
        .with_context(|| format!("loading configuration from {}", config_dir.display()))
}

async fn replay(args: ReplayArgs) -> Result<()> {
    let manager = load_config(args.config_dir, args.env)?;
    let config = manager.config();

    let store = InMemoryConfigStore::from_seed(config.store.seed_values()?);
    let (channel, mut replies) = MpscFetchChannel::new(config.handler.event_buffer_size);
    let handler = ConfigFetchHandler::from_config(config, Arc::new(store), Arc::new(channel));
    let (listener, sender) = FetchEventListener::new(handler, config.handler.event_buffer_size);
    let listener = listener.start();

    // Ends once the handler and every dispatched task have dropped their channel
    let printer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        let mut written = 0u64;
        while let Some(reply) = replies.recv().await {
            let mut line = serde_json::to_string(&reply)?;
            line.push('\n');
            stdout.write_all(line.as_bytes()).await?;
            written += 1;
        }
        stdout.flush().await?;
        Ok::<u64, anyhow::Error>(written)
    });

    let input: Box<dyn AsyncRead + Unpin + Send> = match args.input {
        Some(path) => Box::new(
            tokio::fs::File::open(&path)
                .await
                .with_context(|| format!("opening {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdin()),
    };

    let mut lines = BufReader::new(input).lines();
    let mut line_number = 0usize;
    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<FetchRequest>(&line) {
            Ok(request) => sender.send(request).await?,
            Err(e) => warn!(line = line_number, error = %e, "Skipping malformed fetch event"),
        }
    }
    drop(sender);

    let stats = listener.join().await?;
    let written = printer.await??;

    info!(
        events = stats.events_received,
        dispatched = stats.dispatched,
        replied_empty = stats.replied_empty,
        ignored = stats.ignored,
        replies = written,
        "Replay complete"
    );
    Ok(())
}

fn validate_config(args: ValidateConfigArgs) -> Result<()> {
    match load_config(args.config_dir, args.env) {
        Ok(manager) => {
            let config = manager.config();
            println!("Configuration is valid");
            println!("   Environment: {}", manager.environment());
            println!("   Event buffer: {}", config.handler.event_buffer_size);
            println!("   Default ACL list: {}", config.acl.default_list_name);
            println!("   Seeded keys: {}", config.store.seed.len());
            Ok(())
        }
        Err(e) => {
            eprintln!("Configuration validation failed: {e:#}");
            std::process::exit(1);
        }
    }
}
