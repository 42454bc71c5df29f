//! # gateway_app: session driver
//!
//! Replays recorded source-protocol feeds through the entity translation
//! engine, one session per feed, and reports the translated target stream.
//!
//! ## Startup Sequence
//!
//! 1. Load the engine configuration and the team directory.
//! 2. Parse every feed file.
//! 3. Run one session actor per feed concurrently and log its report.

mod replay;
mod session;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use gateway_engine::{EngineConfig, StaticTeamDirectory};
use tokio::task::JoinSet;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use session::{SessionRegistry, SessionSettings};

#[derive(Parser)]
#[command(name = "gateway_app", about = "Replay source entity feeds through the translation engine")]
struct Args {
    /// JSON-lines source event feeds, one session each
    #[arg(required = true)]
    feeds: Vec<PathBuf>,

    /// Engine configuration (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Team directory (JSON list of teams)
    #[arg(short, long)]
    teams: Option<PathBuf>,

    /// Delay before shoulder entities are linked to their player
    #[arg(long, env = "GATEWAY_LINK_DELAY_MS")]
    link_delay_ms: Option<u64>,

    /// Directory to write MessagePack captures of the outbound streams into
    #[arg(long)]
    capture: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("gateway_app=info".parse()?))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => read_json::<EngineConfig>(path).await?,
        None => EngineConfig::default(),
    };
    if let Some(delay) = args.link_delay_ms {
        config = config.with_link_delay(Duration::from_millis(delay));
    }
    let teams = match &args.teams {
        Some(path) => read_json::<StaticTeamDirectory>(path).await?,
        None => StaticTeamDirectory::default(),
    };
    info!(
        link_delay_ms = config.link_delay_ms,
        teams = teams.len(),
        "gateway starting"
    );

    if let Some(dir) = &args.capture {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("creating capture directory {}", dir.display()))?;
    }

    let settings = SessionSettings {
        config,
        teams: Arc::new(teams),
        capture_dir: args.capture.clone(),
    };
    let registry = Arc::new(SessionRegistry::new());
    let mut sessions = JoinSet::new();

    for path in &args.feeds {
        let events = replay::read_feed(path).await?;
        let id = Uuid::new_v4();
        info!(session = %id, feed = %path.display(), events = events.len(), "starting session");
        let settings = settings.clone();
        let registry = registry.clone();
        let feed = path.clone();
        sessions.spawn(async move {
            let report = session::run_session(id, events, settings, registry).await;
            (id, feed, report)
        });
    }

    let mut failed = 0;
    while let Some(joined) = sessions.join_next().await {
        let (id, feed, report) = joined.context("session task panicked")?;
        match report {
            Ok(report) => info!(
                session = %id,
                feed = %feed.display(),
                events = report.events,
                packets = report.total_packets(),
                breakdown = ?report.packets,
                "session finished"
            ),
            Err(err) => {
                failed += 1;
                error!(session = %id, feed = %feed.display(), "session failed: {err:#}");
            }
        }
        info!(active = registry.active(), draining = registry.draining(), "sessions remaining");
    }

    info!(failed, "gateway shut down");
    Ok(())
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}
