//! Per-session actors.
//!
//! Each session owns one [`EntityEngine`] and is driven by a single task, so
//! source events and fired deferred actions are applied one at a time and in
//! arrival order. Outbound packets go through a [`ChannelSink`] to a separate
//! writer task.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use dashmap::DashMap;
use gateway_engine::{DeferredAction, EngineConfig, EntityEngine, TeamDirectory, TokioScheduler};
use gateway_protocol::{ChannelSink, SourceEvent, TargetPacket};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Capacity of the source event queue of one session.
const EVENT_QUEUE: usize = 256;

/// Where a session is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Running,
    /// The feed ended; waiting for deferred actions to fire.
    Draining,
}

/// What one session produced.
#[derive(Debug, Default)]
pub struct SessionReport {
    pub events: usize,
    pub packets: BTreeMap<&'static str, usize>,
}

impl SessionReport {
    #[must_use]
    pub fn total_packets(&self) -> usize {
        self.packets.values().sum()
    }
}

/// Live sessions of the process, keyed by session ID.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<Uuid, SessionState>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn active(&self) -> usize {
        self.sessions.len()
    }

    /// Number of sessions whose feed has ended.
    #[must_use]
    pub fn draining(&self) -> usize {
        self.sessions
            .iter()
            .filter(|entry| *entry.value() == SessionState::Draining)
            .count()
    }

    fn set(&self, id: Uuid, state: SessionState) {
        self.sessions.insert(id, state);
    }

    fn remove(&self, id: Uuid) {
        self.sessions.remove(&id);
    }
}

/// Everything a session needs besides its feed.
#[derive(Clone)]
pub struct SessionSettings {
    pub config: EngineConfig,
    pub teams: Arc<dyn TeamDirectory>,
    /// Directory to write a MessagePack capture of the outbound stream into.
    pub capture_dir: Option<PathBuf>,
}

/// Run one session to completion: apply every event, let pending deferred
/// actions fire, then shut the engine down.
///
/// # Errors
///
/// Fails only if the packet capture could not be written.
pub async fn run_session(
    id: Uuid,
    events: Vec<SourceEvent>,
    settings: SessionSettings,
    registry: Arc<SessionRegistry>,
) -> Result<SessionReport> {
    let (sink, packets) = ChannelSink::new();
    let (scheduler, deferred) = TokioScheduler::channel(Handle::current());
    let scheduler = Arc::new(scheduler);
    let engine = EntityEngine::new(
        settings.config.clone(),
        Arc::new(sink),
        scheduler.clone(),
        settings.teams.clone(),
    );

    let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE);
    let feeder = tokio::spawn(crate::replay::feed_session(events, event_tx));
    let writer = tokio::spawn(write_packets(id, packets, settings.capture_dir.clone()));

    registry.set(id, SessionState::Running);
    let actor = SessionActor {
        id,
        engine,
        scheduler,
        events: event_rx,
        deferred,
        registry: registry.clone(),
        drain_timeout: settings.config.link_delay().max(settings.config.roster_removal_delay())
            + Duration::from_millis(100),
    };
    let events = actor.run().await;
    registry.remove(id);

    if let Err(err) = feeder.await {
        warn!(session = %id, %err, "feeder task failed");
    }
    // The engine, and with it the sink, is gone: the writer sees the end of
    // the stream.
    let mut report = writer.await.context("packet writer panicked")??;
    report.events = events;
    Ok(report)
}

struct SessionActor {
    id: Uuid,
    engine: EntityEngine,
    scheduler: Arc<TokioScheduler>,
    events: mpsc::Receiver<SourceEvent>,
    deferred: mpsc::UnboundedReceiver<DeferredAction>,
    registry: Arc<SessionRegistry>,
    drain_timeout: Duration,
}

impl SessionActor {
    /// Returns the number of source events applied.
    async fn run(mut self) -> usize {
        let mut applied = 0;
        loop {
            tokio::select! {
                biased;
                Some(action) = self.deferred.recv() => self.fire(action),
                event = self.events.recv() => match event {
                    Some(event) => {
                        self.engine.handle_event(event);
                        applied += 1;
                    }
                    None => break,
                },
            }
        }

        let id = self.id;
        let drain_timeout = self.drain_timeout;
        self.registry.set(id, SessionState::Draining);
        debug!(session = %id, pending = self.scheduler.pending(), "feed ended, draining");
        let drain = async {
            while self.scheduler.pending() > 0 {
                match self.deferred.recv().await {
                    Some(action) => self.fire(action),
                    None => break,
                }
            }
        };
        if tokio::time::timeout(drain_timeout, drain).await.is_err() {
            warn!(session = %id, pending = self.scheduler.pending(), "deferred actions still pending at shutdown");
        }
        // Fired between the last pending check and now.
        while let Ok(action) = self.deferred.try_recv() {
            self.fire(action);
        }

        self.engine.shutdown();
        applied
    }

    fn fire(&mut self, action: DeferredAction) {
        if let Err(err) = self.engine.run_deferred(action) {
            debug!(session = %self.id, %err, "deferred action dropped");
        }
    }
}

/// Drain the outbound stream of one session, counting packets by kind and
/// optionally capturing them.
async fn write_packets(
    id: Uuid,
    mut packets: mpsc::UnboundedReceiver<TargetPacket>,
    capture_dir: Option<PathBuf>,
) -> Result<SessionReport> {
    let mut report = SessionReport::default();
    let mut capture = Vec::new();
    while let Some(packet) = packets.recv().await {
        debug!(session = %id, packet = packet.name(), target_id = ?packet.target_id(), "outbound");
        *report.packets.entry(packet.name()).or_default() += 1;
        if capture_dir.is_some() {
            capture.extend(gateway_protocol::encode(&packet)?);
        }
    }

    if let Some(dir) = capture_dir {
        let path = dir.join(format!("{id}.msgpack"));
        tokio::fs::write(&path, &capture)
            .await
            .with_context(|| format!("writing capture {}", path.display()))?;
        info!(session = %id, path = %path.display(), bytes = capture.len(), "wrote capture");
    }
    Ok(report)
}
