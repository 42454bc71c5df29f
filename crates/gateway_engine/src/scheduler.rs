//! Deferred actions: the one place the engine acts later rather than now.
//!
//! A [`DeferredScheduler`] holds [`DeferredAction`]s keyed by [`TaskKey`] and
//! hands them back to the session once their delay has elapsed. The session
//! then applies them through
//! [`EntityEngine::run_deferred`](crate::EntityEngine::run_deferred), which
//! re-checks the state the action refers to. Scheduling the same key again
//! replaces the earlier action; cancelling a key drops it.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use gateway_entity::TargetId;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::trace;
use uuid::Uuid;

use crate::synthesizer::ShoulderSlot;

/// Identifies a scheduled action so it can be replaced or cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKey {
    /// Link emission for the shoulder decoration with this target ID.
    Link(TargetId),
    /// Roster withdrawal for the player with this target ID.
    RosterRemoval(TargetId),
}

/// Work the engine wants done after a delay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeferredAction {
    /// Link a shoulder decoration to its player.
    EmitLink {
        parent: TargetId,
        child: TargetId,
        slot: ShoulderSlot,
    },
    /// Take an unlisted player off the roster.
    RemoveFromRoster { target_id: TargetId, uuid: Uuid },
}

impl DeferredAction {
    /// The key this action is scheduled under.
    #[must_use]
    pub fn key(&self) -> TaskKey {
        match self {
            Self::EmitLink { child, .. } => TaskKey::Link(*child),
            Self::RemoveFromRoster { target_id, .. } => TaskKey::RosterRemoval(*target_id),
        }
    }
}

/// Session-aware timer facility.
pub trait DeferredScheduler: Send + Sync {
    /// Run `action` after `delay`, replacing anything already scheduled under
    /// the action's key.
    fn schedule(&self, delay: Duration, action: DeferredAction);

    /// Drop the action scheduled under `key`, if it has not fired yet.
    fn cancel(&self, key: TaskKey);

    /// Drop every pending action.
    fn cancel_all(&self);
}

/// Timer-backed scheduler. Each action sleeps on the tokio runtime and is
/// then delivered on a channel the session actor drains. Once the session
/// drops the receiver, late deliveries are discarded.
#[derive(Debug)]
pub struct TokioScheduler {
    runtime: Handle,
    tx: mpsc::UnboundedSender<DeferredAction>,
    tasks: Arc<DashMap<TaskKey, AbortHandle>>,
}

impl TokioScheduler {
    /// Create a scheduler and the receiver its actions are delivered on.
    #[must_use]
    pub fn channel(runtime: Handle) -> (Self, mpsc::UnboundedReceiver<DeferredAction>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            runtime,
            tx,
            tasks: Arc::new(DashMap::new()),
        };
        (scheduler, rx)
    }

    /// Number of actions still waiting for their delay.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }
}

impl DeferredScheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, action: DeferredAction) {
        let key = action.key();
        let tx = self.tx.clone();
        let tasks = Arc::clone(&self.tasks);

        // The entry guard is held until the handle is stored so the task
        // cannot remove its own key before it exists.
        let entry = self.tasks.entry(key);
        let handle = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let own_id = tokio::task::id();
            tasks.remove_if(&key, |_, handle| handle.id() == own_id);
            if tx.send(action).is_err() {
                trace!(?key, "session gone, dropping deferred action");
            }
        });
        match entry {
            Entry::Occupied(mut occupied) => {
                let previous = occupied.insert(handle.abort_handle());
                previous.abort();
            }
            Entry::Vacant(vacant) => {
                vacant.insert(handle.abort_handle());
            }
        }
    }

    fn cancel(&self, key: TaskKey) {
        if let Some((_, handle)) = self.tasks.remove(&key) {
            handle.abort();
        }
    }

    fn cancel_all(&self) {
        for entry in self.tasks.iter() {
            entry.value().abort();
        }
        self.tasks.clear();
    }
}

/// An action recorded by [`ManualScheduler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledAction {
    pub delay: Duration,
    pub action: DeferredAction,
}

/// Scheduler that only records. The caller decides when actions fire, which
/// makes replays and tests deterministic.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    pending: Mutex<Vec<ScheduledAction>>,
}

impl ManualScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything scheduled and not yet taken or cancelled, in schedule order.
    #[must_use]
    pub fn pending(&self) -> Vec<ScheduledAction> {
        self.lock().clone()
    }

    /// Remove and return every pending action, as if all delays had elapsed.
    pub fn take_all(&self) -> Vec<DeferredAction> {
        self.lock().drain(..).map(|scheduled| scheduled.action).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ScheduledAction>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DeferredScheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, action: DeferredAction) {
        let mut pending = self.lock();
        let key = action.key();
        pending.retain(|scheduled| scheduled.action.key() != key);
        pending.push(ScheduledAction { delay, action });
    }

    fn cancel(&self, key: TaskKey) {
        self.lock().retain(|scheduled| scheduled.action.key() != key);
    }

    fn cancel_all(&self) {
        self.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(child: u64) -> DeferredAction {
        DeferredAction::EmitLink {
            parent: TargetId(7),
            child: TargetId(child),
            slot: ShoulderSlot::Left,
        }
    }

    #[test]
    fn test_manual_schedule_replaces_same_key() {
        let scheduler = ManualScheduler::new();
        scheduler.schedule(Duration::from_millis(500), link(8));
        scheduler.schedule(Duration::from_millis(100), link(8));
        scheduler.schedule(Duration::from_millis(500), link(9));
        let pending = scheduler.pending();
        assert_eq!(
            pending,
            vec![
                ScheduledAction {
                    delay: Duration::from_millis(100),
                    action: link(8),
                },
                ScheduledAction {
                    delay: Duration::from_millis(500),
                    action: link(9),
                },
            ]
        );
    }

    #[test]
    fn test_manual_cancel() {
        let scheduler = ManualScheduler::new();
        scheduler.schedule(Duration::ZERO, link(8));
        scheduler.schedule(Duration::ZERO, link(9));
        scheduler.cancel(TaskKey::Link(TargetId(8)));
        assert_eq!(scheduler.take_all(), vec![link(9)]);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_action_keys() {
        assert_eq!(link(8).key(), TaskKey::Link(TargetId(8)));
        let removal = DeferredAction::RemoveFromRoster {
            target_id: TargetId(3),
            uuid: Uuid::nil(),
        };
        assert_eq!(removal.key(), TaskKey::RosterRemoval(TargetId(3)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_delivers_after_delay() {
        let (scheduler, mut rx) = TokioScheduler::channel(Handle::current());
        scheduler.schedule(Duration::from_millis(500), link(8));
        assert_eq!(scheduler.pending(), 1);
        let action = rx.recv().await.unwrap();
        assert_eq!(action, link(8));
        tokio::task::yield_now().await;
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_cancel() {
        let (scheduler, mut rx) = TokioScheduler::channel(Handle::current());
        scheduler.schedule(Duration::from_millis(500), link(8));
        scheduler.schedule(Duration::from_millis(600), link(9));
        scheduler.cancel(TaskKey::Link(TargetId(8)));
        assert_eq!(rx.recv().await.unwrap(), link(9));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_reschedule_replaces() {
        let (scheduler, mut rx) = TokioScheduler::channel(Handle::current());
        scheduler.schedule(Duration::from_millis(500), link(8));
        scheduler.schedule(Duration::from_millis(700), link(8));
        assert_eq!(scheduler.pending(), 1);
        assert_eq!(rx.recv().await.unwrap(), link(8));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(rx.try_recv().is_err());
    }
}
