//! Concurrent driver invoking the reconciler for every Release.
//!
//! The driver owns scheduling only: which Releases are due, how many passes
//! run at once, and how long a failing Release waits before its next pass.
//! It guarantees at most one in-flight pass per Release.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use release_store::{
    ListParams, NamespacedName, Resource, ResourceStore, TypedStore, WatchEvent, WatchEventType,
};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::ControllerConfig;
use crate::domain::{Release, Result};
use crate::metrics::METRICS;
use crate::ownership::owner_from_annotations;
use crate::reconciler::{ReconcileOutcome, Reconciler};
use crate::syncer::SnapshotSyncer;

/// Why the run loop woke up.
enum Wakeup {
    Shutdown,
    Resync,
    Changed(NamespacedName),
    Ignored,
    Due,
}

/// Work queue of Release keys with per-key due times and failure counts.
#[derive(Debug, Default)]
struct WorkQueue {
    due: BTreeMap<NamespacedName, Instant>,
    failures: HashMap<NamespacedName, u32>,
}

impl WorkQueue {
    /// Schedule `key` now unless it is already due earlier.
    fn push_now(&mut self, key: NamespacedName) {
        let now = Instant::now();
        let at = self.due.entry(key).or_insert(now);
        if *at > now {
            *at = now;
        }
    }

    fn push_after(&mut self, key: NamespacedName, at: Instant) {
        self.due.insert(key, at);
    }

    /// Remove and return every key whose due time has passed.
    fn take_due(&mut self, now: Instant) -> Vec<NamespacedName> {
        let ready: Vec<NamespacedName> = self
            .due
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &ready {
            self.due.remove(key);
        }
        ready
    }

    fn next_due(&self) -> Option<Instant> {
        self.due.values().min().copied()
    }
}

/// Drives reconciliation of every Release in a store.
pub struct ReleaseController {
    reconciler: Reconciler,
    config: ControllerConfig,
}

impl ReleaseController {
    pub fn new(store: Arc<dyn ResourceStore>, config: ControllerConfig) -> Self {
        Self {
            reconciler: Reconciler::with_store(store),
            config,
        }
    }

    pub fn with_syncer(
        store: Arc<dyn ResourceStore>,
        syncer: Arc<dyn SnapshotSyncer>,
        config: ControllerConfig,
    ) -> Self {
        Self {
            reconciler: Reconciler::new(store, syncer),
            config,
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    fn store(&self) -> &Arc<dyn ResourceStore> {
        self.reconciler.store()
    }

    /// Keys of every Release in the store.
    pub async fn list_release_keys(&self) -> Result<Vec<NamespacedName>> {
        let releases: Vec<Release> = self.store().list(&ListParams::default()).await?;
        Ok(releases.iter().map(Release::key).collect())
    }

    /// Reconcile each key once, at most `workers` at a time.
    ///
    /// Duplicate keys are collapsed so a Release never has two passes in
    /// the same batch.
    pub async fn reconcile_batch(
        &self,
        keys: Vec<NamespacedName>,
    ) -> Vec<(NamespacedName, ReconcileOutcome)> {
        let unique: BTreeSet<NamespacedName> = keys.into_iter().collect();
        stream::iter(unique)
            .map(|key| async move {
                let outcome = self.reconciler.reconcile(&key).await;
                (key, outcome)
            })
            .buffer_unordered(self.config.workers.max(1))
            .collect()
            .await
    }

    fn schedule(&self, queue: &mut WorkQueue, key: NamespacedName, outcome: ReconcileOutcome) {
        match outcome {
            ReconcileOutcome::Done => {
                queue.failures.remove(&key);
            }
            ReconcileOutcome::Requeue => {
                // Writes made by the pass enqueue the Release again sooner.
                queue.failures.remove(&key);
                queue.push_after(key, Instant::now() + self.config.backoff_base);
            }
            ReconcileOutcome::RequeueWithError(_) => {
                let failures = queue.failures.entry(key.clone()).or_insert(0);
                *failures = failures.saturating_add(1);
                let delay = self.config.backoff_for(*failures);
                debug!(release = %key, failures = *failures, delay_ms = delay.as_millis() as u64, "backing off");
                queue.push_after(key, Instant::now() + delay);
            }
        }
    }

    /// Releases touched since the last call. Lost events fall back to every
    /// Release in the store.
    async fn changed_releases(
        &self,
        events: &mut Option<broadcast::Receiver<WatchEvent>>,
    ) -> Result<Vec<NamespacedName>> {
        match drain_changes(events) {
            Some(keys) => Ok(keys),
            None => {
                warn!("change feed lagged, rechecking every release");
                self.list_release_keys().await
            }
        }
    }

    async fn enqueue_all(&self, queue: &mut WorkQueue) {
        match self.list_release_keys().await {
            Ok(keys) => {
                debug!(releases = keys.len(), "resync");
                for key in keys {
                    // Releases waiting out a backoff keep their due time.
                    if !queue.failures.contains_key(&key) {
                        queue.push_now(key);
                    }
                }
            }
            Err(err) => warn!(error = %err, "failed to list releases"),
        }
    }

    /// Reconcile until `shutdown` resolves.
    ///
    /// Every Release is enqueued at start and on each resync period. Changes
    /// to Releases, and to objects annotated with an owning Release, enqueue
    /// that Release.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut events = self.store().watch();
        let mut resync = time::interval(self.config.resync_period);
        resync.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut queue = WorkQueue::default();

        info!(workers = self.config.workers, resync_secs = self.config.resync_period.as_secs(), "release controller started");

        loop {
            let ready = queue.take_due(Instant::now());
            if !ready.is_empty() {
                for (key, outcome) in self.reconcile_batch(ready).await {
                    self.schedule(&mut queue, key, outcome);
                }
                continue;
            }

            let next_due = queue.next_due();
            let wakeup = tokio::select! {
                _ = &mut shutdown => Wakeup::Shutdown,
                _ = resync.tick() => Wakeup::Resync,
                event = next_event(&mut events) => match event {
                    Some(event) => match release_for_event(&event) {
                        Some(key) => Wakeup::Changed(key),
                        None => Wakeup::Ignored,
                    },
                    None => Wakeup::Resync,
                },
                _ = sleep_until(next_due) => Wakeup::Due,
            };

            match wakeup {
                Wakeup::Shutdown => break,
                Wakeup::Resync => {
                    self.enqueue_all(&mut queue).await;
                    METRICS.flush();
                }
                Wakeup::Changed(key) => queue.push_now(key),
                Wakeup::Ignored | Wakeup::Due => {}
            }
        }

        METRICS.flush();
        info!("release controller stopped");
    }

    /// Reconcile every Release until a round changes nothing, or until
    /// `max_rounds` rounds have run. Returns the number of rounds.
    ///
    /// Failed passes are retried after their backoff delay.
    pub async fn run_until_quiescent(&self, max_rounds: usize) -> Result<usize> {
        let mut events = self.store().watch();
        let mut queue = WorkQueue::default();
        for key in self.list_release_keys().await? {
            queue.push_now(key);
        }

        let mut rounds = 0;
        while rounds < max_rounds {
            let ready = match queue.next_due() {
                Some(at) => {
                    time::sleep_until(at).await;
                    queue.take_due(Instant::now())
                }
                None => {
                    // Writes made by the last round may concern other Releases.
                    let changed = self.changed_releases(&mut events).await?;
                    if changed.is_empty() {
                        break;
                    }
                    changed
                }
            };
            if ready.is_empty() {
                continue;
            }

            rounds += 1;
            for (key, outcome) in self.reconcile_batch(ready).await {
                self.schedule(&mut queue, key, outcome);
            }
            for key in self.changed_releases(&mut events).await? {
                queue.push_now(key);
            }
        }

        METRICS.flush();
        Ok(rounds)
    }
}

/// Release to reconcile for a change event, if any.
fn release_for_event(event: &WatchEvent) -> Option<NamespacedName> {
    if event.object.kind == Release::KIND {
        return match event.event_type {
            WatchEventType::Deleted => None,
            _ => Some(event.object.key()),
        };
    }
    owner_from_annotations(&event.object.metadata, Release::KIND)
}

/// Next change event. `None` means events were lost and a resync is needed.
async fn next_event(events: &mut Option<broadcast::Receiver<WatchEvent>>) -> Option<WatchEvent> {
    let receiver = match events {
        Some(receiver) => receiver,
        None => return std::future::pending().await,
    };
    match receiver.recv().await {
        Ok(event) => Some(event),
        Err(RecvError::Lagged(missed)) => {
            warn!(missed, "change feed lagged");
            None
        }
        Err(RecvError::Closed) => {
            *events = None;
            std::future::pending().await
        }
    }
}

/// Releases affected by every change event received so far.
///
/// `None` means the receiver lagged: some events were dropped, so the
/// affected Releases are unknown.
fn drain_changes(
    events: &mut Option<broadcast::Receiver<WatchEvent>>,
) -> Option<Vec<NamespacedName>> {
    let mut keys = BTreeSet::new();
    let mut lagged = false;
    if let Some(receiver) = events {
        loop {
            match receiver.try_recv() {
                Ok(event) => keys.extend(release_for_event(&event)),
                Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                    debug!(missed, "change feed lagged");
                    lagged = true;
                }
                Err(_) => break,
            }
        }
    }
    (!lagged).then(|| keys.into_iter().collect())
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use release_store::{DynamicObject, ObjectMeta};
    use serde_json::Map;
    use std::time::Duration;

    #[test]
    fn work_queue_keeps_earliest_due_time() {
        let mut queue = WorkQueue::default();
        let key = NamespacedName::new("tenant", "r");
        let later = Instant::now() + Duration::from_secs(60);

        queue.push_after(key.clone(), later);
        assert!(queue.take_due(Instant::now()).is_empty());

        queue.push_now(key.clone());
        assert_eq!(queue.take_due(Instant::now()), vec![key]);
        assert!(queue.next_due().is_none());
    }

    #[test]
    fn requeue_waits_for_base_delay() {
        let store = Arc::new(release_store::fakes::MemoryResourceStore::new());
        let config = ControllerConfig::default().with_backoff(Duration::from_secs(5), Duration::from_secs(60));
        let controller = ReleaseController::new(store, config);
        let mut queue = WorkQueue::default();
        let key = NamespacedName::new("tenant", "r");
        queue.failures.insert(key.clone(), 3);

        let before = Instant::now();
        controller.schedule(&mut queue, key.clone(), ReconcileOutcome::Requeue);

        assert!(queue.failures.is_empty());
        assert!(queue.take_due(Instant::now()).is_empty());
        let due = queue.next_due().expect("release is queued");
        assert!(due >= before + Duration::from_secs(5));
    }

    fn release_event(name: &str) -> WatchEvent {
        let object = DynamicObject::new(Release::KIND, ObjectMeta::new("tenant", name), Map::new());
        WatchEvent {
            event_type: WatchEventType::Modified,
            object,
        }
    }

    #[test]
    fn drain_changes_collects_release_keys() {
        let (sender, receiver) = broadcast::channel(8);
        let mut events = Some(receiver);
        sender.send(release_event("a")).ok();
        sender.send(release_event("b")).ok();
        sender.send(release_event("a")).ok();

        assert_eq!(
            drain_changes(&mut events),
            Some(vec![
                NamespacedName::new("tenant", "a"),
                NamespacedName::new("tenant", "b"),
            ])
        );
        assert_eq!(drain_changes(&mut events), Some(vec![]));
    }

    #[test]
    fn drain_changes_reports_lost_events() {
        let (sender, receiver) = broadcast::channel(2);
        let mut events = Some(receiver);
        for name in ["a", "b", "c", "d"] {
            sender.send(release_event(name)).ok();
        }

        assert_eq!(drain_changes(&mut events), None);
        // The receiver has caught up after reporting the lag.
        assert_eq!(drain_changes(&mut events), Some(vec![]));
    }
}
