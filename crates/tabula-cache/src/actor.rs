//! Single-consumer task that owns reconciliation.
//!
//! Push messages are queued on an mpsc channel and applied one at a time, each
//! under one lock of the shared cache, so no read-modify-write of an entry can
//! interleave with another event.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::de::DeserializeOwned;
use tabula_model::RowAccess;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::reconcile::Reconciler;
use crate::socket::SocketMessage;
use crate::store::QueryCache;

/// Cache shared between the loader (writes fetched pages) and the reconciler.
pub type SharedCache<R> = Arc<Mutex<QueryCache<R>>>;

/// Locks the cache, recovering from a poisoned lock.
///
/// Every write completes before the guard is released, so a panic elsewhere
/// cannot leave an entry half-updated.
pub fn lock_cache<R>(cache: &SharedCache<R>) -> MutexGuard<'_, QueryCache<R>> {
    cache.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Counters reported when the reconciler stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub applied: usize,
    pub skipped: usize,
    pub entries_changed: usize,
}

/// Sending side of a running reconciler task.
#[derive(Debug)]
pub struct ReconcilerHandle {
    sender: mpsc::Sender<SocketMessage>,
    task: JoinHandle<ReconcileStats>,
}

impl ReconcilerHandle {
    pub fn sender(&self) -> mpsc::Sender<SocketMessage> {
        self.sender.clone()
    }

    /// Queues a message; waits while the queue is full.
    pub async fn send(&self, message: SocketMessage) -> bool {
        self.sender.send(message).await.is_ok()
    }

    /// Closes the queue and waits for pending messages to be applied.
    pub async fn shutdown(self) -> ReconcileStats {
        let Self { sender, task } = self;
        drop(sender);
        task.await.unwrap_or_else(|error| {
            tracing::warn!(%error, "reconciler task ended abnormally");
            ReconcileStats::default()
        })
    }
}

/// Spawns the reconciler on the current tokio runtime.
pub fn spawn_reconciler<R>(
    cache: SharedCache<R>,
    reconciler: Reconciler<R>,
    capacity: usize,
) -> ReconcilerHandle
where
    R: RowAccess + Clone + DeserializeOwned + Send + Sync + 'static,
{
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    let task = tokio::spawn(run(cache, reconciler, receiver));
    ReconcilerHandle { sender, task }
}

async fn run<R>(
    cache: SharedCache<R>,
    reconciler: Reconciler<R>,
    mut receiver: mpsc::Receiver<SocketMessage>,
) -> ReconcileStats
where
    R: RowAccess + Clone + DeserializeOwned,
{
    let mut stats = ReconcileStats::default();
    while let Some(message) = receiver.recv().await {
        let event = message.event.clone();
        let outcome = {
            let mut guard = lock_cache(&cache);
            reconciler.apply_message(&mut guard, message)
        };
        match outcome {
            Ok(changed) => {
                stats.applied += 1;
                stats.entries_changed += changed;
            }
            Err(error) => {
                stats.skipped += 1;
                tracing::warn!(%event, %error, "push message skipped");
            }
        }
    }
    tracing::debug!(?stats, "reconciler stopped");
    stats
}
