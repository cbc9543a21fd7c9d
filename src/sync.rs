//! Keeps the durable copy of the task collection in step with the store.
//!
//! Loading never fails: storage and parse problems degrade to an empty collection.
//! Saving is fire-and-forget: snapshots are queued to a single writer task, and a
//! failed write is logged and dropped without retry.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::models::Task;
use crate::repository::TaskRepository;

pub fn load_or_empty(repo: &dyn TaskRepository) -> Vec<Task> {
    match repo.load() {
        Ok(tasks) => {
            log::info!("loaded todos count={}", tasks.len());
            tasks
        }
        Err(err) => {
            log::warn!("failed to load todos, starting empty: {err}");
            Vec::new()
        }
    }
}

/// Single-writer save queue. Writes happen in submission order; the caller never waits.
pub struct SaveQueue {
    tx: mpsc::UnboundedSender<Vec<Task>>,
    worker: JoinHandle<()>,
}

impl SaveQueue {
    /// Starts the writer on the current tokio runtime. With `coalesce` set, snapshots
    /// that queue up behind a slow write are collapsed into the newest one.
    pub fn spawn(repo: Arc<dyn TaskRepository>, coalesce: bool) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_writer(repo, rx, coalesce));
        Self { tx, worker }
    }

    pub fn submit(&self, tasks: Vec<Task>) {
        if self.tx.send(tasks).is_err() {
            log::error!("save queue closed; dropping snapshot");
        }
    }

    /// Flushes everything already submitted, then stops the writer.
    pub async fn close(self) {
        drop(self.tx);
        if let Err(err) = self.worker.await {
            log::error!("save writer ended abnormally: {err}");
        }
    }
}

async fn run_writer(
    repo: Arc<dyn TaskRepository>,
    mut rx: mpsc::UnboundedReceiver<Vec<Task>>,
    coalesce: bool,
) {
    while let Some(mut snapshot) = rx.recv().await {
        if coalesce {
            let mut skipped = 0usize;
            while let Ok(newer) = rx.try_recv() {
                snapshot = newer;
                skipped += 1;
            }
            if skipped > 0 {
                log::debug!("coalesced {skipped} queued todo snapshots");
            }
        }
        let repo = Arc::clone(&repo);
        let count = snapshot.len();
        match tokio::task::spawn_blocking(move || repo.save(&snapshot)).await {
            Ok(Ok(())) => log::debug!("saved todos count={count}"),
            Ok(Err(err)) => {
                log::warn!("failed to save todos count={count}; kept in memory only: {err}")
            }
            Err(err) => log::error!("todo save task panicked: {err}"),
        }
    }
}
