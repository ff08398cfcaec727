//! Reconcile trigger queue.
//!
//! The host fires a trigger whenever the set of project roots may have
//! changed. Each trigger becomes an independent `reconcile` task, so
//! overlapping triggers behave exactly like concurrent reconciliations
//! (serialized set swap, concurrent notification phases).
//!
//! Unlike a bare `tokio::spawn` per trigger, the worker is awaitable:
//! `flush()` resolves only after every previously submitted trigger has run
//! to completion, which is what lets tests assert on the final state without
//! sleeping. The host remains responsible for debouncing excessive triggers.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::project::{collect_desired_roots, ProjectView};

use super::WorkspaceTracker;

enum Command {
    Reconcile(HashSet<String>),
    Flush(oneshot::Sender<()>),
}

/// Cloneable handle to the reconcile queue.
#[derive(Clone)]
pub struct ReconcileWorker {
    tx: mpsc::Sender<Command>,
}

impl ReconcileWorker {
    /// Spawn the worker task for a tracker and return its handle.
    pub fn spawn(tracker: Arc<WorkspaceTracker>) -> Self {
        let (tx, mut rx) = mpsc::channel::<Command>(64);

        tokio::spawn(async move {
            let mut in_flight: Vec<tokio::task::JoinHandle<()>> = Vec::new();

            while let Some(cmd) = rx.recv().await {
                match cmd {
                    Command::Reconcile(desired) => {
                        in_flight.retain(|h| !h.is_finished());
                        let tracker = tracker.clone();
                        in_flight.push(tokio::spawn(async move {
                            tracker.reconcile(desired).await;
                        }));
                    }
                    Command::Flush(ack) => {
                        for handle in in_flight.drain(..) {
                            let _ = handle.await;
                        }
                        let _ = ack.send(());
                    }
                }
            }
            debug!("reconcile worker stopped");
        });

        Self { tx }
    }

    /// Submit a reconcile trigger with an explicit desired root set.
    pub async fn submit(&self, desired: HashSet<String>) {
        let _ = self.tx.send(Command::Reconcile(desired)).await;
    }

    /// Submit a reconcile trigger for the current project view.
    pub async fn submit_project(&self, view: &ProjectView) {
        self.submit(collect_desired_roots(view)).await;
    }

    /// Wait until every trigger submitted before this call has completed,
    /// including its peer notification phase.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.tx.send(Command::Flush(tx)).await.is_ok() {
            let _ = rx.await;
        }
    }
}
