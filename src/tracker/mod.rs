// SPDX-License-Identifier: MIT
//! Workspace root tracker.
//!
//! Keeps the indexer peer's notion of "tracked workspaces" synchronized with
//! the host's current set of project content roots. On every reconcile the
//! tracker diffs the desired set against the set it last applied, swaps in
//! the new set, and tells the peer about exactly the paths that changed.
//!
//! Concurrency: the read-compute-swap of the tracked set is a mutex-guarded
//! critical section with no I/O inside it. The peer calls happen after the
//! lock is released, so overlapping reconciliations serialize their set
//! swaps but may interleave their notification phases.
//!
//! Delivery is best-effort by design: a failed add/remove is logged and not
//! retried, and the local record keeps the already-swapped set. A path whose
//! notification failed is only re-sent once its membership changes again.

pub mod worker;

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::peer::IndexerPeer;
use crate::settings::SharedSettings;

pub use worker::ReconcileWorker;

// ─── Delta ────────────────────────────────────────────────────────────────────

/// Compute `(to_remove, to_add)` between the tracked and desired sets.
///
/// `to_remove` is tracked-but-not-desired; `to_add` is desired-but-not-tracked.
fn compute_delta(
    tracked: &HashSet<String>,
    desired: &HashSet<String>,
) -> (Vec<String>, Vec<String>) {
    let to_remove = tracked.difference(desired).cloned().collect();
    let to_add = desired.difference(tracked).cloned().collect();
    (to_remove, to_add)
}

// ─── WorkspaceTracker ─────────────────────────────────────────────────────────

/// Tracks currently active workspaces and fires add/remove calls to the
/// indexer peer as the desired set changes.
///
/// Exactly one tracked set exists per tracker; it is created empty and has
/// no persisted form.
pub struct WorkspaceTracker {
    peer: Arc<dyn IndexerPeer>,
    settings: SharedSettings,
    tracked: Mutex<HashSet<String>>,
}

impl WorkspaceTracker {
    pub fn new(peer: Arc<dyn IndexerPeer>, settings: SharedSettings) -> Self {
        Self {
            peer,
            settings,
            tracked: Mutex::new(HashSet::new()),
        }
    }

    /// Reconcile the peer against `desired`.
    ///
    /// No-op unless the peer is ready and syncing is allowed by the feature
    /// flags. Never returns an error: individual peer-call failures are
    /// logged and absorbed, and the local record is updated regardless.
    pub async fn reconcile(&self, desired: HashSet<String>) {
        if !self.peer.is_ready() {
            debug!("reconcile skipped: peer not ready");
            return;
        }
        if !self.settings.read().await.sync_allowed() {
            debug!("reconcile skipped: indexing disabled and no teams override");
            return;
        }

        // Critical section: diff and swap only. No I/O while holding the lock.
        let (to_remove, to_add) = {
            let mut tracked = self.tracked.lock().await;
            let delta = compute_delta(&tracked, &desired);
            *tracked = desired;
            delta
        };

        for path in &to_remove {
            if let Err(e) = self.peer.remove_tracked_workspace(path).await {
                warn!(path = %path, err = %e, "removeTrackedWorkspace failed — not retrying");
            }
        }
        for path in &to_add {
            if let Err(e) = self.peer.add_tracked_workspace(path).await {
                warn!(path = %path, err = %e, "addTrackedWorkspace failed — not retrying");
            }
        }
    }

    /// Snapshot of the currently tracked set.
    pub async fn tracked_snapshot(&self) -> HashSet<String> {
        self.tracked.lock().await.clone()
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn set(paths: &[&str]) -> HashSet<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn delta_of_identical_sets_is_empty() {
        let s = set(&["/a", "/b"]);
        let (to_remove, to_add) = compute_delta(&s, &s.clone());
        assert!(to_remove.is_empty());
        assert!(to_add.is_empty());
    }

    #[test]
    fn delta_is_minimal() {
        let tracked = set(&["/a", "/b", "/c"]);
        let desired = set(&["/b", "/c", "/d"]);
        let (to_remove, to_add) = compute_delta(&tracked, &desired);
        assert_eq!(to_remove, vec!["/a".to_string()]);
        assert_eq!(to_add, vec!["/d".to_string()]);
    }

    #[test]
    fn delta_from_empty_is_all_adds() {
        let (to_remove, to_add) = compute_delta(&HashSet::new(), &set(&["/a"]));
        assert!(to_remove.is_empty());
        assert_eq!(to_add, vec!["/a".to_string()]);
    }

    #[test]
    fn delta_to_empty_is_all_removes() {
        let (to_remove, to_add) = compute_delta(&set(&["/a", "/b"]), &HashSet::new());
        assert_eq!(to_remove.len(), 2);
        assert!(to_add.is_empty());
    }

    proptest! {
        /// Applying the delta to the tracked set always yields the desired set,
        /// and the two halves of the delta never overlap.
        #[test]
        fn delta_laws(
            tracked in prop::collection::hash_set("/[a-e]", 0..8),
            desired in prop::collection::hash_set("/[a-e]", 0..8),
        ) {
            let (to_remove, to_add) = compute_delta(&tracked, &desired);

            for p in &to_remove {
                prop_assert!(tracked.contains(p) && !desired.contains(p));
            }
            for p in &to_add {
                prop_assert!(desired.contains(p) && !tracked.contains(p));
            }

            let mut applied: HashSet<String> = tracked.clone();
            for p in &to_remove {
                applied.remove(p);
            }
            for p in &to_add {
                applied.insert(p.clone());
            }
            prop_assert_eq!(applied, desired);
        }
    }
}
