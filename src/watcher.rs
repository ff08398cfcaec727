//! Project manifest watcher.
//!
//! Fires a reconcile trigger whenever `project.toml` changes — the daemon's
//! counterpart of an IDE's module-root-changed notification. Events are
//! debounced at the file-watch layer; the worker itself does not debounce.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::project::ProjectView;
use crate::tracker::ReconcileWorker;

/// Holds the file watch alive; dropping it stops the triggers.
pub struct ManifestWatcher {
    _watcher: notify_debouncer_full::Debouncer<
        notify_debouncer_full::notify::RecommendedWatcher,
        notify_debouncer_full::FileIdMap,
    >,
}

impl ManifestWatcher {
    /// Start watching the manifest and submitting triggers to `worker`.
    ///
    /// Returns `None` if the watcher could not be created (non-fatal; the
    /// daemon still reconciles once at startup).
    pub fn start(manifest: PathBuf, worker: ReconcileWorker) -> Option<Self> {
        let rt_handle = tokio::runtime::Handle::current();
        let manifest_cb = manifest.clone();

        let watcher = notify_debouncer_full::new_debouncer(
            std::time::Duration::from_secs(2),
            None,
            move |result: notify_debouncer_full::DebounceEventResult| {
                if let Ok(events) = result {
                    let relevant = events.iter().any(|e| {
                        use notify_debouncer_full::notify::EventKind;
                        matches!(e.event.kind, EventKind::Modify(_) | EventKind::Create(_))
                    });
                    if relevant {
                        let worker = worker.clone();
                        let path = manifest_cb.clone();
                        rt_handle.spawn(async move {
                            match ProjectView::load(&path) {
                                Ok(view) => worker.submit_project(&view).await,
                                Err(e) => {
                                    warn!(path = %path.display(), err = %e, "project manifest unreadable — skipping trigger");
                                }
                            }
                        });
                    }
                }
            },
        );

        match watcher {
            Ok(mut debouncer) => {
                use notify_debouncer_full::notify::Watcher as _;
                // Watch the parent directory since watching a non-existent
                // file fails on some platforms.
                let watch_path = manifest.parent().unwrap_or_else(|| Path::new("."));
                if let Err(e) = debouncer.watcher().watch(
                    watch_path,
                    notify_debouncer_full::notify::RecursiveMode::NonRecursive,
                ) {
                    warn!("manifest watcher failed to start: {e} — root-change triggers disabled");
                    return None;
                }
                info!(path = %manifest.display(), "project manifest watcher started");
                Some(Self {
                    _watcher: debouncer,
                })
            }
            Err(e) => {
                warn!("manifest watcher creation failed: {e} — root-change triggers disabled");
                None
            }
        }
    }
}
