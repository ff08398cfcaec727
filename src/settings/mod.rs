// SPDX-License-Identifier: MIT
//! Feature-flag settings store.
//!
//! Two booleans gate workspace synchronization: `indexing_enabled` (the
//! user-facing opt-in, persisted in `{data_dir}/settings.toml`) and `teams`
//! (an org-level override that forces syncing on regardless of the user
//! setting). Reconciliation proceeds when either is true.
//!
//! The file is hot-reloaded — flipping a flag takes effect on the next
//! reconcile without restarting the daemon.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

// ─── Settings ─────────────────────────────────────────────────────────────────

/// `{data_dir}/settings.toml` — both fields optional, defaults apply.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Whether the user has enabled workspace indexing. Default: true.
    pub indexing_enabled: bool,
    /// Org-level override: sync even when `indexing_enabled` is false.
    /// Default: false.
    pub teams: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            indexing_enabled: true,
            teams: false,
        }
    }
}

impl Settings {
    /// Whether reconciliation should proceed at all.
    pub fn sync_allowed(&self) -> bool {
        self.indexing_enabled || self.teams
    }
}

/// Thread-safe shared handle to the current settings.
pub type SharedSettings = Arc<RwLock<Settings>>;

/// Construct the shared settings handle used by the tracker.
pub fn new_shared(settings: Settings) -> SharedSettings {
    Arc::new(RwLock::new(settings))
}

/// Load settings from `settings.toml`, falling back to defaults when the
/// file is missing or malformed.
pub fn load_settings(path: &Path) -> Settings {
    let Ok(contents) = std::fs::read_to_string(path) else {
        return Settings::default();
    };
    match toml::from_str::<Settings>(&contents) {
        Ok(s) => s,
        Err(e) => {
            error!(path = %path.display(), err = %e, "failed to parse settings.toml — using defaults");
            Settings::default()
        }
    }
}

// ─── Hot-reload watcher ───────────────────────────────────────────────────────

/// Watches `{data_dir}/settings.toml` for changes and reloads the flags.
///
/// Uses the `notify` crate (kqueue on macOS, inotify on Linux) behind a
/// 2-second debouncer.
pub struct SettingsWatcher {
    pub settings: SharedSettings,
    // Hold the watcher alive; dropping it stops the file watch.
    _watcher: notify_debouncer_full::Debouncer<
        notify_debouncer_full::notify::RecommendedWatcher,
        notify_debouncer_full::FileIdMap,
    >,
}

impl SettingsWatcher {
    /// Start watching `{data_dir}/settings.toml`.
    ///
    /// Returns `None` if the watcher could not be created (non-fatal; the
    /// daemon runs fine with the startup snapshot of the flags).
    pub fn start(data_dir: &Path) -> Option<Self> {
        let settings_path = data_dir.join("settings.toml");
        let settings = new_shared(load_settings(&settings_path));

        let settings_clone = settings.clone();
        let path_clone = settings_path.clone();
        let rt_handle = tokio::runtime::Handle::current();

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
                        let settings = settings_clone.clone();
                        let path = path_clone.clone();
                        rt_handle.spawn(async move {
                            let reloaded = load_settings(&path);
                            let mut guard = settings.write().await;
                            if *guard != reloaded {
                                info!(
                                    indexing_enabled = reloaded.indexing_enabled,
                                    teams = reloaded.teams,
                                    "settings.toml reloaded"
                                );
                                *guard = reloaded;
                            }
                        });
                    }
                }
            },
        );

        match watcher {
            Ok(mut debouncer) => {
                use notify_debouncer_full::notify::Watcher as _;
                // Watch the data_dir (parent of settings.toml) since watching
                // a non-existent file fails on some platforms.
                let watch_path = settings_path.parent().unwrap_or_else(|| Path::new("."));
                if let Err(e) = debouncer.watcher().watch(
                    watch_path,
                    notify_debouncer_full::notify::RecursiveMode::NonRecursive,
                ) {
                    warn!("settings watcher failed to start: {e} — hot-reload disabled");
                    return None;
                }
                info!(path = %settings_path.display(), "settings hot-reload watcher started");
                Some(Self {
                    settings,
                    _watcher: debouncer,
                })
            }
            Err(e) => {
                warn!("settings watcher creation failed: {e} — hot-reload disabled");
                None
            }
        }
    }

    /// Path of the settings file for a given data dir.
    pub fn settings_path(data_dir: &Path) -> PathBuf {
        data_dir.join("settings.toml")
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_allow_sync() {
        let s = Settings::default();
        assert!(s.indexing_enabled);
        assert!(!s.teams);
        assert!(s.sync_allowed());
    }

    #[test]
    fn teams_overrides_disabled_indexing() {
        let s = Settings {
            indexing_enabled: false,
            teams: true,
        };
        assert!(s.sync_allowed());
    }

    #[test]
    fn both_flags_off_blocks_sync() {
        let s = Settings {
            indexing_enabled: false,
            teams: false,
        };
        assert!(!s.sync_allowed());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = load_settings(&dir.path().join("settings.toml"));
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn parses_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "indexing_enabled = false\n").unwrap();
        let s = load_settings(&path);
        assert!(!s.indexing_enabled);
        assert!(!s.teams);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "indexing_enabled = \"not a bool\"").unwrap();
        assert_eq!(load_settings(&path), Settings::default());
    }
}
