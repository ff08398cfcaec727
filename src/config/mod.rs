use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::error;

const DEFAULT_PEER_URL: &str = "ws://127.0.0.1:4305";

// ─── TOML config file ─────────────────────────────────────────────────────────

/// `{data_dir}/config.toml` — all fields are optional overrides.
/// Priority: CLI / env var  >  TOML  >  built-in default.
#[derive(Deserialize, Default)]
struct TomlConfig {
    /// Indexer peer WebSocket URL (default: ws://127.0.0.1:4305).
    peer_url: Option<String>,
    /// Log level filter string, e.g. "debug", "info,trackd=trace" (default: "info").
    log: Option<String>,
    /// Log output format: "pretty" (default, human-readable) | "json" (structured for log aggregators).
    log_format: Option<String>,
    /// Path to the project manifest (default: `{data_dir}/project.toml`).
    project_manifest: Option<PathBuf>,
}

fn load_toml(data_dir: &Path) -> Option<TomlConfig> {
    let path = data_dir.join("config.toml");
    let contents = std::fs::read_to_string(&path).ok()?;
    match toml::from_str::<TomlConfig>(&contents) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            error!(path = %path.display(), err = %e, "failed to parse config.toml — using defaults");
            None
        }
    }
}

// ─── TrackerConfig ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub data_dir: PathBuf,
    /// Log level filter string.
    pub log: String,
    /// Log output format: "pretty" (default) | "json".
    pub log_format: String,
    /// Indexer peer WebSocket URL (TRACKD_PEER_URL env var).
    pub peer_url: String,
    /// Project manifest the daemon watches for root changes.
    pub project_manifest: PathBuf,
}

impl TrackerConfig {
    /// Build config from CLI/env args + optional TOML file.
    ///
    /// Priority (highest to lowest):
    ///   1. CLI / env — passed as `Some(value)` from clap
    ///   2. TOML file at `{data_dir}/config.toml`
    ///   3. Built-in defaults
    pub fn new(
        data_dir: Option<PathBuf>,
        log: Option<String>,
        peer_url: Option<String>,
        project_manifest: Option<PathBuf>,
    ) -> Self {
        let data_dir = data_dir.unwrap_or_else(default_data_dir);

        // Load TOML as the lowest-priority override layer
        let toml = load_toml(&data_dir).unwrap_or_default();

        let log = log.or(toml.log).unwrap_or_else(|| "info".to_string());

        let peer_url = peer_url
            .or(std::env::var("TRACKD_PEER_URL")
                .ok()
                .filter(|s| !s.is_empty()))
            .or(toml.peer_url)
            .unwrap_or_else(|| DEFAULT_PEER_URL.to_string());

        let log_format = std::env::var("TRACKD_LOG_FORMAT")
            .ok()
            .filter(|s| !s.is_empty())
            .or(toml.log_format)
            .unwrap_or_else(|| "pretty".to_string());

        let project_manifest = project_manifest
            .or(toml.project_manifest)
            .unwrap_or_else(|| data_dir.join("project.toml"));

        Self {
            data_dir,
            log,
            log_format,
            peer_url,
            project_manifest,
        }
    }
}

fn default_data_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        // ~/Library/Application Support/trackd
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("trackd");
        }
    }
    #[cfg(target_os = "linux")]
    {
        // $XDG_DATA_HOME/trackd or ~/.local/share/trackd
        if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
            return PathBuf::from(xdg).join("trackd");
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join(".local")
                .join("share")
                .join("trackd");
        }
    }
    #[cfg(target_os = "windows")]
    {
        // %APPDATA%\trackd
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata).join("trackd");
        }
    }
    // Fallback
    PathBuf::from(".trackd")
}
