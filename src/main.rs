use anyhow::{Context as _, Result};
use clap::Parser;
use tracing::{info, warn};

use trackd::config::TrackerConfig;
use trackd::peer::IndexerClient;
use trackd::project::ProjectView;
use trackd::settings::{self, SettingsWatcher};
use trackd::tracker::{ReconcileWorker, WorkspaceTracker};
use trackd::watcher::ManifestWatcher;

#[derive(Parser)]
#[command(
    name = "trackd",
    about = "Workspace root tracker — syncs project content roots to a remote indexer",
    version
)]
struct Args {
    /// Data directory for config, settings, and the default project manifest
    #[arg(long, env = "TRACKD_DATA_DIR")]
    data_dir: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "TRACKD_LOG")]
    log: Option<String>,

    /// Write logs to this file path (rotated daily). Optional.
    #[arg(long, env = "TRACKD_LOG_FILE")]
    log_file: Option<std::path::PathBuf>,

    /// Indexer peer WebSocket URL
    #[arg(long, env = "TRACKD_PEER_URL")]
    peer_url: Option<String>,

    /// Project manifest to watch for content-root changes
    #[arg(long, env = "TRACKD_PROJECT")]
    project: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = TrackerConfig::new(args.data_dir, args.log, args.peer_url, args.project);

    // Keep the appender guard alive for the process lifetime.
    let _log_guard = setup_logging(&config.log, args.log_file.as_deref(), &config.log_format);

    std::fs::create_dir_all(&config.data_dir).with_context(|| {
        format!(
            "could not create data directory {}",
            config.data_dir.display()
        )
    })?;

    info!(
        data_dir = %config.data_dir.display(),
        peer_url = %config.peer_url,
        manifest = %config.project_manifest.display(),
        "trackd starting"
    );

    // Feature flags, hot-reloaded from {data_dir}/settings.toml. The watcher
    // handle must stay alive until shutdown or the file watch stops.
    let _settings_watcher = SettingsWatcher::start(&config.data_dir);
    let settings = match &_settings_watcher {
        Some(watcher) => watcher.settings.clone(),
        None => settings::new_shared(settings::load_settings(&SettingsWatcher::settings_path(
            &config.data_dir,
        ))),
    };

    let peer = IndexerClient::spawn(config.peer_url.clone());
    let tracker = std::sync::Arc::new(WorkspaceTracker::new(peer, settings));
    let worker = ReconcileWorker::spawn(tracker);

    // Reconcile once at startup if a manifest already exists.
    match ProjectView::load(&config.project_manifest) {
        Ok(view) => worker.submit_project(&view).await,
        Err(e) => {
            warn!(err = %e, "no readable project manifest at startup — waiting for changes")
        }
    }

    let _manifest_watcher = ManifestWatcher::start(config.project_manifest.clone(), worker);

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    // In-flight peer notifications are abandoned on exit by design.
    info!("shutdown signal received — exiting");
    Ok(())
}

/// Initialize the tracing subscriber.
/// If `log_file` is set, logs go to both stdout and a daily-rolling file.
/// Returns a `WorkerGuard` that must stay alive for the process lifetime.
///
/// `log_format` may be `"pretty"` (default, human-readable compact format) or
/// `"json"` (structured JSON for log aggregators).
///
/// If the log directory cannot be created, falls back to stdout-only logging
/// with a warning — never panics.
fn setup_logging(
    log_level: &str,
    log_file: Option<&std::path::Path>,
    log_format: &str,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let use_json = log_format == "json";

    if let Some(path) = log_file {
        let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
        let filename = path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("trackd.log"));

        // Ensure the directory exists before tracing-appender tries to open it.
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!(
                "warn: could not create log directory '{}': {e} — falling back to stdout",
                dir.display()
            );
            if use_json {
                tracing_subscriber::fmt()
                    .json()
                    .with_env_filter(log_level)
                    .init();
            } else {
                tracing_subscriber::fmt()
                    .with_env_filter(log_level)
                    .compact()
                    .init();
            }
            return None;
        }

        let appender = tracing_appender::rolling::daily(dir, filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);

        if use_json {
            tracing_subscriber::registry()
                .with(EnvFilter::new(log_level))
                .with(fmt::layer().json())
                .with(fmt::layer().json().with_writer(non_blocking))
                .init();
        } else {
            tracing_subscriber::registry()
                .with(EnvFilter::new(log_level))
                .with(fmt::layer().compact())
                .with(fmt::layer().with_writer(non_blocking))
                .init();
        }

        Some(guard)
    } else if use_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(log_level)
            .init();
        None
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(log_level)
            .compact()
            .init();
        None
    }
}
