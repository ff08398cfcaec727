//! trackd — workspace root tracking service.
//!
//! Keeps a remote indexer's set of tracked workspaces synchronized with the
//! host's current project content roots. The host submits reconcile triggers
//! (via the [`tracker::ReconcileWorker`] queue or the bundled manifest
//! watcher); the tracker diffs the desired roots against the set it last
//! applied and issues idempotent add/remove calls to the peer, exactly once
//! per change, without retry.

pub mod config;
pub mod peer;
pub mod project;
pub mod settings;
pub mod tracker;
pub mod watcher;

pub use peer::{IndexerClient, IndexerPeer, PeerError};
pub use tracker::{ReconcileWorker, WorkspaceTracker};
