//! Indexer peer contract.
//!
//! The remote peer is a language-server-like process that maintains an index
//! keyed by tracked workspace root paths. The tracker only ever issues two
//! idempotent calls against it — add and remove — and queries readiness
//! before computing a delta.

pub mod client;

use async_trait::async_trait;
use thiserror::Error;

pub use client::IndexerClient;

/// Failure modes for a single peer call.
///
/// None of these are retried by the tracker; they are logged and absorbed.
#[derive(Debug, Error)]
pub enum PeerError {
    #[error("peer not connected")]
    NotConnected,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("peer rejected call: {0}")]
    Rpc(String),
    #[error("timed out waiting for peer ack")]
    Timeout,
}

/// Interface to the remote indexer.
///
/// Calls for different paths are independent and may be issued in parallel.
/// Tests substitute a recording mock behind this trait.
#[async_trait]
pub trait IndexerPeer: Send + Sync {
    /// Whether the peer connection is currently in a ready state.
    ///
    /// Must be cheap and non-blocking — it is consulted on every reconcile
    /// trigger, including ones that turn out to be no-ops.
    fn is_ready(&self) -> bool;

    /// Tell the peer to start tracking (indexing) the workspace at `path`.
    async fn add_tracked_workspace(&self, path: &str) -> Result<(), PeerError>;

    /// Tell the peer to stop tracking the workspace at `path`.
    async fn remove_tracked_workspace(&self, path: &str) -> Result<(), PeerError>;
}
