//! WebSocket JSON-RPC 2.0 client for the indexer peer.
//!
//! Protocol:
//! 1. Connect to the peer URL (default: `ws://127.0.0.1:4305`)
//! 2. Send `indexer.addTrackedWorkspace` / `indexer.removeTrackedWorkspace`
//!    requests with `{ "path": "..." }` params and a numeric id
//! 3. Match acks to in-flight requests by id; anything without an id is a
//!    server notification and is ignored
//! 4. On disconnect: fail all in-flight requests, flip the readiness flag,
//!    reconnect with exponential backoff (2s → 4s → 8s … max 60s)
//!
//! Readiness is transport-level only — a connected socket means ready. The
//! tracker consults it before every reconcile and skips when the peer is down.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use super::{IndexerPeer, PeerError};

const METHOD_ADD: &str = "indexer.addTrackedWorkspace";
const METHOD_REMOVE: &str = "indexer.removeTrackedWorkspace";

/// How long to wait for a single ack before giving up on the call.
const ACK_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, PeerError>>>>>;

// ─── IndexerClient ────────────────────────────────────────────────────────────

/// Long-lived client handle. The connection itself lives in a background
/// task; this handle only enqueues outbound frames and awaits acks.
pub struct IndexerClient {
    out_tx: mpsc::Sender<String>,
    pending: PendingMap,
    next_id: AtomicU64,
    ready: Arc<AtomicBool>,
}

impl IndexerClient {
    /// Start the connection task and return a shared handle.
    ///
    /// The task reconnects forever; dropping every handle does not stop it
    /// (the daemon shuts it down by exiting the runtime).
    pub fn spawn(url: String) -> Arc<Self> {
        let (out_tx, out_rx) = mpsc::channel::<String>(128);
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let ready = Arc::new(AtomicBool::new(false));

        tokio::spawn(connection_loop(
            url,
            out_rx,
            pending.clone(),
            ready.clone(),
        ));

        Arc::new(Self {
            out_tx,
            pending,
            next_id: AtomicU64::new(1),
            ready,
        })
    }

    /// Issue one request and wait for its ack.
    async fn call(&self, method: &str, path: &str) -> Result<(), PeerError> {
        if !self.ready.load(Ordering::SeqCst) {
            return Err(PeerError::NotConnected);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let frame = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": { "path": path },
        })
        .to_string();

        if self.out_tx.send(frame).await.is_err() {
            self.pending.lock().await.remove(&id);
            return Err(PeerError::NotConnected);
        }

        match tokio::time::timeout(ACK_TIMEOUT, rx).await {
            Ok(Ok(Ok(_ack))) => Ok(()),
            Ok(Ok(Err(e))) => Err(e),
            // Sender dropped — the connection died while we were waiting.
            Ok(Err(_)) => Err(PeerError::NotConnected),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(PeerError::Timeout)
            }
        }
    }
}

#[async_trait]
impl IndexerPeer for IndexerClient {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn add_tracked_workspace(&self, path: &str) -> Result<(), PeerError> {
        self.call(METHOD_ADD, path).await
    }

    async fn remove_tracked_workspace(&self, path: &str) -> Result<(), PeerError> {
        self.call(METHOD_REMOVE, path).await
    }
}

// ─── Background loop ──────────────────────────────────────────────────────────

async fn connection_loop(
    url: String,
    mut out_rx: mpsc::Receiver<String>,
    pending: PendingMap,
    ready: Arc<AtomicBool>,
) {
    let mut backoff_secs: u64 = 2;

    loop {
        info!(url = %url, "indexer peer: connecting");

        match connect_async(&url).await {
            Ok((ws_stream, _)) => {
                info!("indexer peer: connected");
                backoff_secs = 2;
                ready.store(true, Ordering::SeqCst);

                let (mut sink, mut stream) = ws_stream.split();

                tokio::select! {
                    _ = handle_inbound(&mut stream, &pending) => {
                        warn!("indexer peer: inbound stream closed");
                    }
                    _ = handle_outbound(&mut out_rx, &mut sink) => {
                        warn!("indexer peer: outbound sink closed");
                    }
                }

                ready.store(false, Ordering::SeqCst);
                fail_pending(&pending).await;
            }
            Err(e) => {
                warn!("indexer peer: connection failed: {e:#}");
            }
        }

        sleep_backoff(&mut backoff_secs).await;
    }
}

/// Receive frames from the peer and resolve the matching in-flight request.
async fn handle_inbound(
    stream: &mut (impl StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
         + Unpin),
    pending: &PendingMap,
) {
    while let Some(msg) = stream.next().await {
        let text = match msg {
            Ok(Message::Text(t)) => t,
            Ok(Message::Close(_)) | Err(_) => break,
            _ => continue,
        };

        let frame: Value = match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(e) => {
                warn!("indexer peer: unparseable frame: {e}");
                continue;
            }
        };

        let Some(id) = frame.get("id").and_then(Value::as_u64) else {
            // Server-initiated notification — nothing we track.
            debug!("indexer peer: ignoring notification frame");
            continue;
        };

        let Some(tx) = pending.lock().await.remove(&id) else {
            // Ack for a call that already timed out locally.
            debug!(id, "indexer peer: ack for unknown request id");
            continue;
        };

        let outcome = match frame.get("error") {
            Some(err) if !err.is_null() => Err(PeerError::Rpc(err.to_string())),
            _ => Ok(frame.get("result").cloned().unwrap_or(Value::Null)),
        };
        let _ = tx.send(outcome);
    }
}

/// Drain the outbound channel and send each frame to the peer WebSocket.
async fn handle_outbound(
    rx: &mut mpsc::Receiver<String>,
    sink: &mut (impl SinkExt<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin),
) {
    while let Some(msg) = rx.recv().await {
        if sink.send(Message::Text(msg)).await.is_err() {
            break;
        }
    }
}

/// Fail every in-flight request after a disconnect. Dropping the senders
/// resolves each waiter with `NotConnected`.
async fn fail_pending(pending: &PendingMap) {
    let mut map = pending.lock().await;
    if !map.is_empty() {
        warn!(count = map.len(), "indexer peer: failing in-flight requests");
        map.clear();
    }
}

async fn sleep_backoff(backoff_secs: &mut u64) {
    info!("indexer peer: reconnecting in {}s", *backoff_secs);
    tokio::time::sleep(std::time::Duration::from_secs(*backoff_secs)).await;
    *backoff_secs = (*backoff_secs * 2).min(60);
}
