//! Listener and per-connection protocol loop.
//!
//! The accept loop spawns one task per client and never blocks on request
//! processing. Each connection task reads newline-delimited requests and
//! answers each with exactly one response line, flushed before the next
//! read: strict request/response alternation, no pipelining. A failed
//! request becomes an error envelope; only a dead stream ends the loop.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::{TcpListener, TcpStream};

use crate::{AppState, router};

/// Counts live connections for logging and release-on-disconnect.
#[derive(Debug, Default, Clone)]
pub struct ConnectionTracker {
    active: Arc<AtomicU64>,
}

impl ConnectionTracker {
    /// Register a connection. The returned guard unregisters on drop,
    /// including when the handler task panics or errors out.
    pub fn track(&self) -> ConnectionGuard {
        self.active.fetch_add(1, Ordering::SeqCst);
        ConnectionGuard {
            active: Arc::clone(&self.active),
        }
    }

    pub fn active_count(&self) -> u64 {
        self.active.load(Ordering::SeqCst)
    }
}

/// Guard for one tracked connection.
#[derive(Debug)]
pub struct ConnectionGuard {
    active: Arc<AtomicU64>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Pause after a failed accept so a persistent error condition (for
/// example, file descriptor exhaustion) does not spin the loop hot.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Accept connections forever, one handler task per client.
///
/// Accept failures are logged and the loop keeps going; a single bad
/// handshake must not take the listener down.
pub async fn run(listener: TcpListener, state: AppState) -> anyhow::Result<()> {
    let tracker = ConnectionTracker::default();
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(err) => {
                tracing::error!(error = %err, "failed to accept connection");
                tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                continue;
            }
        };

        let guard = tracker.track();
        tracing::info!(%peer, active = tracker.active_count(), "client connected");

        let state = state.clone();
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, peer, &state).await {
                tracing::debug!(%peer, error = %err, "connection ended with error");
            }
            drop(guard);
            tracing::info!(%peer, "client disconnected");
        });
    }
}

/// One client's request/response loop.
///
/// Returns when the peer closes the stream or an I/O error occurs. No lock
/// is held across the read await; all shared state lives behind the
/// session authority and the store.
async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    state: &AppState,
) -> std::io::Result<()> {
    let (read_half, write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();
    let mut writer = BufWriter::new(write_half);

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        tracing::debug!(%peer, request = %line, "request received");

        let response = router::handle_line(state, &line).await;
        let payload = response.to_line();
        tracing::debug!(%peer, response = %payload, "response sent");

        writer.write_all(payload.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }

    Ok(())
}
