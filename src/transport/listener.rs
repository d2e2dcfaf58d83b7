//! TCP listener with an accept loop that shutdown can always unblock.
//!
//! A dedicated task accepts under a short poll timeout, re-checking the
//! closed flag between polls — the portable way to unblock a pending accept
//! without tearing down the socket underneath it. Accepted connections (or
//! accept errors) travel through a one-slot hand-off channel that the
//! foreground [`Listener::accept`] races against the shutdown token, so
//! accept order is preserved and close never deadlocks.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::sync::{mpsc, Mutex};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::transport::connection::{configure_stream, default_keepalive_interval, Connection};

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_secs(1);

const ERR_LISTENER_CLOSED: &str = "listener is closed";

struct Shared {
    closed: AtomicBool,
    shutdown: CancellationToken,
}

/// The server-side endpoint producing incoming connections.
pub struct Listener {
    shared: Arc<Shared>,
    accept_rx: Mutex<mpsc::Receiver<Result<Connection>>>,
    local_addr: SocketAddr,
}

impl Listener {
    /// Binds to `addr` and starts the accept task.
    pub async fn bind(addr: impl ToSocketAddrs) -> Result<Listener> {
        let tcp_listener = TcpListener::bind(addr)
            .await
            .map_err(|e| Error::network_with("failed to create listener", e))?;
        let local_addr = tcp_listener
            .local_addr()
            .map_err(|e| Error::network_with("failed to query listener address", e))?;

        let shared =
            Arc::new(Shared { closed: AtomicBool::new(false), shutdown: CancellationToken::new() });
        let (accept_tx, accept_rx) = mpsc::channel(1);

        tokio::spawn(accept_loop(tcp_listener, accept_tx, Arc::clone(&shared)));

        Ok(Listener { shared, accept_rx: Mutex::new(accept_rx), local_addr })
    }

    /// Waits for the next connection, in accept order.
    ///
    /// Fails with `"listener is closed"` once [`Listener::close`] has been
    /// called, including for callers already blocked here.
    pub async fn accept(&self) -> Result<Connection> {
        if self.is_closed() {
            return Err(Error::network(ERR_LISTENER_CLOSED));
        }

        let mut accept_rx = self.accept_rx.lock().await;
        tokio::select! {
            _ = self.shared.shutdown.cancelled() => Err(Error::network(ERR_LISTENER_CLOSED)),
            handed_off = accept_rx.recv() => match handed_off {
                Some(result) => result,
                None => Err(Error::network(ERR_LISTENER_CLOSED)),
            },
        }
    }

    /// Closes the listener. Idempotent; pending accepts observe the close.
    pub fn close(&self) -> Result<()> {
        if self.shared.closed.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_err()
        {
            return Ok(());
        }

        info!("closing listener on {}", self.local_addr);
        self.shared.shutdown.cancel();
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        // stop the accept task even when close was never called
        self.shared.shutdown.cancel();
    }
}

async fn accept_loop(
    tcp_listener: TcpListener,
    accept_tx: mpsc::Sender<Result<Connection>>,
    shared: Arc<Shared>,
) {
    loop {
        if shared.closed.load(Ordering::Acquire) {
            return;
        }

        let accepted = tokio::select! {
            _ = shared.shutdown.cancelled() => return,
            accepted = timeout(ACCEPT_POLL_INTERVAL, tcp_listener.accept()) => accepted,
        };

        let result = match accepted {
            // poll timeout: go around and re-check the closed flag
            Err(_) => continue,
            Ok(Ok((stream, peer_addr))) => {
                configure_stream(&stream, default_keepalive_interval());
                debug!(peer = %peer_addr, "accepted connection");
                Connection::new(stream)
            }
            Ok(Err(e)) => Err(Error::network_with("accept failed", e)),
        };

        tokio::select! {
            _ = shared.shutdown.cancelled() => return,
            sent = accept_tx.send(result) => {
                if sent.is_err() {
                    return;
                }
            }
        }
    }
}
