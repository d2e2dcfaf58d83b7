//! The accept-and-dispatch server.
//!
//! One worker task per accepted connection, tracked so that stop can drain
//! them. The lifecycle is a single-shot state machine:
//! `Created → Running → Stopped`. Stop signals shutdown, closes the
//! listener and waits for the workers with a bounded budget; workers that
//! outlive the budget are abandoned to the runtime.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::net::ToSocketAddrs;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::transport::{Connection, Listener};

/// How long [`Server::stop`] waits for outstanding workers.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Services exactly one connection for its lifetime.
///
/// The server closes the connection when the handler returns, normally or
/// early; handlers may block as long as they respect the connection's
/// deadlines.
pub trait ConnectionHandler: Send + Sync + 'static {
    fn handle(&self, conn: Arc<Connection>) -> BoxFuture<'static, ()>;
}

/// Adapts a closure (or async fn) into a [`ConnectionHandler`].
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(Arc<Connection>) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    HandlerFn { f }
}

pub struct HandlerFn<F> {
    f: F,
}

impl<F, Fut> ConnectionHandler for HandlerFn<F>
where
    F: Fn(Arc<Connection>) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    fn handle(&self, conn: Arc<Connection>) -> BoxFuture<'static, ()> {
        Box::pin((self.f)(conn))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Created,
    Running,
    Stopped,
}

/// Accepts connections and runs one worker task per connection.
pub struct Server {
    listener: Arc<Listener>,
    handler: StdMutex<Option<Arc<dyn ConnectionHandler>>>,
    state: StdMutex<State>,
    shutdown: CancellationToken,
    workers: TaskTracker,
}

impl Server {
    /// Binds the listening socket; the server stays in `Created` until
    /// [`Server::start`].
    pub async fn bind(addr: impl ToSocketAddrs) -> Result<Server> {
        let listener = Listener::bind(addr).await?;
        Ok(Server {
            listener: Arc::new(listener),
            handler: StdMutex::new(None),
            state: StdMutex::new(State::Created),
            shutdown: CancellationToken::new(),
            workers: TaskTracker::new(),
        })
    }

    pub fn set_handler(&self, handler: impl ConnectionHandler) {
        *self.handler.lock().unwrap() = Some(Arc::new(handler));
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    pub fn is_running(&self) -> bool {
        *self.state.lock().unwrap() == State::Running
    }

    /// Launches the accept task. Requires the `Created` state and a handler.
    pub fn start(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if *state != State::Created {
            return Err(Error::server("server is already running"));
        }

        let handler = self
            .handler
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| Error::server("no connection handler set"))?;

        *state = State::Running;
        info!("starting server on {}", self.local_addr());

        let listener = Arc::clone(&self.listener);
        let shutdown = self.shutdown.clone();
        let workers = self.workers.clone();
        self.workers.spawn(accept_loop(listener, handler, shutdown, workers));

        Ok(())
    }

    /// Stops a running server: signals shutdown, closes the listener and
    /// drains workers under [`SHUTDOWN_TIMEOUT`]. A warning is logged when
    /// the budget runs out; outstanding workers are abandoned. Calling stop
    /// in any other state is a no-op.
    pub async fn stop(&self) -> Result<()> {
        {
            let mut state = self.state.lock().unwrap();
            if *state != State::Running {
                return Ok(());
            }
            *state = State::Stopped;
        }

        info!("stopping server");
        self.shutdown.cancel();
        let _ = self.listener.close();

        self.workers.close();
        if timeout(SHUTDOWN_TIMEOUT, self.workers.wait()).await.is_err() {
            warn!("server shutdown timed out, abandoning outstanding workers");
        } else {
            info!("server stopped");
        }
        Ok(())
    }
}

async fn accept_loop(
    listener: Arc<Listener>,
    handler: Arc<dyn ConnectionHandler>,
    shutdown: CancellationToken,
    workers: TaskTracker,
) {
    loop {
        let accepted = tokio::select! {
            _ = shutdown.cancelled() => return,
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok(conn) => {
                let handler = Arc::clone(&handler);
                workers.spawn(handle_connection(conn, handler));
            }
            Err(e) => {
                if shutdown.is_cancelled() || listener.is_closed() {
                    return;
                }
                error!("accept error: {e}");
            }
        }
    }
}

async fn handle_connection(conn: Connection, handler: Arc<dyn ConnectionHandler>) {
    let peer = conn.peer_addr();
    info!(%peer, "handling connection");

    let conn = Arc::new(conn);
    handler.handle(Arc::clone(&conn)).await;

    if let Err(e) = conn.close().await {
        debug!(%peer, "close after handler failed: {e}");
    }
    info!(%peer, "connection closed");
}
