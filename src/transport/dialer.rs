//! Outbound connections.

use std::time::Duration;

use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::time::timeout;
use tracing::debug;

use crate::error::{Error, Result};
use crate::transport::connection::{configure_stream, Connection};

/// Applied by [`Dialer::dial`] when no explicit timeout is given.
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(30);

/// Keep-alive probe interval applied to dialed connections.
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(15);

/// Produces configured outbound [`Connection`]s.
#[derive(Debug, Clone)]
pub struct Dialer {
    dial_timeout: Duration,
    keep_alive: Duration,
}

impl Dialer {
    pub fn new() -> Self {
        Self { dial_timeout: DEFAULT_DIAL_TIMEOUT, keep_alive: DEFAULT_KEEP_ALIVE }
    }

    pub fn with_timeout(dial_timeout: Duration) -> Self {
        Self { dial_timeout, ..Self::new() }
    }

    /// Connects under the dialer's default timeout.
    pub async fn dial(&self, addr: impl ToSocketAddrs) -> Result<Connection> {
        self.dial_timeout(addr, self.dial_timeout).await
    }

    /// Connects under an explicit timeout and applies the socket tuning.
    pub async fn dial_timeout(
        &self,
        addr: impl ToSocketAddrs,
        dial_timeout: Duration,
    ) -> Result<Connection> {
        let stream = match timeout(dial_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(Error::network_with("dial failed", e)),
            Err(_) => return Err(Error::timeout("dial timed out")),
        };

        configure_stream(&stream, self.keep_alive);

        let connection = Connection::new(stream)?;
        debug!(peer = %connection.peer_addr(), "connected");
        Ok(connection)
    }
}

impl Default for Dialer {
    fn default() -> Self {
        Self::new()
    }
}
