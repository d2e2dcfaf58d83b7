//! Connection wrapper: deadline-guarded I/O, buffered line helpers, and
//! delimiter-framed messaging.
//!
//! Reads and writes run under independent locks so one task can read while
//! another writes. Close flips a monotonic flag and cancels a token that
//! every blocked operation races against, so in-flight I/O observes the
//! close instead of deadlocking it; once both directions are quiet the
//! buffered writer is flushed and the socket shut down.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use socket2::{SockRef, TcpKeepalive};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::{timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Read deadline applied by [`Connection::read_line`] before each call.
pub const LINE_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Write deadline applied by [`Connection::write_line`] before each call.
pub const LINE_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default deadline for framed message reads and writes.
pub const MESSAGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Hard cap on a single framed message.
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

const READ_BUFFER_SIZE: usize = 8 * 1024;
const WRITE_BUFFER_SIZE: usize = 8 * 1024;
const MESSAGE_READ_CHUNK_SIZE: usize = 1024;

const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(15);
const SOCKET_BUFFER_SIZE: usize = 64 * 1024;

const ERR_CLOSED: &str = "connection is closed";

/// A bidirectional byte stream over TCP.
#[derive(Debug)]
pub struct Connection {
    reader: Mutex<BufReader<OwnedReadHalf>>,
    writer: Mutex<BufWriter<OwnedWriteHalf>>,
    local_addr: SocketAddr,
    peer_addr: SocketAddr,
    closed: AtomicBool,
    cancel: CancellationToken,
    read_deadline: StdMutex<Option<Instant>>,
    write_deadline: StdMutex<Option<Instant>>,
}

impl Connection {
    /// Wraps an established stream. The stream's socket options are the
    /// caller's business; the listener and dialer apply
    /// [`configure_stream`] before calling this.
    pub fn new(stream: TcpStream) -> Result<Self> {
        let local_addr =
            stream.local_addr().map_err(|e| Error::network_with("failed to query local address", e))?;
        let peer_addr =
            stream.peer_addr().map_err(|e| Error::network_with("failed to query peer address", e))?;

        let (read_half, write_half) = stream.into_split();

        Ok(Self {
            reader: Mutex::new(BufReader::with_capacity(READ_BUFFER_SIZE, read_half)),
            writer: Mutex::new(BufWriter::with_capacity(WRITE_BUFFER_SIZE, write_half)),
            local_addr,
            peer_addr,
            closed: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            read_deadline: StdMutex::new(None),
            write_deadline: StdMutex::new(None),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Sets both the read and the write deadline.
    pub fn set_deadline(&self, deadline: Instant) {
        self.set_read_deadline(deadline);
        self.set_write_deadline(deadline);
    }

    /// Sets the absolute time after which pending and future reads fail
    /// with a timeout. A deadline in the past fails the next read.
    pub fn set_read_deadline(&self, deadline: Instant) {
        *self.read_deadline.lock().unwrap() = Some(deadline);
    }

    /// Write-side counterpart of [`Connection::set_read_deadline`].
    pub fn set_write_deadline(&self, deadline: Instant) {
        *self.write_deadline.lock().unwrap() = Some(deadline);
    }

    /// Reads up to `buf.len()` bytes. Returns 0 at end of stream.
    pub async fn read(&self, buf: &mut [u8]) -> Result<usize> {
        self.check_open()?;
        let deadline = *self.read_deadline.lock().unwrap();
        self.run_io(deadline, "failed to read from connection", async {
            let mut reader = self.reader.lock().await;
            reader.read(buf).await
        })
        .await
    }

    /// Writes the whole buffer and flushes it to the socket.
    pub async fn write(&self, buf: &[u8]) -> Result<usize> {
        self.check_open()?;
        let deadline = *self.write_deadline.lock().unwrap();
        self.run_io(deadline, "failed to write to connection", async {
            let mut writer = self.writer.lock().await;
            writer.write_all(buf).await?;
            writer.flush().await?;
            Ok(buf.len())
        })
        .await
    }

    /// Reads a line terminated by `\n`, stripping the terminator and a
    /// preceding `\r`. Applies a fresh [`LINE_READ_TIMEOUT`] deadline.
    pub async fn read_line(&self) -> Result<Vec<u8>> {
        self.check_open()?;
        self.set_read_deadline(Instant::now() + LINE_READ_TIMEOUT);
        let deadline = *self.read_deadline.lock().unwrap();

        self.run_io(deadline, "failed to read line", async {
            let mut reader = self.reader.lock().await;
            let mut line = Vec::new();
            let n = reader.read_until(b'\n', &mut line).await?;
            if n == 0 || line.last() != Some(&b'\n') {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stream ended mid-line"));
            }
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            Ok(line)
        })
        .await
    }

    /// Writes `data` followed by `\r\n` and flushes. Applies a fresh
    /// [`LINE_WRITE_TIMEOUT`] deadline.
    pub async fn write_line(&self, data: &[u8]) -> Result<()> {
        self.check_open()?;
        self.set_write_deadline(Instant::now() + LINE_WRITE_TIMEOUT);
        let deadline = *self.write_deadline.lock().unwrap();

        self.run_io(deadline, "failed to write line", async {
            let mut writer = self.writer.lock().await;
            writer.write_all(data).await?;
            writer.write_all(b"\r\n").await?;
            writer.flush().await
        })
        .await
    }

    /// Flushes the buffered writer.
    pub async fn flush(&self) -> Result<()> {
        self.check_open()?;
        let deadline = *self.write_deadline.lock().unwrap();
        self.run_io(deadline, "failed to flush connection", async {
            self.writer.lock().await.flush().await
        })
        .await
    }

    /// Closes the connection: flips the flag, unblocks in-flight I/O,
    /// flushes buffered output and shuts the socket down. Idempotent.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.cancel.cancel();

        let mut writer = self.writer.lock().await;
        if let Err(e) = writer.flush().await {
            warn!(peer = %self.peer_addr, "failed to flush writer during close: {e}");
        }
        if let Err(e) = writer.get_mut().shutdown().await {
            debug!(peer = %self.peer_addr, "socket shutdown failed: {e}");
        }
        Ok(())
    }

    fn check_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::network(ERR_CLOSED));
        }
        Ok(())
    }

    /// Runs one I/O operation under the deadline, racing the close token.
    async fn run_io<T>(
        &self,
        deadline: Option<Instant>,
        context: &'static str,
        io: impl Future<Output = io::Result<T>>,
    ) -> Result<T> {
        if let Some(d) = deadline {
            if d <= Instant::now() {
                return Err(Error::timeout("deadline exceeded"));
            }
        }

        let guarded = async {
            let result = match deadline {
                Some(d) => match timeout_at(d, io).await {
                    Ok(result) => result,
                    Err(_) => return Err(Error::timeout("deadline exceeded")),
                },
                None => io.await,
            };
            result.map_err(|e| match e.kind() {
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
                    Error::timeout("deadline exceeded")
                }
                _ => Error::network_with(context, e),
            })
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::network(ERR_CLOSED)),
            result = guarded => result,
        }
    }
}

/// Applies the socket tuning used for every accepted and dialed stream:
/// Nagle off, keep-alive probes, 64 KiB kernel buffers. Failures are logged
/// and tolerated.
pub(crate) fn configure_stream(stream: &TcpStream, keepalive_interval: Duration) {
    if let Err(e) = stream.set_nodelay(true) {
        warn!("failed to set TCP_NODELAY: {e}");
    }

    let sock = SockRef::from(stream);
    let keepalive =
        TcpKeepalive::new().with_time(keepalive_interval).with_interval(keepalive_interval);
    if let Err(e) = sock.set_tcp_keepalive(&keepalive) {
        warn!("failed to enable keep-alive: {e}");
    }
    if let Err(e) = sock.set_recv_buffer_size(SOCKET_BUFFER_SIZE) {
        warn!("failed to set receive buffer size: {e}");
    }
    if let Err(e) = sock.set_send_buffer_size(SOCKET_BUFFER_SIZE) {
        warn!("failed to set send buffer size: {e}");
    }
}

pub(crate) fn default_keepalive_interval() -> Duration {
    KEEPALIVE_INTERVAL
}

/// Delimiter-framed messaging over a [`Connection`].
///
/// Bytes read past a delimiter are kept in a residual buffer and served by
/// the next call, so back-to-back messages arriving in one segment are not
/// lost.
pub struct MessageConnection {
    conn: Connection,
    delimiter: Vec<u8>,
    residual: BytesMut,
}

impl MessageConnection {
    pub fn new(conn: Connection) -> Self {
        Self { conn, delimiter: b"\n".to_vec(), residual: BytesMut::new() }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn into_inner(self) -> Connection {
        self.conn
    }

    /// Replaces the message delimiter (default `\n`).
    pub fn set_delimiter(&mut self, delimiter: impl Into<Vec<u8>>) {
        self.delimiter = delimiter.into();
    }

    /// Reads one message under the default [`MESSAGE_TIMEOUT`].
    pub async fn read_message(&mut self) -> Result<Vec<u8>> {
        self.read_message_timeout(MESSAGE_TIMEOUT).await
    }

    /// Reads bytes until the delimiter, the 1 MiB cap, or end of stream.
    /// A partial message is returned when the peer closes mid-message.
    pub async fn read_message_timeout(&mut self, timeout: Duration) -> Result<Vec<u8>> {
        self.conn.set_read_deadline(Instant::now() + timeout);

        let mut chunk = [0u8; MESSAGE_READ_CHUNK_SIZE];
        loop {
            if let Some(index) = find_delimiter(&self.residual, &self.delimiter) {
                let message = self.residual.split_to(index).to_vec();
                self.residual.advance(self.delimiter.len());
                return Ok(message);
            }

            if self.residual.len() > MAX_MESSAGE_SIZE {
                return Err(Error::protocol("message too large"));
            }

            let n = self.conn.read(&mut chunk).await?;
            if n == 0 {
                if !self.residual.is_empty() {
                    // peer closed mid-message: hand over what arrived
                    return Ok(self.residual.split().to_vec());
                }
                return Err(Error::network("failed to read message chunk"));
            }
            self.residual.extend_from_slice(&chunk[..n]);
        }
    }

    /// Writes one message under the default [`MESSAGE_TIMEOUT`].
    pub async fn write_message(&self, data: &[u8]) -> Result<()> {
        self.write_message_timeout(data, MESSAGE_TIMEOUT).await
    }

    /// Writes `data` followed by the delimiter.
    pub async fn write_message_timeout(&self, data: &[u8], timeout: Duration) -> Result<()> {
        self.conn.set_write_deadline(Instant::now() + timeout);
        self.conn.write(data).await?;
        self.conn.write(&self.delimiter).await?;
        Ok(())
    }
}

fn find_delimiter(buffer: &[u8], delimiter: &[u8]) -> Option<usize> {
    if delimiter.is_empty() || buffer.len() < delimiter.len() {
        return None;
    }
    buffer.windows(delimiter.len()).position(|window| window == delimiter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiter_search() {
        assert_eq!(find_delimiter(b"abc\ndef", b"\n"), Some(3));
        assert_eq!(find_delimiter(b"abcdef", b"\n"), None);
        assert_eq!(find_delimiter(b"ab::cd", b"::"), Some(2));
        assert_eq!(find_delimiter(b"", b"\n"), None);
        assert_eq!(find_delimiter(b"abc", b""), None);
    }
}
