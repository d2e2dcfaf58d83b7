//! Crate-wide error type tagged with a failure kind.
//!
//! Every error that crosses a public API boundary carries one of the kinds
//! in [`ErrorKind`], a human-readable message and, optionally, the underlying
//! cause. The display form is `"[KIND] message"` or `"[KIND] message: cause"`
//! so a log line always states which subsystem rejected the operation.
//!
//! Protocol-level errors keep their own precise enums
//! ([`crate::protocol::ParseError`], [`crate::protocol::SendError`]) and are
//! converted into this type at the API boundary.

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;
use std::io;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

type Cause = Box<dyn StdError + Send + Sync>;

/// The closed set of failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Transport-level failures: dial, accept, closed connections.
    Network,
    /// Wire-format violations: framing and grammar errors.
    Protocol,
    /// Server misuse: double start, missing handler.
    Server,
    /// Client misuse.
    Client,
    /// Underlying I/O failures that carry no transport meaning.
    Io,
    /// Deadlines and timeouts.
    Timeout,
    /// Invalid arguments supplied by the caller.
    InvalidInput,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Network => "NETWORK",
            ErrorKind::Protocol => "PROTOCOL",
            ErrorKind::Server => "SERVER",
            ErrorKind::Client => "CLIENT",
            ErrorKind::Io => "IO",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::InvalidInput => "INVALID_INPUT",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error with a kind, a message and an optional chained cause.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Cow<'static, str>,
    cause: Option<Cause>,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self { kind, message: message.into(), cause: None }
    }

    pub fn with_cause(
        kind: ErrorKind,
        message: impl Into<Cow<'static, str>>,
        cause: impl Into<Cause>,
    ) -> Self {
        Self { kind, message: message.into(), cause: Some(cause.into()) }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == ErrorKind::Timeout
    }

    pub fn network(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    pub fn network_with(message: impl Into<Cow<'static, str>>, cause: impl Into<Cause>) -> Self {
        Self::with_cause(ErrorKind::Network, message, cause)
    }

    pub fn protocol(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Protocol, message)
    }

    pub fn protocol_with(message: impl Into<Cow<'static, str>>, cause: impl Into<Cause>) -> Self {
        Self::with_cause(ErrorKind::Protocol, message, cause)
    }

    pub fn server(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Server, message)
    }

    pub fn client(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Client, message)
    }

    pub fn io(message: impl Into<Cow<'static, str>>, cause: impl Into<Cause>) -> Self {
        Self::with_cause(ErrorKind::Io, message, cause)
    }

    pub fn timeout(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn invalid_input(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "[{}] {}: {}", self.kind, self.message, cause),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause.as_ref().map(|cause| cause.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
                Error::with_cause(ErrorKind::Timeout, "operation timed out", e)
            }
            _ => Error::with_cause(ErrorKind::Io, "io error", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_without_cause() {
        let err = Error::network("connection is closed");
        assert_eq!(err.to_string(), "[NETWORK] connection is closed");
    }

    #[test]
    fn display_with_cause() {
        let cause = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        let err = Error::network_with("dial failed", cause);
        assert_eq!(err.to_string(), "[NETWORK] dial failed: refused");
        assert!(err.source().is_some());
    }

    #[test]
    fn kind_strings() {
        assert_eq!(ErrorKind::InvalidInput.as_str(), "INVALID_INPUT");
        assert_eq!(ErrorKind::Timeout.as_str(), "TIMEOUT");
    }

    #[test]
    fn io_timeout_maps_to_timeout_kind() {
        let err = Error::from(io::Error::new(io::ErrorKind::TimedOut, "slow"));
        assert_eq!(err.kind(), ErrorKind::Timeout);

        let err = Error::from(io::Error::new(io::ErrorKind::BrokenPipe, "pipe"));
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
