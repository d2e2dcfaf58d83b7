//! Error types for HTTP message parsing and serialization.
//!
//! [`ParseError`] covers every way incoming bytes can be rejected; the codec
//! never panics on malformed input. [`SendError`] covers serialization-side
//! failures. Both convert into the crate-wide [`crate::Error`] at the API
//! boundary, where parse errors surface with the `Protocol` kind (timeouts
//! with `Timeout`).

use std::io;
use thiserror::Error;

use crate::error::{Error as TinyError, ErrorKind};

/// Errors that occur while parsing an HTTP request or response.
///
/// The display strings are part of the crate contract: callers match on them
/// to decide between `400`, `413` and `431` replies.
#[derive(Error, Debug)]
pub enum ParseError {
    /// Request line does not have the `METHOD SP TARGET SP VERSION` shape
    #[error("invalid HTTP request line")]
    InvalidRequestLine,

    /// Method is outside the supported closed set
    #[error("invalid HTTP method")]
    InvalidMethod,

    /// Request target is empty, relative, or contains control characters
    #[error("invalid request path")]
    InvalidPath,

    /// Version token is well-formed but not HTTP/1.0 or HTTP/1.1
    #[error("invalid HTTP version")]
    InvalidVersion,

    /// Header line is missing a colon or the name violates the grammar
    #[error("invalid header format")]
    InvalidHeader,

    /// Status code is not a number in [100, 600)
    #[error("invalid status code")]
    InvalidStatusCode,

    /// Content-Length is not a valid non-negative decimal, exceeds the
    /// configured body limit, or contradicts the actual body
    #[error("invalid content length: {reason}")]
    InvalidContentLength { reason: String },

    /// Request line exceeds its size limit
    #[error("request too large")]
    RequestTooLarge,

    /// A header line, the header count, or the total head size exceeds a limit
    #[error("header too large")]
    HeaderTooLarge,

    /// Malformed chunk size, oversized chunk, or broken chunk framing
    #[error("invalid chunked encoding")]
    ChunkedEncodingInvalid,

    /// The stream ended before the framed message was complete
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// Parsing did not finish within the allotted time
    #[error("parsing timeout")]
    Timeout,

    /// I/O failure while reading the message
    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    /// Creates a new InvalidContentLength error
    pub fn invalid_content_length<S: ToString>(reason: S) -> Self {
        Self::InvalidContentLength { reason: reason.to_string() }
    }
}

/// Errors that occur while serializing an HTTP message.
#[derive(Error, Debug)]
pub enum SendError {
    /// The message body cannot be written as framed
    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    /// I/O failure while writing the message
    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    /// Creates a new InvalidBody error
    pub fn invalid_body<S: ToString>(reason: S) -> Self {
        Self::InvalidBody { reason: reason.to_string() }
    }
}

impl From<ParseError> for TinyError {
    fn from(e: ParseError) -> Self {
        let kind = match &e {
            ParseError::Timeout => ErrorKind::Timeout,
            ParseError::Io { .. } => ErrorKind::Io,
            _ => ErrorKind::Protocol,
        };
        TinyError::new(kind, e.to_string())
    }
}

impl From<SendError> for TinyError {
    fn from(e: SendError) -> Self {
        let kind = match &e {
            SendError::Io { .. } => ErrorKind::Io,
            _ => ErrorKind::Protocol,
        };
        TinyError::new(kind, e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_messages() {
        assert_eq!(ParseError::InvalidRequestLine.to_string(), "invalid HTTP request line");
        assert_eq!(ParseError::InvalidMethod.to_string(), "invalid HTTP method");
        assert_eq!(ParseError::ChunkedEncodingInvalid.to_string(), "invalid chunked encoding");
        assert_eq!(ParseError::UnexpectedEof.to_string(), "unexpected end of input");
    }

    #[test]
    fn parse_error_maps_to_protocol_kind() {
        let err = TinyError::from(ParseError::InvalidHeader);
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert_eq!(err.to_string(), "[PROTOCOL] invalid header format");
    }

    #[test]
    fn parse_timeout_maps_to_timeout_kind() {
        let err = TinyError::from(ParseError::Timeout);
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(err.to_string(), "[TIMEOUT] parsing timeout");
    }
}
