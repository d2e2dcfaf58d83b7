//! Buffered message parsing and validation.
//!
//! The codec in [`crate::codec`] is incremental; this module is the
//! whole-message façade used by workers and clients: read the entire byte
//! stream, locate the head terminator, decode head and body, and hand back a
//! finished [`Request`] or [`Response`]. A timeout variant bounds how long a
//! parse may run, and an independent validation pass re-checks values that
//! were built in memory rather than parsed off the wire.

use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::codec::Decoder;

use crate::codec::{ParseLimits, RequestDecoder, ResponseDecoder};
use crate::ensure;
use crate::protocol::header::{self, is_valid_header_name};
use crate::protocol::{Message, ParseError, PayloadItem, Request, Response};

/// Applied when the caller does not pass an explicit parse timeout.
pub const DEFAULT_PARSE_TIMEOUT: Duration = Duration::from_secs(5);

// Chunk framing overhead tolerated on top of the head and body caps when
// slurping a stream.
const FRAMING_SLACK: usize = 16 * 1024;

/// HTTP message parser with configurable size limits.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    limits: ParseLimits,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps the head (request/status line plus headers). Default 1 MiB.
    pub fn set_max_header_size(&mut self, size: usize) {
        self.limits.max_head_size = size;
    }

    /// Caps the message body. Default 10 MiB.
    pub fn set_max_body_size(&mut self, size: u64) {
        self.limits.max_body_size = size;
    }

    /// Reads `reader` to end and parses a single request.
    pub async fn parse_request<R>(&self, reader: R) -> Result<Request, ParseError>
    where
        R: AsyncRead + Unpin,
    {
        let data = self.slurp(reader).await?;
        self.parse_request_bytes(&data)
    }

    /// Like [`Parser::parse_request`] but gives up after `timeout`.
    ///
    /// On expiry the parse is cancelled mid-stream; the reader position is
    /// undefined and the reader must not be reused.
    pub async fn parse_request_with_timeout<R>(
        &self,
        reader: R,
        timeout: Duration,
    ) -> Result<Request, ParseError>
    where
        R: AsyncRead + Unpin,
    {
        tokio::time::timeout(timeout, self.parse_request(reader))
            .await
            .map_err(|_| ParseError::Timeout)?
    }

    /// Parses a single request from a complete byte buffer.
    pub fn parse_request_bytes(&self, data: &[u8]) -> Result<Request, ParseError> {
        let mut decoder = RequestDecoder::with_limits(self.limits);
        let mut src = BytesMut::from(data);

        let mut request = match decoder.decode(&mut src)? {
            Some(Message::Head(request)) => request,
            // a buffer with no head terminator can never become a request
            _ => return Err(ParseError::InvalidRequestLine),
        };

        let body = self.collect_body(&mut decoder, &mut src)?;
        ensure_fully_consumed(&src)?;

        request.set_body(body.freeze());
        Ok(request)
    }

    /// Reads `reader` to end and parses a single response.
    pub async fn parse_response<R>(&self, reader: R) -> Result<Response, ParseError>
    where
        R: AsyncRead + Unpin,
    {
        let data = self.slurp(reader).await?;
        self.parse_response_bytes(&data)
    }

    /// Like [`Parser::parse_response`] but gives up after `timeout`.
    pub async fn parse_response_with_timeout<R>(
        &self,
        reader: R,
        timeout: Duration,
    ) -> Result<Response, ParseError>
    where
        R: AsyncRead + Unpin,
    {
        tokio::time::timeout(timeout, self.parse_response(reader))
            .await
            .map_err(|_| ParseError::Timeout)?
    }

    /// Parses a single response from a complete byte buffer.
    pub fn parse_response_bytes(&self, data: &[u8]) -> Result<Response, ParseError> {
        let mut decoder = ResponseDecoder::with_limits(self.limits);
        let mut src = BytesMut::from(data);

        let mut response = match decoder.decode(&mut src)? {
            Some(Message::Head(response)) => response,
            _ => return Err(ParseError::InvalidStatusCode),
        };

        let body = self.collect_body(&mut decoder, &mut src)?;
        ensure_fully_consumed(&src)?;

        response.set_body(body.freeze());
        Ok(response)
    }

    /// Re-runs the structural checks on a request built in memory.
    pub fn validate_request(&self, request: &Request) -> Result<(), ParseError> {
        let path = request.path();
        ensure!(
            path.starts_with('/') && !path.chars().any(|c| (c as u32) < 32 || c as u32 == 127),
            ParseError::InvalidPath
        );

        self.validate_headers(request.headers())?;
        self.validate_length(request.headers(), request.body().len() as u64)
    }

    /// Re-runs the structural checks on a response built in memory.
    pub fn validate_response(&self, response: &Response) -> Result<(), ParseError> {
        self.validate_headers(response.headers())?;

        let status = response.status();
        if status.body_forbidden() {
            let declared = response.headers().get(header::CONTENT_LENGTH);
            let length_ok = matches!(declared, None | Some("0"));
            ensure!(
                response.body().is_empty() && length_ok,
                ParseError::invalid_content_length(format!(
                    "status {status} must not carry a body"
                ))
            );
            return Ok(());
        }

        self.validate_length(response.headers(), response.body().len() as u64)
    }

    fn validate_headers(&self, headers: &crate::protocol::HeaderMap) -> Result<(), ParseError> {
        for name in headers.names() {
            ensure!(is_valid_header_name(name), ParseError::InvalidHeader);
        }
        Ok(())
    }

    fn validate_length(
        &self,
        headers: &crate::protocol::HeaderMap,
        body_len: u64,
    ) -> Result<(), ParseError> {
        match headers.get(header::CONTENT_LENGTH) {
            Some(value) => {
                let value = value.trim();
                ensure!(
                    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()),
                    ParseError::invalid_content_length(format!(
                        "value {value:?} is not a non-negative decimal"
                    ))
                );
                let declared: u64 = value
                    .parse()
                    .map_err(|_| ParseError::invalid_content_length("value overflows"))?;
                ensure!(
                    declared <= self.limits.max_body_size,
                    ParseError::invalid_content_length(format!(
                        "declared length {declared} exceeds the limit {}",
                        self.limits.max_body_size
                    ))
                );
                ensure!(
                    declared == body_len,
                    ParseError::invalid_content_length(format!(
                        "declared length {declared} does not match body of {body_len} bytes"
                    ))
                );
            }
            None => {
                let chunked = headers.contains(header::TRANSFER_ENCODING);
                ensure!(
                    body_len == 0 || chunked,
                    ParseError::invalid_content_length("body present without framing header")
                );
            }
        }
        Ok(())
    }

    fn collect_body<D>(&self, decoder: &mut D, src: &mut BytesMut) -> Result<BytesMut, ParseError>
    where
        D: Decoder<Error = ParseError>,
        D::Item: IntoPayloadItem,
    {
        let mut body = BytesMut::new();
        loop {
            match decoder.decode_eof(src)? {
                Some(message) => match message.into_item() {
                    PayloadItem::Chunk(chunk) => {
                        body.extend_from_slice(&chunk);
                        ensure!(
                            body.len() as u64 <= self.limits.max_body_size,
                            ParseError::RequestTooLarge
                        );
                    }
                    PayloadItem::Eof => return Ok(body),
                },
                None => return Err(ParseError::UnexpectedEof),
            }
        }
    }

    async fn slurp<R>(&self, mut reader: R) -> Result<Vec<u8>, ParseError>
    where
        R: AsyncRead + Unpin,
    {
        let cap = self
            .limits
            .max_head_size
            .saturating_add(self.limits.max_body_size as usize)
            .saturating_add(FRAMING_SLACK);

        let mut data = Vec::with_capacity(8 * 1024);
        let mut chunk = [0u8; 8 * 1024];
        loop {
            let n = reader.read(&mut chunk).await?;
            if n == 0 {
                return Ok(data);
            }
            data.extend_from_slice(&chunk[..n]);
            ensure!(data.len() <= cap, ParseError::RequestTooLarge);
        }
    }
}

/// A buffer holds exactly one message: bytes past the framed body mean the
/// framing was wrong (a `Content-Length` shorter than the payload, or a
/// body sent without any framing header), never silently droppable data.
fn ensure_fully_consumed(src: &BytesMut) -> Result<(), ParseError> {
    ensure!(
        src.is_empty(),
        ParseError::invalid_content_length(format!("{} bytes beyond the framed body", src.len()))
    );
    Ok(())
}

/// Lets [`Parser::collect_body`] treat request and response streams alike.
trait IntoPayloadItem {
    fn into_item(self) -> PayloadItem;
}

impl IntoPayloadItem for Message<Request> {
    fn into_item(self) -> PayloadItem {
        match self {
            Message::Payload(item) => item,
            // a second head cannot appear inside one message
            Message::Head(_) => PayloadItem::Eof,
        }
    }
}

impl IntoPayloadItem for Message<Response> {
    fn into_item(self) -> PayloadItem {
        match self {
            Message::Payload(item) => item,
            Message::Head(_) => PayloadItem::Eof,
        }
    }
}
