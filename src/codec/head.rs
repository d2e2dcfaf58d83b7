//! Message-head parsing: request line, status line, header block.
//!
//! The head is everything before the `\r\n\r\n` terminator, which is
//! required exactly — a bare `\n\n` never terminates a message. Lines inside
//! the head are separated by `\r\n`.

use std::str::FromStr;

use crate::ensure;
use crate::protocol::header::{self, is_valid_header_name};
use crate::protocol::{
    HeaderMap, Method, ParseError, PayloadSize, Request, Response, StatusCode, Version,
};

/// Maximum length of the request line in bytes.
pub const MAX_REQUEST_LINE_LENGTH: usize = 2048;

/// Maximum length of a single header line in bytes.
pub const MAX_HEADER_LINE_LENGTH: usize = 4096;

/// Maximum number of header lines per message.
pub const MAX_HEADER_LINES: usize = 100;

/// Default cap on the whole head (request/status line plus headers).
pub const DEFAULT_MAX_HEAD_SIZE: usize = 1024 * 1024;

/// Default cap on a message body.
pub const DEFAULT_MAX_BODY_SIZE: u64 = 10 * 1024 * 1024;

/// Size limits applied while parsing; see [`crate::parser::Parser`] for the
/// configurable surface.
#[derive(Debug, Clone, Copy)]
pub struct ParseLimits {
    pub max_head_size: usize,
    pub max_body_size: u64,
}

impl Default for ParseLimits {
    fn default() -> Self {
        Self { max_head_size: DEFAULT_MAX_HEAD_SIZE, max_body_size: DEFAULT_MAX_BODY_SIZE }
    }
}

/// Returns the offset of the `\r\n\r\n` head terminator, if present.
pub(crate) fn find_head_end(src: &[u8]) -> Option<usize> {
    src.windows(4).position(|window| window == b"\r\n\r\n")
}

/// Parses a request head (everything before the terminator).
pub(crate) fn parse_request_head(
    head: &[u8],
    limits: ParseLimits,
) -> Result<(Request, PayloadSize), ParseError> {
    let head = std::str::from_utf8(head).map_err(|_| ParseError::InvalidHeader)?;
    let mut lines = head.split("\r\n");

    let request_line = lines.next().ok_or(ParseError::InvalidRequestLine)?;
    let (method, target, version) = parse_request_line(request_line)?;

    let headers = parse_header_lines(lines)?;
    let payload_size = payload_size_for(&headers, limits)?;

    let mut request = Request::new(method, target, version);
    *request.headers_mut() = headers;

    Ok((request, payload_size))
}

/// Parses a response head (status line plus headers).
pub(crate) fn parse_response_head(
    head: &[u8],
    limits: ParseLimits,
) -> Result<(Response, PayloadSize), ParseError> {
    let head = std::str::from_utf8(head).map_err(|_| ParseError::InvalidHeader)?;
    let mut lines = head.split("\r\n");

    let status_line = lines.next().ok_or(ParseError::InvalidStatusCode)?;
    let (version, status) = parse_status_line(status_line)?;

    let headers = parse_header_lines(lines)?;
    let payload_size = payload_size_for(&headers, limits)?;

    let mut response = Response::new(status, version);
    *response.headers_mut() = headers;

    Ok((response, payload_size))
}

/// Splits `METHOD SP REQUEST-TARGET SP HTTP-VERSION` into validated parts.
///
/// A third token that does not even begin with `HTTP/` malforms the line
/// itself; a well-formed but unsupported version is its own error.
fn parse_request_line(line: &str) -> Result<(Method, String, Version), ParseError> {
    ensure!(!line.is_empty(), ParseError::InvalidRequestLine);
    ensure!(line.len() <= MAX_REQUEST_LINE_LENGTH, ParseError::RequestTooLarge);

    let mut parts = line.splitn(3, ' ');
    let method = parts.next().ok_or(ParseError::InvalidRequestLine)?;
    let target = parts.next().ok_or(ParseError::InvalidRequestLine)?;
    let version = parts.next().ok_or(ParseError::InvalidRequestLine)?;
    ensure!(!method.is_empty() && !target.is_empty(), ParseError::InvalidRequestLine);

    let method = Method::from_str(method)?;

    ensure!(is_valid_target(target), ParseError::InvalidPath);

    ensure!(version.starts_with("HTTP/"), ParseError::InvalidRequestLine);
    let version = Version::from_str(version)?;

    Ok((method, target.to_owned(), version))
}

/// Splits `HTTP-VERSION SP STATUS-CODE [SP REASON-PHRASE]`; the reason
/// phrase is ignored because serialization regenerates the standard one.
fn parse_status_line(line: &str) -> Result<(Version, StatusCode), ParseError> {
    ensure!(!line.is_empty(), ParseError::InvalidStatusCode);

    let mut parts = line.splitn(3, ' ');
    let version = parts.next().ok_or(ParseError::InvalidStatusCode)?;
    let code = parts.next().ok_or(ParseError::InvalidStatusCode)?;

    let version = Version::from_str(version)?;
    let code = code.parse::<u16>().map_err(|_| ParseError::InvalidStatusCode)?;
    let status = StatusCode::new(code)?;

    Ok((version, status))
}

fn parse_header_lines<'a>(
    lines: impl Iterator<Item = &'a str>,
) -> Result<HeaderMap, ParseError> {
    let mut headers = HeaderMap::new();

    for (count, line) in lines.enumerate() {
        ensure!(count < MAX_HEADER_LINES, ParseError::HeaderTooLarge);
        ensure!(line.len() <= MAX_HEADER_LINE_LENGTH, ParseError::HeaderTooLarge);

        let (name, value) = line.split_once(':').ok_or(ParseError::InvalidHeader)?;
        let name = name.trim();
        let value = value.trim();
        ensure!(is_valid_header_name(name), ParseError::InvalidHeader);

        headers.append(name, value);
    }

    Ok(headers)
}

/// Derives the body framing from the headers.
///
/// `Transfer-Encoding` and `Content-Length` together are rejected; a
/// transfer encoding whose final coding is not `chunked` leaves the body
/// unframed and therefore empty.
fn payload_size_for(headers: &HeaderMap, limits: ParseLimits) -> Result<PayloadSize, ParseError> {
    // Transfer-Encoding may arrive as one comma-joined value or as repeated
    // header lines; all values count.
    let transfer_encodings = headers.get_all(header::TRANSFER_ENCODING);
    let content_length = headers.get(header::CONTENT_LENGTH);

    match (transfer_encodings.is_empty(), content_length) {
        (true, None) => Ok(PayloadSize::Empty),

        (false, None) => {
            if is_chunked(transfer_encodings) {
                Ok(PayloadSize::Chunked)
            } else {
                Ok(PayloadSize::Empty)
            }
        }

        (true, Some(value)) => {
            let value = value.trim();
            let length = parse_content_length(value)?;
            ensure!(
                length <= limits.max_body_size,
                ParseError::invalid_content_length(format!(
                    "declared length {length} exceeds the limit {}",
                    limits.max_body_size
                ))
            );
            if length == 0 {
                Ok(PayloadSize::Empty)
            } else {
                Ok(PayloadSize::Length(length))
            }
        }

        (false, Some(_)) => Err(ParseError::invalid_content_length(
            "transfer-encoding and content-length both present",
        )),
    }
}

/// `Content-Length` must be a plain non-negative decimal: no sign, no
/// whitespace inside, no hex.
fn parse_content_length(value: &str) -> Result<u64, ParseError> {
    ensure!(
        !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()),
        ParseError::invalid_content_length(format!("value {value:?} is not a non-negative decimal"))
    );
    value
        .parse::<u64>()
        .map_err(|_| ParseError::invalid_content_length(format!("value {value:?} overflows")))
}

/// Chunked framing applies when `chunked` is the final encoding, across
/// however many `Transfer-Encoding` values the message carried.
fn is_chunked(encodings: &[String]) -> bool {
    encodings
        .last()
        .and_then(|value| value.rsplit(',').next())
        .map(|last| last.trim() == "chunked")
        .unwrap_or(false)
}

/// The request target must be absolute and free of control characters.
fn is_valid_target(target: &str) -> bool {
    target.starts_with('/') && !target.chars().any(|c| (c as u32) < 32 || c as u32 == 127)
}
