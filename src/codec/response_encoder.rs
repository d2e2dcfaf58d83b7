//! Bit-exact serialization of responses.
//!
//! The status line is `VERSION SP CODE SP REASON CRLF` where the reason is
//! always the standard phrase for the code (`"Unknown Status Code"` outside
//! the registered set). Chunked output is never produced; responses carry an
//! explicit `Content-Length`.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::Encoder;

use crate::codec::request_encoder::write_headers;
use crate::protocol::{Response, SendError};

/// Serializes a response to a standalone buffer.
pub fn encode_response(response: &Response) -> Bytes {
    let mut dst = BytesMut::with_capacity(256 + response.body().len());
    write_response(response, &mut dst);
    dst.freeze()
}

pub(crate) fn write_response(response: &Response, dst: &mut BytesMut) {
    let status = response.status();
    dst.extend_from_slice(response.version().as_str().as_bytes());
    dst.extend_from_slice(b" ");
    dst.extend_from_slice(status.as_u16().to_string().as_bytes());
    dst.extend_from_slice(b" ");
    dst.extend_from_slice(status.reason().as_bytes());
    dst.extend_from_slice(b"\r\n");

    write_headers(response.headers(), dst);

    dst.extend_from_slice(b"\r\n");
    dst.extend_from_slice(response.body());
}

/// `tokio_util` encoder wrapper for framed writers.
#[derive(Debug, Default)]
pub struct ResponseEncoder;

impl Encoder<Response> for ResponseEncoder {
    type Error = SendError;

    fn encode(&mut self, item: Response, dst: &mut BytesMut) -> Result<(), Self::Error> {
        write_response(&item, dst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Response, StatusCode, Version};

    #[test]
    fn status_line_carries_standard_reason() {
        let response = Response::new(StatusCode::NOT_FOUND, Version::Http11);
        assert_eq!(encode_response(&response).as_ref(), b"HTTP/1.1 404 Not Found\r\n\r\n");
    }

    #[test]
    fn unknown_code_gets_fallback_reason() {
        let response = Response::new(StatusCode::new(599).unwrap(), Version::Http11);
        assert_eq!(
            encode_response(&response).as_ref(),
            b"HTTP/1.1 599 Unknown Status Code\r\n\r\n"
        );
    }

    #[test]
    fn full_response_round() {
        let response = Response::text(StatusCode::OK, "hi");
        let wire = encode_response(&response);
        assert_eq!(
            wire.as_ref(),
            b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 2\r\n\r\nhi"
        );
    }
}
