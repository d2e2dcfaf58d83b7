//! Bit-exact serialization of requests.
//!
//! Output is `METHOD SP PATH SP VERSION CRLF`, one `NAME ": " VALUE CRLF`
//! line per header value in insertion order, an empty line, then the body
//! verbatim.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::Encoder;

use crate::protocol::{Request, SendError};

/// Serializes a request to a standalone buffer.
pub fn encode_request(request: &Request) -> Bytes {
    let mut dst = BytesMut::with_capacity(256 + request.body().len());
    write_request(request, &mut dst);
    dst.freeze()
}

pub(crate) fn write_request(request: &Request, dst: &mut BytesMut) {
    dst.extend_from_slice(request.method().as_str().as_bytes());
    dst.extend_from_slice(b" ");
    dst.extend_from_slice(request.path().as_bytes());
    dst.extend_from_slice(b" ");
    dst.extend_from_slice(request.version().as_str().as_bytes());
    dst.extend_from_slice(b"\r\n");

    write_headers(request.headers(), dst);

    dst.extend_from_slice(b"\r\n");
    dst.extend_from_slice(request.body());
}

pub(crate) fn write_headers(headers: &crate::protocol::HeaderMap, dst: &mut BytesMut) {
    for (name, value) in headers.iter() {
        dst.extend_from_slice(name.as_bytes());
        dst.extend_from_slice(b": ");
        dst.extend_from_slice(value.as_bytes());
        dst.extend_from_slice(b"\r\n");
    }
}

/// `tokio_util` encoder wrapper for framed writers.
#[derive(Debug, Default)]
pub struct RequestEncoder;

impl Encoder<Request> for RequestEncoder {
    type Error = SendError;

    fn encode(&mut self, item: Request, dst: &mut BytesMut) -> Result<(), Self::Error> {
        write_request(&item, dst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Method, Request};

    #[test]
    fn request_without_body() {
        let mut request = Request::builder(Method::Get, "/hello").build();
        request.add_header("Host", "example.com");
        request.add_header("User-Agent", "TinyClient/1.0");

        assert_eq!(
            encode_request(&request).as_ref(),
            b"GET /hello HTTP/1.1\r\nHost: example.com\r\nUser-Agent: TinyClient/1.0\r\n\r\n"
        );
    }

    #[test]
    fn request_with_body_and_duplicate_headers() {
        let request = Request::builder(Method::Post, "/submit")
            .header("Accept", "text/html")
            .header("Accept", "text/plain")
            .body(&b"payload"[..])
            .build();

        let wire = encode_request(&request);
        let expected = b"POST /submit HTTP/1.1\r\nAccept: text/html\r\nAccept: text/plain\r\n\
Content-Length: 7\r\n\r\npayload";
        assert_eq!(wire.as_ref(), expected.as_slice());
    }
}
