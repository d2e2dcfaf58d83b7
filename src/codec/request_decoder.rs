//! Streaming decoder for HTTP requests.
//!
//! The decoder works in two phases tracked by the `payload` field: while it
//! is `None` the decoder is looking for a complete head; once the head is
//! parsed, the payload decoder selected from the framing headers takes over
//! until it yields `Eof`.

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::codec::body::PayloadDecoder;
use crate::codec::head::{self, ParseLimits};
use crate::ensure;
use crate::protocol::{Message, ParseError, PayloadItem, Request};

pub struct RequestDecoder {
    limits: ParseLimits,
    payload: Option<PayloadDecoder>,
}

impl RequestDecoder {
    pub fn new() -> Self {
        Self::with_limits(ParseLimits::default())
    }

    pub fn with_limits(limits: ParseLimits) -> Self {
        Self { limits, payload: None }
    }

    /// True while a body is still being decoded.
    pub fn mid_message(&self) -> bool {
        self.payload.is_some()
    }
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for RequestDecoder {
    type Item = Message<Request>;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(payload_decoder) = &mut self.payload {
            let message = match payload_decoder.decode(src)? {
                Some(item @ PayloadItem::Chunk(_)) => Some(Message::Payload(item)),
                Some(item @ PayloadItem::Eof) => {
                    self.payload.take();
                    Some(Message::Payload(item))
                }
                None => None,
            };
            return Ok(message);
        }

        let head_end = match head::find_head_end(src) {
            Some(end) => end,
            None => {
                ensure!(src.len() <= self.limits.max_head_size, ParseError::HeaderTooLarge);
                return Ok(None);
            }
        };
        ensure!(head_end <= self.limits.max_head_size, ParseError::HeaderTooLarge);

        let head_bytes = src.split_to(head_end + 4);
        let (request, payload_size) = head::parse_request_head(&head_bytes[..head_end], self.limits)?;

        self.payload = Some(PayloadDecoder::from(payload_size));
        Ok(Some(Message::Head(request)))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(message) => Ok(Some(message)),
            // the stream is over: anything still pending can never complete
            None if self.payload.is_some() || !src.is_empty() => Err(ParseError::UnexpectedEof),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn head_then_empty_payload() {
        let mut buffer =
            BytesMut::from(&b"GET /hello HTTP/1.1\r\nHost: example.com\r\n\r\n"[..]);
        let mut decoder = RequestDecoder::new();

        let request = decoder.decode(&mut buffer).unwrap().unwrap().into_head().unwrap();
        assert_eq!(request.path(), "/hello");
        assert_eq!(request.header("host"), Some("example.com"));
        assert!(buffer.is_empty());

        let item = decoder.decode(&mut buffer).unwrap().unwrap().into_payload_item().unwrap();
        assert!(item.is_eof());
        assert!(!decoder.mid_message());
    }

    #[test]
    fn incomplete_head_needs_more_data() {
        let mut buffer = BytesMut::from(&b"GET / HTTP/1.1\r\nHost: exa"[..]);
        let mut decoder = RequestDecoder::new();
        assert!(decoder.decode(&mut buffer).unwrap().is_none());
    }

    #[test]
    fn body_follows_head() {
        let mut buffer =
            BytesMut::from(&b"POST /api HTTP/1.1\r\nContent-Length: 4\r\n\r\nwxyz"[..]);
        let mut decoder = RequestDecoder::new();

        let head = decoder.decode(&mut buffer).unwrap().unwrap();
        assert!(head.is_head());

        let chunk = decoder.decode(&mut buffer).unwrap().unwrap().into_payload_item().unwrap();
        assert_eq!(chunk.as_bytes().unwrap().as_ref(), b"wxyz");

        let eof = decoder.decode(&mut buffer).unwrap().unwrap().into_payload_item().unwrap();
        assert!(eof.is_eof());
    }

    #[test]
    fn truncated_body_fails_at_eof() {
        let mut buffer =
            BytesMut::from(&b"POST /api HTTP/1.1\r\nContent-Length: 10\r\n\r\nshort"[..]);
        let mut decoder = RequestDecoder::new();

        decoder.decode(&mut buffer).unwrap().unwrap();
        // the five available bytes arrive as a chunk
        let chunk = decoder.decode(&mut buffer).unwrap().unwrap().into_payload_item().unwrap();
        assert_eq!(chunk.as_bytes().unwrap().as_ref(), b"short");

        let err = decoder.decode_eof(&mut buffer).unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEof));
    }

    #[test]
    fn unterminated_head_fails_at_eof() {
        let mut buffer = BytesMut::from(&b"GET / HTTP/1.1\r\n"[..]);
        let mut decoder = RequestDecoder::new();

        let err = decoder.decode_eof(&mut buffer).unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEof));
    }

    #[test]
    fn runaway_head_is_capped() {
        let limits = ParseLimits { max_head_size: 128, ..ParseLimits::default() };
        let mut decoder = RequestDecoder::with_limits(limits);

        let mut buffer = BytesMut::from(&b"GET / HTTP/1.1\r\n"[..]);
        buffer.extend_from_slice("X: ".as_bytes());
        buffer.extend_from_slice(&vec![b'a'; 256]);

        let err = decoder.decode(&mut buffer).unwrap_err();
        assert!(matches!(err, ParseError::HeaderTooLarge));
    }
}
