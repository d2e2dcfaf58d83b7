//! Streaming decoder for HTTP responses, the status-line counterpart of
//! [`crate::codec::RequestDecoder`].

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::codec::body::PayloadDecoder;
use crate::codec::head::{self, ParseLimits};
use crate::ensure;
use crate::protocol::{Message, ParseError, PayloadItem, Response};

pub struct ResponseDecoder {
    limits: ParseLimits,
    payload: Option<PayloadDecoder>,
}

impl ResponseDecoder {
    pub fn new() -> Self {
        Self::with_limits(ParseLimits::default())
    }

    pub fn with_limits(limits: ParseLimits) -> Self {
        Self { limits, payload: None }
    }

    pub fn mid_message(&self) -> bool {
        self.payload.is_some()
    }
}

impl Default for ResponseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ResponseDecoder {
    type Item = Message<Response>;
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
        let (response, payload_size) =
            head::parse_response_head(&head_bytes[..head_end], self.limits)?;

        self.payload = Some(PayloadDecoder::from(payload_size));
        Ok(Some(Message::Head(response)))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(message) => Ok(Some(message)),
            None if self.payload.is_some() || !src.is_empty() => Err(ParseError::UnexpectedEof),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::StatusCode;

    #[test]
    fn status_line_and_body() {
        let mut buffer = BytesMut::from(
            &b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 5\r\n\r\nhello"[..],
        );
        let mut decoder = ResponseDecoder::new();

        let response = decoder.decode(&mut buffer).unwrap().unwrap().into_head().unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.header("content-type"), Some("text/plain"));

        let chunk = decoder.decode(&mut buffer).unwrap().unwrap().into_payload_item().unwrap();
        assert_eq!(chunk.as_bytes().unwrap().as_ref(), b"hello");
        assert!(decoder.decode(&mut buffer).unwrap().unwrap().into_payload_item().unwrap().is_eof());
    }

    #[test]
    fn reason_phrase_is_optional() {
        let mut buffer = BytesMut::from(&b"HTTP/1.0 204\r\n\r\n"[..]);
        let mut decoder = ResponseDecoder::new();

        let response = decoder.decode(&mut buffer).unwrap().unwrap().into_head().unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[test]
    fn bad_status_code_is_rejected() {
        let mut buffer = BytesMut::from(&b"HTTP/1.1 999 Wat\r\n\r\n"[..]);
        let mut decoder = ResponseDecoder::new();
        assert!(matches!(
            decoder.decode(&mut buffer),
            Err(ParseError::InvalidStatusCode)
        ));
    }
}
