//! HTTP/1.1 wire codec.
//!
//! Decoding is split in two phases, mirrored for requests and responses:
//! a head phase that locates the `\r\n\r\n` terminator and enforces the
//! grammar and size limits, and a payload phase driven by the framing
//! headers (`Content-Length`, `Transfer-Encoding: chunked`, or neither).
//! Encoders write messages back bit-exactly.
//!
//! All types implement the `tokio_util` [`Decoder`](tokio_util::codec::Decoder)
//! / [`Encoder`](tokio_util::codec::Encoder) traits so they compose with
//! `FramedRead`/`FramedWrite`; [`crate::parser`] offers a buffered façade on
//! top for whole-message parsing.

pub mod body;
mod head;
mod request_decoder;
mod request_encoder;
mod response_decoder;
mod response_encoder;

pub use head::{
    ParseLimits, DEFAULT_MAX_BODY_SIZE, DEFAULT_MAX_HEAD_SIZE, MAX_HEADER_LINES,
    MAX_HEADER_LINE_LENGTH, MAX_REQUEST_LINE_LENGTH,
};
pub use request_decoder::RequestDecoder;
pub use request_encoder::{encode_request, RequestEncoder};
pub use response_decoder::ResponseDecoder;
pub use response_encoder::{encode_response, ResponseEncoder};
