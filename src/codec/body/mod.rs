//! Body decoding strategies.
//!
//! A message body is framed either by `Content-Length` or by chunked
//! transfer encoding; [`PayloadDecoder`] dispatches between the two (and the
//! no-body case) based on the framing derived from the head.

mod chunked_decoder;
mod length_decoder;
mod payload_decoder;

pub use chunked_decoder::{ChunkedDecoder, MAX_CHUNK_SIZE};
pub use length_decoder::LengthDecoder;
pub use payload_decoder::PayloadDecoder;
