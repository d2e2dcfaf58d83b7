//! Decoder for chunked transfer encoding.
//!
//! Each chunk is a hexadecimal size line (optionally carrying `;extension`
//! suffixes, which are ignored), CRLF, the chunk data, CRLF. A zero-size
//! chunk ends the body, optionally followed by trailer lines that are read
//! and discarded. Every framing violation is `ChunkedEncodingInvalid`.

use std::task::Poll;

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::protocol::{ParseError, PayloadItem};
use ChunkedState::*;

/// Maximum size of a single chunk.
pub const MAX_CHUNK_SIZE: u64 = 64 * 1024;

/// State machine over the chunked framing grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedDecoder {
    state: ChunkedState,
    remaining_size: u64,
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self { state: Size, remaining_size: 0 }
    }
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkedState {
    /// Read the chunk size in hex
    Size,
    /// Whitespace after the size
    SizeLws,
    /// Skip chunk extensions
    Extension,
    /// LF ending the size line
    SizeLf,
    /// Chunk data
    Body,
    /// CR after chunk data
    BodyCr,
    /// LF after chunk data
    BodyLf,
    /// Optional trailer fields after the last chunk
    Trailer,
    /// LF ending a trailer line
    TrailerLf,
    /// Final CR
    EndCr,
    /// Final LF
    EndLf,
    /// Message complete
    End,
}

impl Decoder for ChunkedDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if self.state == End {
                trace!("finished reading chunked body");
                return Ok(Some(PayloadItem::Eof));
            }

            if src.is_empty() {
                return Ok(None);
            }

            let mut chunk = None;

            self.state = match self.state.step(src, &mut self.remaining_size, &mut chunk) {
                Poll::Pending => return Ok(None),
                Poll::Ready(Ok(next)) => next,
                Poll::Ready(Err(e)) => return Err(e),
            };

            if let Some(bytes) = chunk {
                trace!(len = bytes.len(), "read chunked bytes");
                return Ok(Some(PayloadItem::Chunk(bytes)));
            }
        }
    }
}

macro_rules! try_next_byte {
    ($src:ident) => {{
        if $src.len() > 0 {
            $src.get_u8()
        } else {
            return Poll::Pending;
        }
    }};
}

impl ChunkedState {
    fn step(
        &self,
        src: &mut BytesMut,
        remaining_size: &mut u64,
        chunk: &mut Option<Bytes>,
    ) -> Poll<Result<ChunkedState, ParseError>> {
        match self {
            Size => ChunkedState::read_size(src, remaining_size),
            SizeLws => ChunkedState::read_size_lws(src),
            Extension => ChunkedState::read_extension(src),
            SizeLf => ChunkedState::read_size_lf(src, remaining_size),
            Body => ChunkedState::read_body(src, remaining_size, chunk),
            BodyCr => ChunkedState::expect(src, b'\r', BodyLf),
            BodyLf => ChunkedState::expect(src, b'\n', Size),
            Trailer => ChunkedState::read_trailer(src),
            TrailerLf => ChunkedState::expect(src, b'\n', EndCr),
            EndCr => ChunkedState::read_end_cr(src),
            EndLf => ChunkedState::expect(src, b'\n', End),
            End => Poll::Ready(Ok(End)),
        }
    }

    /// Accumulates hex digits of the chunk size; the size is bounded by
    /// [`MAX_CHUNK_SIZE`] so a hostile peer cannot declare an absurd chunk.
    fn read_size(src: &mut BytesMut, size: &mut u64) -> Poll<Result<ChunkedState, ParseError>> {
        let digit = match try_next_byte!(src) {
            b @ b'0'..=b'9' => b - b'0',
            b @ b'a'..=b'f' => b + 10 - b'a',
            b @ b'A'..=b'F' => b + 10 - b'A',
            b'\t' | b' ' => return Poll::Ready(Ok(SizeLws)),
            b';' => return Poll::Ready(Ok(Extension)),
            b'\r' => return Poll::Ready(Ok(SizeLf)),
            _ => return Poll::Ready(Err(ParseError::ChunkedEncodingInvalid)),
        };

        *size = match size.checked_mul(16).and_then(|s| s.checked_add(u64::from(digit))) {
            Some(s) if s <= MAX_CHUNK_SIZE => s,
            _ => return Poll::Ready(Err(ParseError::ChunkedEncodingInvalid)),
        };

        Poll::Ready(Ok(Size))
    }

    /// Only tabs and spaces may follow the size; no further digits.
    fn read_size_lws(src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        match try_next_byte!(src) {
            b'\t' | b' ' => Poll::Ready(Ok(SizeLws)),
            b';' => Poll::Ready(Ok(Extension)),
            b'\r' => Poll::Ready(Ok(SizeLf)),
            _ => Poll::Ready(Err(ParseError::ChunkedEncodingInvalid)),
        }
    }

    /// Extensions are ignored; they end at CRLF. A bare LF inside an
    /// extension is rejected.
    fn read_extension(src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        match try_next_byte!(src) {
            b'\r' => Poll::Ready(Ok(SizeLf)),
            b'\n' => Poll::Ready(Err(ParseError::ChunkedEncodingInvalid)),
            _ => Poll::Ready(Ok(Extension)),
        }
    }

    fn read_size_lf(src: &mut BytesMut, size: &mut u64) -> Poll<Result<ChunkedState, ParseError>> {
        match try_next_byte!(src) {
            b'\n' if *size == 0 => Poll::Ready(Ok(EndCr)),
            b'\n' => Poll::Ready(Ok(Body)),
            _ => Poll::Ready(Err(ParseError::ChunkedEncodingInvalid)),
        }
    }

    fn read_body(
        src: &mut BytesMut,
        size: &mut u64,
        chunk: &mut Option<Bytes>,
    ) -> Poll<Result<ChunkedState, ParseError>> {
        if src.is_empty() {
            return Poll::Ready(Ok(Body));
        }

        if *size == 0 {
            return Poll::Ready(Ok(BodyCr));
        }

        let read_size = std::cmp::min(*size as usize, src.len());
        *size -= read_size as u64;
        *chunk = Some(src.split_to(read_size).freeze());

        if *size > 0 {
            Poll::Ready(Ok(Body))
        } else {
            Poll::Ready(Ok(BodyCr))
        }
    }

    /// Trailer fields after the last chunk are read and discarded.
    fn read_trailer(src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        match try_next_byte!(src) {
            b'\r' => Poll::Ready(Ok(TrailerLf)),
            _ => Poll::Ready(Ok(Trailer)),
        }
    }

    /// After the zero chunk either the final CRLF follows directly or a
    /// trailer block begins.
    fn read_end_cr(src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        match try_next_byte!(src) {
            b'\r' => Poll::Ready(Ok(EndLf)),
            _ => Poll::Ready(Ok(Trailer)),
        }
    }

    fn expect(
        src: &mut BytesMut,
        expected: u8,
        next: ChunkedState,
    ) -> Poll<Result<ChunkedState, ParseError>> {
        match try_next_byte!(src) {
            b if b == expected => Poll::Ready(Ok(next)),
            _ => Poll::Ready(Err(ParseError::ChunkedEncodingInvalid)),
        }
    }
}
