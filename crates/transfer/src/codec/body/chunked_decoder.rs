//! Decoder implementation for HTTP chunked transfer encoding.
//!
//! This module provides functionality to decode HTTP messages that use chunked transfer encoding
//! as specified in [RFC 7230 Section 4.1](https://tools.ietf.org/html/rfc7230#section-4.1).
//!
//! The chunked encoding allows the sender to transmit message data in a series of chunks,
//! indicating the size of each chunk before its data. The last chunk has size zero and
//! may be followed by trailer fields.

use crate::codec::header::TrailerDecoder;
use crate::protocol::{ParseError, PayloadItem};
use bytes::{Buf, BytesMut};
use std::task::Poll;
use tokio_util::codec::Decoder;
use tracing::trace;
use ChunkedState::*;

/// A decoder for handling HTTP chunked transfer encoding.
///
/// The decoder processes incoming bytes according to the chunked format:
/// - Each chunk starts with its size in hexadecimal
/// - Followed by optional extensions and CRLF
/// - Then the chunk data and CRLF
/// - A zero-sized chunk starts the trailer section, which ends with an empty line
///
/// Items come out in a fixed order: data chunks, then one
/// [`PayloadItem::Trailers`] if the trailer section carried any field, then
/// [`PayloadItem::Eof`] for every later call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedDecoder {
    state: ChunkedState,
    remaining_size: u64,
    trailer_decoder: TrailerDecoder,
}

impl ChunkedDecoder {
    /// Creates a new ChunkedDecoder instance with default trailer limits.
    ///
    /// The decoder starts in the Size state, ready to read the size of the first chunk.
    pub fn new() -> Self {
        Self::with_trailer_decoder(TrailerDecoder::default())
    }

    pub fn with_trailer_decoder(trailer_decoder: TrailerDecoder) -> Self {
        Self { state: Size, remaining_size: 0, trailer_decoder }
    }

    /// Returns true once the zero-sized chunk was read and the trailer section is pending.
    #[inline]
    pub fn in_trailer(&self) -> bool {
        self.state == Trailer
    }

    /// Returns true once the whole chunked body, trailer section included, was consumed.
    #[inline]
    pub fn is_finish(&self) -> bool {
        self.state == End
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
    /// Handle whitespace after size
    SizeLws,
    /// Skip chunk extensions
    Extension,
    /// Read LF after chunk size
    SizeLf,
    /// Read chunk data
    Body,
    /// Read CR after chunk data
    BodyCr,
    /// Read LF after chunk data
    BodyLf,
    /// Read the trailer section after the last chunk
    Trailer,
    /// Final state after reading the trailer section
    End,
}

impl Decoder for ChunkedDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    /// Decodes chunked transfer encoded data from the input buffer.
    ///
    /// # Returns
    /// - `Ok(Some(PayloadItem::Chunk(bytes)))` when chunk data is available
    /// - `Ok(Some(PayloadItem::Trailers(map)))` when a non-empty trailer section is complete
    /// - `Ok(Some(PayloadItem::Eof))` when the final chunk and trailer section are processed
    /// - `Ok(None)` when more data is needed
    /// - `Err(ParseError)` if the chunked encoding or the trailer section is invalid
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if self.state == End {
                trace!("finished reading chunked data");
                return Ok(Some(PayloadItem::Eof));
            }

            if src.is_empty() {
                // need more data
                return Ok(None);
            }

            let mut item = None;

            self.state = match self.state.step(src, &mut self.remaining_size, &mut self.trailer_decoder, &mut item) {
                Poll::Pending => return Ok(None),
                Poll::Ready(Ok(new_state)) => new_state,
                Poll::Ready(Err(e)) => return Err(e),
            };

            if let Some(item) = item {
                if let PayloadItem::Chunk(bytes) = &item {
                    trace!(len = bytes.len(), "read chunked bytes");
                }
                return Ok(Some(item));
            }
        }
    }

    /// Called once the transport has no more bytes.
    ///
    /// Anything still decodable from `src` is returned first. A stream cut inside the
    /// trailer section is a malformed trailer, a stream cut anywhere before it is an
    /// unexpected EOF: neither is ever reported as a clean end of the body.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(item) = self.decode(src)? {
            return Ok(Some(item));
        }

        if self.state == Trailer {
            return match self.trailer_decoder.decode_eof(src)? {
                Some(trailers) => {
                    self.state = End;
                    Ok(Some(trailers_or_eof(trailers)))
                }
                None => Err(ParseError::malformed_trailer("transport closed inside the trailer section")),
            };
        }

        Err(ParseError::unexpected_eof("transport closed before the last chunk"))
    }
}

fn trailers_or_eof(trailers: http::HeaderMap) -> PayloadItem {
    if trailers.is_empty() { PayloadItem::Eof } else { PayloadItem::Trailers(trailers) }
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
    /// Processes the next step in the chunked decoding state machine.
    ///
    /// # Arguments
    /// * `src` - Source buffer containing the chunked data
    /// * `remaining_size` - Tracks remaining bytes in current chunk
    /// * `trailer_decoder` - Parses the trailer section after the last chunk
    /// * `item` - Receives decoded chunk data or trailer fields
    ///
    /// # Returns
    /// The next state in the decoding process or an error if invalid encoding is detected
    fn step(
        &self,
        src: &mut BytesMut,
        remaining_size: &mut u64,
        trailer_decoder: &mut TrailerDecoder,
        item: &mut Option<PayloadItem>,
    ) -> Poll<Result<ChunkedState, ParseError>> {
        match self {
            Size => ChunkedState::read_size(src, remaining_size),
            SizeLws => ChunkedState::read_size_lws(src),
            Extension => ChunkedState::read_extension(src),
            SizeLf => ChunkedState::read_size_lf(src, remaining_size),
            Body => ChunkedState::read_body(src, remaining_size, item),
            BodyCr => ChunkedState::read_body_cr(src),
            BodyLf => ChunkedState::read_body_lf(src),
            Trailer => ChunkedState::read_trailer(src, trailer_decoder, item),
            End => Poll::Ready(Ok(End)),
        }
    }

    /// Reads and parses the chunk size in hexadecimal format.
    ///
    /// # State Transitions
    /// - On hex digit (0-9, a-f, A-F): Stay in Size state to read more digits
    /// - On whitespace (tab/space): Transition to SizeLws state
    /// - On semicolon: Transition to Extension state to handle chunk extensions
    /// - On CR: Transition to SizeLf state to finish size line
    /// - On invalid character: Return error
    fn read_size(src: &mut BytesMut, size_per_chunk: &mut u64) -> Poll<Result<ChunkedState, ParseError>> {
        macro_rules! or_overflow {
            ($e:expr) => {
                match $e {
                    Some(val) => val,
                    None => return Poll::Ready(Err(ParseError::malformed_chunk_header("invalid overflow chunked length"))),
                }
            };
        }

        let radix = 16;
        match try_next_byte!(src) {
            b @ b'0'..=b'9' => {
                *size_per_chunk = or_overflow!(size_per_chunk.checked_mul(radix));
                *size_per_chunk = or_overflow!(size_per_chunk.checked_add(u64::from(b - b'0')));
            }
            b @ b'a'..=b'f' => {
                *size_per_chunk = or_overflow!(size_per_chunk.checked_mul(radix));
                *size_per_chunk = or_overflow!(size_per_chunk.checked_add(u64::from(b + 10 - b'a')));
            }
            b @ b'A'..=b'F' => {
                *size_per_chunk = or_overflow!(size_per_chunk.checked_mul(radix));
                *size_per_chunk = or_overflow!(size_per_chunk.checked_add(u64::from(b + 10 - b'A')));
            }
            b'\t' | b' ' => return Poll::Ready(Ok(SizeLws)),
            b';' => return Poll::Ready(Ok(Extension)),
            b'\r' => return Poll::Ready(Ok(SizeLf)),

            _ => return Poll::Ready(Err(ParseError::malformed_chunk_header("invalid chunk size line: Invalid Size"))),
        }

        Poll::Ready(Ok(Size))
    }

    /// Processes linear whitespace (LWS) after the chunk size.
    ///
    /// # State Transitions
    /// - On tab/space: Stay in SizeLws state to handle more whitespace
    /// - On semicolon: Move to Extension state to process chunk extensions
    /// - On CR: Move to SizeLf state to finish size line
    /// - On invalid char: Return error
    fn read_size_lws(src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        match try_next_byte!(src) {
            // LWS can follow the chunk size, but no more digits can come
            b'\t' | b' ' => Poll::Ready(Ok(SizeLws)),
            b';' => Poll::Ready(Ok(Extension)),
            b'\r' => Poll::Ready(Ok(SizeLf)),
            _ => Poll::Ready(Err(ParseError::malformed_chunk_header("invalid chunk size linear white space"))),
        }
    }

    /// Skips chunk extensions up to the end of the size line.
    ///
    /// Extensions are ignored, but a plain LF inside them is rejected so that a
    /// peer which forgets the CR can't smuggle a second size line.
    fn read_extension(src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        match try_next_byte!(src) {
            b'\r' => Poll::Ready(Ok(SizeLf)),
            b'\n' => Poll::Ready(Err(ParseError::malformed_chunk_header("invalid chunk extension contains newline"))),
            _ => Poll::Ready(Ok(Extension)), // no supported extensions
        }
    }

    /// Validates the LF byte after the chunk size line.
    ///
    /// # State Transitions
    /// - On LF with size 0: Move to Trailer state
    /// - On LF with size > 0: Move to Body state to read chunk data
    /// - On any other byte: Return error
    fn read_size_lf(src: &mut BytesMut, size_per_chunk: &mut u64) -> Poll<Result<ChunkedState, ParseError>> {
        match try_next_byte!(src) {
            b'\n' => {
                if *size_per_chunk == 0 {
                    Poll::Ready(Ok(Trailer))
                } else {
                    Poll::Ready(Ok(Body))
                }
            }

            _ => Poll::Ready(Err(ParseError::malformed_chunk_header("invalid chunk size LF"))),
        }
    }

    /// Reads the actual chunk data bytes, at most `size_per_chunk` of them.
    ///
    /// # State Transitions
    /// - On empty input: Stay in Body state
    /// - After reading data with remaining size > 0: Stay in Body state
    /// - After reading data with remaining size = 0: Move to BodyCr state
    fn read_body(src: &mut BytesMut, size_per_chunk: &mut u64, item: &mut Option<PayloadItem>) -> Poll<Result<ChunkedState, ParseError>> {
        if src.is_empty() {
            return Poll::Ready(Ok(Body));
        }

        if *size_per_chunk == 0 {
            return Poll::Ready(Ok(BodyCr));
        }

        // cap remaining bytes at the max capacity of usize
        let remaining = usize::try_from(*size_per_chunk).unwrap_or(usize::MAX);

        let read_size = std::cmp::min(remaining, src.len());

        *size_per_chunk -= read_size as u64;
        *item = Some(PayloadItem::Chunk(src.split_to(read_size).freeze()));

        if *size_per_chunk > 0 { Poll::Ready(Ok(Body)) } else { Poll::Ready(Ok(BodyCr)) }
    }

    /// Validates the CR byte after chunk data.
    fn read_body_cr(src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        match try_next_byte!(src) {
            b'\r' => Poll::Ready(Ok(BodyLf)),
            _ => Poll::Ready(Err(ParseError::malformed_chunk_header("invalid chunk body CR"))),
        }
    }

    /// Validates the LF byte after chunk data.
    fn read_body_lf(src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        match try_next_byte!(src) {
            b'\n' => Poll::Ready(Ok(Size)),
            _ => Poll::Ready(Err(ParseError::malformed_chunk_header("invalid chunk body LF"))),
        }
    }

    /// Reads the trailer section after the last chunk.
    ///
    /// Unlike the other states this consumes a whole section at once, so it stays
    /// pending until the terminating empty line is buffered.
    ///
    /// # State Transitions
    /// - On a complete section: Move to End state, emitting trailers if any
    /// - On an incomplete section: Stay in Trailer state
    /// - On invalid field syntax: Return a malformed trailer error
    fn read_trailer(
        src: &mut BytesMut,
        trailer_decoder: &mut TrailerDecoder,
        item: &mut Option<PayloadItem>,
    ) -> Poll<Result<ChunkedState, ParseError>> {
        match trailer_decoder.decode(src) {
            Ok(Some(trailers)) => {
                if !trailers.is_empty() {
                    *item = Some(PayloadItem::Trailers(trailers));
                }
                Poll::Ready(Ok(End))
            }
            Ok(None) => Poll::Pending,
            Err(e) => Poll::Ready(Err(e)),
        }
    }
}
