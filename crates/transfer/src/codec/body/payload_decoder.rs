//! Decoder implementation for HTTP message payloads.
//!
//! This module provides a unified decoder for handling different types of HTTP message bodies:
//! - Content-Length based payloads
//! - Chunked transfer encoding
//! - Payloads delimited by the transport closing
//! - Messages with no body
//!
//! A decoder may also be told to read a trailer section after a non-chunked
//! payload, which is how a body that expects trailers but lacks chunked framing
//! gets its trailer read from the transport.

use crate::codec::body::chunked_decoder::ChunkedDecoder;
use crate::codec::body::length_decoder::LengthDecoder;
use crate::codec::header::TrailerDecoder;
use crate::protocol::{Framing, ParseError, PayloadItem};
use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tracing::trace;

/// A unified decoder for handling HTTP message payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadDecoder {
    /// The specific decoding strategy to use
    kind: Kind,
    /// Trailer section to read once a non-chunked payload is done
    forced_trailer: Option<TrailerDecoder>,
}

/// Enum representing different payload decoding strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    /// Decode payload with a fixed content length
    Length(LengthDecoder),

    /// Decode payload using chunked transfer encoding
    Chunked(ChunkedDecoder),

    /// Everything until the transport reports EOF
    UntilClose,

    /// Handle messages with no body
    NoBody,

    /// Read a trailer section, then report EOF
    Trailer { decoder: TrailerDecoder, done: bool },
}

impl PayloadDecoder {
    /// Creates a decoder for the given framing.
    ///
    /// `trailer_decoder` carries the trailer limits used by chunked framing.
    pub fn new(framing: Framing, trailer_decoder: TrailerDecoder) -> Self {
        let kind = match framing {
            Framing::Empty | Framing::Length(0) => Kind::NoBody,
            Framing::Length(size) => Kind::Length(LengthDecoder::new(size)),
            Framing::Chunked => Kind::Chunked(ChunkedDecoder::with_trailer_decoder(trailer_decoder)),
            Framing::UntilClose => Kind::UntilClose,
        };
        Self { kind, forced_trailer: None }
    }

    /// Creates a PayloadDecoder for messages with no body.
    pub fn empty() -> Self {
        Self::new(Framing::Empty, TrailerDecoder::default())
    }

    /// Creates a PayloadDecoder for chunked transfer encoding.
    pub fn chunked() -> Self {
        Self::new(Framing::Chunked, TrailerDecoder::default())
    }

    /// Creates a PayloadDecoder for a fixed-length payload.
    pub fn fix_length(size: u64) -> Self {
        Self::new(Framing::Length(size), TrailerDecoder::default())
    }

    /// Creates a PayloadDecoder reading until the transport closes.
    pub fn until_close() -> Self {
        Self::new(Framing::UntilClose, TrailerDecoder::default())
    }

    /// Reads a trailer section after the payload even though the framing is not chunked.
    ///
    /// Chunked payloads always read their trailer section, so this is a no-op for them.
    pub fn force_trailer(mut self, trailer_decoder: TrailerDecoder) -> Self {
        if !self.is_chunked() {
            self.forced_trailer = Some(trailer_decoder);
        }
        self
    }

    /// Returns whether this decoder handles chunked transfer encoding.
    pub fn is_chunked(&self) -> bool {
        matches!(self.kind, Kind::Chunked(_))
    }

    /// Returns whether this decoder handles messages with no body.
    pub fn is_empty(&self) -> bool {
        matches!(self.kind, Kind::NoBody)
    }

    /// Returns whether this decoder handles fixed-length payloads.
    pub fn is_fix_length(&self) -> bool {
        matches!(self.kind, Kind::Length(_))
    }

    /// Returns whether the decoder is currently inside a trailer section.
    pub fn in_trailer(&self) -> bool {
        match &self.kind {
            Kind::Chunked(decoder) => decoder.in_trailer(),
            Kind::Trailer { done, .. } => !done,
            Kind::Length(_) | Kind::UntilClose | Kind::NoBody => false,
        }
    }

    /// Returns the number of fixed-length payload bytes not decoded yet.
    pub fn remaining_length(&self) -> Option<u64> {
        match &self.kind {
            Kind::Length(decoder) => Some(decoder.remaining()),
            Kind::NoBody => Some(0),
            Kind::Chunked(_) | Kind::UntilClose | Kind::Trailer { .. } => None,
        }
    }

    /// Switches to the forced trailer section once the payload itself reported EOF.
    fn after_payload(&mut self, item: Option<PayloadItem>, src: &mut BytesMut, eof: bool) -> Result<Option<PayloadItem>, ParseError> {
        if let Some(PayloadItem::Eof) = item {
            if let Some(decoder) = self.forced_trailer.take() {
                trace!("payload finished, reading trailer section");
                self.kind = Kind::Trailer { decoder, done: false };
                return if eof { self.decode_eof(src) } else { self.decode(src) };
            }
        }
        Ok(item)
    }
}

fn trailer_item(done: &mut bool, trailers: Option<http::HeaderMap>) -> Option<PayloadItem> {
    let trailers = trailers?;
    *done = true;
    if trailers.is_empty() { Some(PayloadItem::Eof) } else { Some(PayloadItem::Trailers(trailers)) }
}

/// Delegates to the appropriate decoder based on the payload type.
impl Decoder for PayloadDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let item = match &mut self.kind {
            Kind::Length(length_decoder) => length_decoder.decode(src)?,
            Kind::Chunked(chunked_decoder) => chunked_decoder.decode(src)?,
            Kind::UntilClose if src.is_empty() => None,
            Kind::UntilClose => Some(PayloadItem::Chunk(src.split().freeze())),
            Kind::NoBody => Some(PayloadItem::Eof),
            Kind::Trailer { done: true, .. } => Some(PayloadItem::Eof),
            Kind::Trailer { decoder, done } => {
                let trailers = decoder.decode(src)?;
                trailer_item(done, trailers)
            }
        };
        self.after_payload(item, src, false)
    }

    /// Decodes what is left once the transport reported EOF.
    ///
    /// For close-delimited payloads EOF is the end of the body; for every other
    /// framing an EOF before the boundary is an error.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let item = match &mut self.kind {
            Kind::Length(length_decoder) => length_decoder.decode_eof(src)?,
            Kind::Chunked(chunked_decoder) => chunked_decoder.decode_eof(src)?,
            Kind::UntilClose if src.is_empty() => Some(PayloadItem::Eof),
            Kind::UntilClose => Some(PayloadItem::Chunk(src.split().freeze())),
            Kind::NoBody => Some(PayloadItem::Eof),
            Kind::Trailer { done: true, .. } => Some(PayloadItem::Eof),
            Kind::Trailer { decoder, done } => {
                let trailers = decoder.decode_eof(src)?;
                trailer_item(done, trailers)
            }
        };
        self.after_payload(item, src, true)
    }
}
