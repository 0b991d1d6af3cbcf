use bytes::{Buf, Bytes};
use http::HeaderMap;

/// Represents an item in an HTTP message payload stream.
///
/// Payload decoders produce data chunks, then at most one trailer section,
/// then EOF. Payload encoders accept the same sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem<Data: Buf = Bytes> {
    /// A chunk of payload data
    Chunk(Data),
    /// Trailer fields received (or to be sent) after the last chunk
    Trailers(HeaderMap),
    /// Marks the end of the payload stream
    Eof,
}

/// How the boundary of a message body is determined.
///
/// The same value describes incoming bodies (which decoder to use) and
/// outgoing bodies (which framing headers to write).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Framing {
    /// Body with a declared `Content-Length`
    Length(u64),
    /// Body using chunked transfer encoding
    Chunked,
    /// Body ends when the transport reaches EOF
    UntilClose,
    /// No body at all
    Empty,
}

impl Framing {
    /// Returns true if the body uses chunked transfer encoding
    #[inline]
    pub fn is_chunked(&self) -> bool {
        matches!(self, Framing::Chunked)
    }

    /// Returns true if the body is known to be empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, Framing::Empty | Framing::Length(0))
    }

    /// Returns the exact body length when the framing declares one
    #[inline]
    pub fn exact_length(&self) -> Option<u64> {
        match self {
            Framing::Length(n) => Some(*n),
            Framing::Empty => Some(0),
            Framing::Chunked | Framing::UntilClose => None,
        }
    }
}

impl<D: Buf> PayloadItem<D> {
    /// Returns true if this item represents the end of the payload stream
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, PayloadItem::Eof)
    }

    /// Returns true if this item contains chunk data
    #[inline]
    pub fn is_chunk(&self) -> bool {
        matches!(self, PayloadItem::Chunk(_))
    }

    /// Returns true if this item carries trailer fields
    #[inline]
    pub fn is_trailers(&self) -> bool {
        matches!(self, PayloadItem::Trailers(_))
    }
}

impl PayloadItem {
    /// Returns a reference to the contained bytes if this is a Chunk
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Trailers(_) | PayloadItem::Eof => None,
        }
    }

    /// Consumes the PayloadItem and returns the contained bytes if this is a Chunk
    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Trailers(_) | PayloadItem::Eof => None,
        }
    }

    /// Returns the trailer fields if this is a Trailers item
    pub fn as_trailers(&self) -> Option<&HeaderMap> {
        match self {
            PayloadItem::Trailers(trailers) => Some(trailers),
            PayloadItem::Chunk(_) | PayloadItem::Eof => None,
        }
    }
}

impl From<Bytes> for PayloadItem {
    fn from(bytes: Bytes) -> Self {
        Self::Chunk(bytes)
    }
}
