//! Decoder for the trailer section that follows the last chunk of a chunked body.
//!
//! A trailer section is a (possibly empty) list of header field lines followed by
//! an empty line, as defined in
//! [RFC 7230 Section 4.1.2](https://tools.ietf.org/html/rfc7230#section-4.1.2).
//! Field lines are parsed with `httparse`, the same way request headers are.

use bytes::{Buf, BytesMut};
use http::{HeaderMap, HeaderName, HeaderValue};
use httparse::Status;
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::protocol::config::{MAX_TRAILER_BYTES, MAX_TRAILER_NUM};
use crate::protocol::ParseError;

/// Decodes one trailer section into a [`HeaderMap`].
///
/// Yields `Ok(None)` until the terminating empty line is buffered. Anything that
/// is not valid field syntax, and any section exceeding the configured limits,
/// is reported as [`ParseError::MalformedTrailer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrailerDecoder {
    max_bytes: usize,
    max_fields: usize,
}

impl TrailerDecoder {
    pub fn new(max_bytes: usize, max_fields: usize) -> Self {
        Self { max_bytes, max_fields }
    }
}

impl Default for TrailerDecoder {
    fn default() -> Self {
        Self::new(MAX_TRAILER_BYTES, MAX_TRAILER_NUM)
    }
}

impl Decoder for TrailerDecoder {
    type Item = HeaderMap;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Fast path: no trailer fields at all
        if src.starts_with(b"\r\n") {
            src.advance(2);
            return Ok(Some(HeaderMap::new()));
        }
        if src.is_empty() || &src[..] == b"\r" {
            return Ok(None);
        }

        let mut headers = vec![httparse::EMPTY_HEADER; self.max_fields];
        let (consumed, trailers) = match httparse::parse_headers(src, &mut headers) {
            Ok(Status::Complete((consumed, fields))) => {
                ensure!(
                    consumed <= self.max_bytes,
                    ParseError::malformed_trailer(format!("trailer size {consumed} exceed the limit {}", self.max_bytes))
                );

                let mut trailers = HeaderMap::with_capacity(fields.len());
                for field in fields.iter() {
                    let name = HeaderName::from_bytes(field.name.as_bytes()).map_err(ParseError::malformed_trailer)?;
                    let value = HeaderValue::from_bytes(field.value).map_err(ParseError::malformed_trailer)?;
                    trailers.append(name, value);
                }
                (consumed, trailers)
            }
            Ok(Status::Partial) => {
                ensure!(
                    src.len() <= self.max_bytes,
                    ParseError::malformed_trailer(format!("trailer size {} exceed the limit {}", src.len(), self.max_bytes))
                );
                return Ok(None);
            }
            Err(httparse::Error::TooManyHeaders) => {
                return Err(ParseError::malformed_trailer(format!("trailer number exceed the limit {}", self.max_fields)));
            }
            Err(e) => return Err(ParseError::malformed_trailer(e)),
        };

        trace!(fields = trailers.len(), size = consumed, "parsed trailer section");
        src.advance(consumed);
        Ok(Some(trailers))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(trailers) => Ok(Some(trailers)),
            None => Err(ParseError::malformed_trailer("transport closed inside the trailer section")),
        }
    }
}
