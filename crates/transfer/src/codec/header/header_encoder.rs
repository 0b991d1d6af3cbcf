//! Encoder for the header lines that announce how a body is framed.
//!
//! Writes `Content-Length` or `Transfer-Encoding: chunked` (plus the `Trailer`
//! announcement) for an outgoing message. The rest of the header block is owned
//! by whoever writes the start line.

use crate::protocol::{Framing, SendError};

use bytes::{BufMut, BytesMut};

use http::header::{CONTENT_LENGTH, TRAILER, TRANSFER_ENCODING};
use http::HeaderMap;
use std::io;
use std::io::Write;
use tokio_util::codec::Encoder;
use tracing::warn;

/// Encoder for the framing header lines of an outgoing message.
///
/// The trailer map, when given, is only used for its field names; the values
/// travel after the last chunk.
#[derive(Debug, Default, Copy, Clone)]
pub struct FramingEncoder;

impl<'a> Encoder<(Framing, Option<&'a HeaderMap>)> for FramingEncoder {
    type Error = SendError;

    fn encode(&mut self, item: (Framing, Option<&'a HeaderMap>), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (framing, trailers) = item;

        match framing {
            Framing::Length(n) => write!(FastWrite(dst), "{CONTENT_LENGTH}: {n}\r\n")?,
            Framing::Empty => write!(FastWrite(dst), "{CONTENT_LENGTH}: 0\r\n")?,
            Framing::Chunked => {
                write!(FastWrite(dst), "{TRANSFER_ENCODING}: chunked\r\n")?;
                if let Some(trailers) = trailers {
                    write_trailer_names(trailers, dst);
                }
            }
            Framing::UntilClose => {}
        }
        Ok(())
    }
}

fn write_trailer_names(trailers: &HeaderMap, dst: &mut BytesMut) {
    let mut first = true;
    for name in trailers.keys() {
        if name == CONTENT_LENGTH || name == TRANSFER_ENCODING || name == TRAILER {
            warn!(%name, "skip framing field announced as trailer");
            continue;
        }
        if first {
            dst.put_slice(TRAILER.as_ref());
            dst.put_slice(b": ");
            first = false;
        } else {
            dst.put_slice(b", ");
        }
        dst.put_slice(name.as_ref());
    }
    if !first {
        dst.put_slice(b"\r\n");
    }
}

struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(framing: Framing, trailers: Option<&HeaderMap>) -> BytesMut {
        let mut dst = BytesMut::new();
        FramingEncoder.encode((framing, trailers), &mut dst).unwrap();
        dst
    }

    #[test]
    fn length_framing() {
        assert_eq!(&encode(Framing::Length(42), None)[..], b"content-length: 42\r\n");
        assert_eq!(&encode(Framing::Empty, None)[..], b"content-length: 0\r\n");
    }

    #[test]
    fn close_delimited_writes_nothing() {
        assert!(encode(Framing::UntilClose, None).is_empty());
    }

    #[test]
    fn chunked_with_trailer_names() {
        let mut trailers = HeaderMap::new();
        trailers.insert("x-checksum", "abc".parse().unwrap());
        trailers.append("x-checksum", "def".parse().unwrap());
        trailers.insert(http::header::EXPIRES, "0".parse().unwrap());
        trailers.insert(CONTENT_LENGTH, "3".parse().unwrap());

        let dst = encode(Framing::Chunked, Some(&trailers));
        assert_eq!(&dst[..], b"transfer-encoding: chunked\r\ntrailer: x-checksum, expires\r\n");
    }

    #[test]
    fn chunked_without_trailers() {
        assert_eq!(&encode(Framing::Chunked, Some(&HeaderMap::new()))[..], b"transfer-encoding: chunked\r\n");
    }
}
