use crate::protocol::{PayloadItem, SendError};
use bytes::{Buf, BufMut, BytesMut};
use http::HeaderMap;
use std::io::Write;

use tokio_util::codec::Encoder;

/// Wraps every payload chunk in chunked transfer coding framing.
///
/// The stream is closed by either [`PayloadItem::Eof`] or
/// [`PayloadItem::Trailers`], which writes the zero-sized chunk, the trailer
/// fields and the final CRLF. Items after that are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedEncoder {
    eof: bool,
    send_size: u64,
}

impl ChunkedEncoder {
    pub fn new() -> Self {
        Self { eof: false, send_size: 0 }
    }

    /// Returns true once the last chunk has been written.
    pub fn is_finish(&self) -> bool {
        self.eof
    }

    /// Number of payload bytes encoded so far, framing excluded.
    pub fn send_size(&self) -> u64 {
        self.send_size
    }

    fn finish(&mut self, trailers: Option<&HeaderMap>, dst: &mut BytesMut) {
        self.eof = true;
        dst.extend_from_slice(b"0\r\n");
        if let Some(trailers) = trailers {
            for (name, value) in trailers {
                dst.put_slice(name.as_ref());
                dst.put_slice(b": ");
                dst.put_slice(value.as_ref());
                dst.put_slice(b"\r\n");
            }
        }
        dst.extend_from_slice(b"\r\n");
    }
}

impl Default for ChunkedEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for ChunkedEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if self.eof {
            return Ok(());
        }

        match item {
            PayloadItem::Chunk(bytes) => {
                // a zero-sized chunk would terminate the body early
                if !bytes.has_remaining() {
                    return Ok(());
                }
                write!(helper::Writer(dst), "{:X}\r\n", bytes.remaining())?;
                dst.reserve(bytes.remaining() + 2);
                self.send_size += bytes.remaining() as u64;
                dst.put(bytes);
                dst.extend_from_slice(b"\r\n");
                Ok(())
            }
            PayloadItem::Trailers(trailers) => {
                self.finish(Some(&trailers), dst);
                Ok(())
            }
            PayloadItem::Eof => {
                self.finish(None, dst);
                Ok(())
            }
        }
    }
}

mod helper {
    use bytes::{BufMut, BytesMut};
    use std::io;

    pub struct Writer<'a>(pub &'a mut BytesMut);

    impl io::Write for Writer<'_> {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.put_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}
