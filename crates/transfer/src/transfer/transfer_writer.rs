use std::cmp;

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, Method};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::codec::Encoder;
use tracing::{debug, trace};

use crate::codec::body::ChunkedEncoder;
use crate::codec::header::FramingEncoder;
use crate::ensure;
use crate::protocol::body::{classify, BodyReader, ReaderKind};
use crate::protocol::{Framing, PayloadItem, SendError};
use crate::transfer::limited_reader::LimitedReader;
use crate::transfer::sink::{BodySink, BulkTransfer};

/// Size of the buffer used by the plain and chunked copy loops
pub const DEFAULT_COPY_BUFFER_SIZE: usize = 32 * 1024;

/// How a body is put on the wire.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TransferStrategy {
    /// Nothing is written.
    NoBody,
    /// Plain writes wrapped in chunk framing, ending with the last chunk and the trailers.
    Chunked,
    /// The destination pulls the body itself; `bounded` caps it at the declared length.
    Bulk { bounded: bool },
    /// One write per buffer read; `bounded` caps it at the declared length.
    Plain { bounded: bool },
}

/// Outcome of a successful [`TransferWriter::write_body`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub strategy: TransferStrategy,
    /// Body bytes transmitted, chunk framing excluded.
    pub body_bytes: u64,
}

/// Writes outgoing message bodies.
///
/// The framing comes from the declared `content_length` (positive: known,
/// zero: no body, negative: unknown) and the transfer codings: `chunked`
/// anywhere in the list wins over any length.
#[derive(Debug, Clone)]
pub struct TransferWriter {
    content_length: i64,
    transfer_encoding: Vec<String>,
    method: Method,
    trailer: Option<HeaderMap>,
    buffer_size: usize,
}

impl TransferWriter {
    pub fn new(content_length: i64) -> Self {
        Self {
            content_length,
            transfer_encoding: Vec::new(),
            method: Method::GET,
            trailer: None,
            buffer_size: DEFAULT_COPY_BUFFER_SIZE,
        }
    }

    pub fn transfer_encoding<I, S>(mut self, codings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.transfer_encoding = codings.into_iter().map(Into::into).collect();
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Trailer fields sent after the last chunk. Ignored unless the body is chunked.
    pub fn trailer(mut self, trailer: HeaderMap) -> Self {
        self.trailer = Some(trailer);
        self
    }

    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    pub fn is_chunked(&self) -> bool {
        self.transfer_encoding.iter().any(|coding| coding.trim().eq_ignore_ascii_case("chunked"))
    }

    fn declared_length(&self) -> Option<u64> {
        u64::try_from(self.content_length).ok().filter(|n| *n > 0)
    }

    pub fn framing(&self) -> Framing {
        if self.is_chunked() {
            return Framing::Chunked;
        }
        match self.declared_length() {
            Some(length) => Framing::Length(length),
            None if self.content_length == 0 => Framing::Empty,
            None => Framing::UntilClose,
        }
    }

    /// Writes the header lines announcing the body framing.
    pub fn write_header(&self, dst: &mut BytesMut) -> Result<(), SendError> {
        FramingEncoder.encode((self.framing(), self.trailer.as_ref()), dst)
    }

    /// Picks how a body of `kind` is written to a destination that can, or
    /// cannot, pull bodies in bulk.
    ///
    /// A file of unknown length still takes the bulk path, an in-memory body of
    /// unknown length does not. A declared length always caps the bulk path.
    pub fn select_strategy(&self, kind: ReaderKind, bulk_capable: bool) -> TransferStrategy {
        if self.is_chunked() {
            return TransferStrategy::Chunked;
        }
        if self.content_length == 0 {
            return TransferStrategy::NoBody;
        }

        let is_file = kind == ReaderKind::KnownFile;
        let known_length = self.declared_length().is_some();
        if bulk_capable && (known_length || is_file) {
            return TransferStrategy::Bulk { bounded: known_length };
        }
        TransferStrategy::Plain { bounded: known_length }
    }

    /// Transmits `body` to `dst`.
    ///
    /// The body reader is only borrowed: it is neither closed nor consumed
    /// past what was sent. Errors are returned as soon as they happen.
    ///
    /// # Errors
    ///
    /// - [`SendError::Io`] when writing to `dst` fails
    /// - [`SendError::Read`] when reading `body` fails
    /// - [`SendError::ContentLengthMismatch`] when `body` ends before the declared length
    pub async fn write_body<W>(&self, body: &mut BodyReader, dst: &mut W) -> Result<Transfer, SendError>
    where
        W: BodySink + ?Sized,
    {
        let kind = classify(body);
        let bulk = dst.bulk_transfer();
        let strategy = self.select_strategy(kind, bulk.is_some());
        debug!(?strategy, ?kind, content_length = self.content_length, method = %self.method, "write body");

        let body_bytes = match (strategy, bulk) {
            (TransferStrategy::NoBody, _) => 0,
            (TransferStrategy::Chunked, _) => self.write_chunked(body, dst).await?,
            (TransferStrategy::Bulk { bounded }, Some(bulk)) => self.write_bulk(body, bulk, bounded).await?,
            (TransferStrategy::Bulk { bounded }, None) | (TransferStrategy::Plain { bounded }, _) => {
                self.write_plain(body, dst, bounded).await?
            }
        };

        trace!(size = body_bytes, "finished writing body");
        Ok(Transfer { strategy, body_bytes })
    }

    async fn write_bulk(&self, body: &mut BodyReader, bulk: &mut dyn BulkTransfer, bounded: bool) -> Result<u64, SendError> {
        match self.declared_length() {
            Some(declared) if bounded => {
                let mut limited = LimitedReader::new(body, declared);
                bulk.read_from(&mut limited).await?;
                let sent = limited.bytes_read();
                ensure!(sent == declared, SendError::content_length_mismatch(declared, sent));
                Ok(sent)
            }
            _ => Ok(bulk.read_from(body).await?),
        }
    }

    async fn write_plain<W>(&self, body: &mut BodyReader, dst: &mut W, bounded: bool) -> Result<u64, SendError>
    where
        W: BodySink + ?Sized,
    {
        let limit = if bounded { self.declared_length() } else { None };
        let flush_each = self.method == Method::CONNECT;
        let mut buf = vec![0u8; self.buffer_size];
        let mut sent = 0u64;

        loop {
            let max = match limit {
                Some(limit) => cmp::min(limit - sent, buf.len() as u64) as usize,
                None => buf.len(),
            };
            if max == 0 {
                break;
            }

            let n = body.read(&mut buf[..max]).await.map_err(SendError::read)?;
            if n == 0 {
                break;
            }
            dst.write_all(&buf[..n]).await?;
            if flush_each {
                dst.flush().await?;
            }
            sent += n as u64;
        }

        if let Some(declared) = limit {
            ensure!(sent == declared, SendError::content_length_mismatch(declared, sent));
        }
        dst.flush().await?;
        Ok(sent)
    }

    async fn write_chunked<W>(&self, body: &mut BodyReader, dst: &mut W) -> Result<u64, SendError>
    where
        W: BodySink + ?Sized,
    {
        let flush_each = self.method == Method::CONNECT;
        let mut encoder = ChunkedEncoder::new();
        let mut buf = vec![0u8; self.buffer_size];
        let mut frame = BytesMut::with_capacity(self.buffer_size + 16);

        loop {
            let n = body.read(&mut buf).await.map_err(SendError::read)?;
            if n == 0 {
                break;
            }
            encoder.encode(PayloadItem::Chunk(&buf[..n]), &mut frame)?;
            dst.write_all(&frame).await?;
            frame.clear();
            if flush_each {
                dst.flush().await?;
            }
        }

        let last = match &self.trailer {
            Some(trailer) => PayloadItem::<Bytes>::Trailers(trailer.clone()),
            None => PayloadItem::Eof,
        };
        encoder.encode(last, &mut frame)?;
        dst.write_all(&frame).await?;
        dst.flush().await?;
        Ok(encoder.send_size())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ErrorKind;

    #[test]
    fn chunked_wins_over_length() {
        let writer = TransferWriter::new(10).transfer_encoding(["gzip", "Chunked"]);
        assert!(writer.is_chunked());
        assert_eq!(writer.framing(), Framing::Chunked);
        assert_eq!(writer.select_strategy(ReaderKind::KnownFile, true), TransferStrategy::Chunked);
    }

    #[test]
    fn strategy_table() {
        use ReaderKind::{Generic, KnownFile, KnownInMemory};
        use TransferStrategy::{Bulk, NoBody, Plain};

        let put = |length| TransferWriter::new(length).method(Method::PUT);
        let connect = |length| TransferWriter::new(length).method(Method::CONNECT);

        let cases = [
            (put(1024), KnownFile, true, Bulk { bounded: true }),
            (put(1024), KnownInMemory, true, Bulk { bounded: true }),
            (put(1024), Generic, true, Bulk { bounded: true }),
            (put(-1), KnownFile, true, Bulk { bounded: false }),
            (put(-1), KnownInMemory, true, Plain { bounded: false }),
            (put(-1), Generic, true, Plain { bounded: false }),
            (connect(-1), KnownFile, true, Bulk { bounded: false }),
            (connect(-1), KnownInMemory, true, Plain { bounded: false }),
            (connect(1024), KnownFile, true, Bulk { bounded: true }),
            (connect(1024), KnownInMemory, true, Bulk { bounded: true }),
            (put(1024), KnownFile, false, Plain { bounded: true }),
            (put(-1), KnownFile, false, Plain { bounded: false }),
            (put(0), KnownFile, true, NoBody),
        ];

        for (writer, kind, bulk_capable, expected) in cases {
            assert_eq!(writer.select_strategy(kind, bulk_capable), expected, "{writer:?} {kind:?} bulk={bulk_capable}");
        }
    }

    #[test]
    fn framing_headers() {
        let mut dst = BytesMut::new();
        TransferWriter::new(5).write_header(&mut dst).unwrap();
        assert_eq!(&dst[..], b"content-length: 5\r\n");

        let mut dst = BytesMut::new();
        TransferWriter::new(-1).write_header(&mut dst).unwrap();
        assert!(dst.is_empty());

        let mut trailer = HeaderMap::new();
        trailer.insert("x-checksum", "abc".parse().unwrap());
        let mut dst = BytesMut::new();
        TransferWriter::new(-1).transfer_encoding(["chunked"]).trailer(trailer).write_header(&mut dst).unwrap();
        assert_eq!(&dst[..], b"transfer-encoding: chunked\r\ntrailer: x-checksum\r\n");
    }

    #[tokio::test]
    async fn plain_bounded_write() {
        let mut body = BodyReader::from("hello world");
        let mut dst = Vec::new();

        let transfer = TransferWriter::new(5).write_body(&mut body, &mut dst).await.unwrap();
        assert_eq!(transfer, Transfer { strategy: TransferStrategy::Plain { bounded: true }, body_bytes: 5 });
        assert_eq!(dst, b"hello");
        assert_eq!(body.len_hint(), Some(6));
    }

    #[tokio::test]
    async fn short_body_is_a_mismatch() {
        let mut body = BodyReader::from("abc");
        let mut dst = Vec::new();

        let error = TransferWriter::new(10).write_body(&mut body, &mut dst).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::ContentLengthMismatch);
        assert_eq!(error.to_string(), "content-length 10 declared but body ended after 3 bytes");
    }

    #[tokio::test]
    async fn chunked_write_with_trailers() {
        let mut trailer = HeaderMap::new();
        trailer.insert("x-checksum", "abc".parse().unwrap());
        let writer = TransferWriter::new(-1).transfer_encoding(["chunked"]).trailer(trailer).buffer_size(4);

        let mut body = BodyReader::from("hello");
        let mut dst = Vec::new();
        let transfer = writer.write_body(&mut body, &mut dst).await.unwrap();

        assert_eq!(transfer.body_bytes, 5);
        assert_eq!(dst, b"4\r\nhell\r\n1\r\no\r\n0\r\nx-checksum: abc\r\n\r\n");
    }

    #[tokio::test]
    async fn zero_length_writes_nothing() {
        let mut body = BodyReader::from("ignored");
        let mut dst = Vec::new();

        let transfer = TransferWriter::new(0).write_body(&mut body, &mut dst).await.unwrap();
        assert_eq!(transfer, Transfer { strategy: TransferStrategy::NoBody, body_bytes: 0 });
        assert!(dst.is_empty());
    }
}
