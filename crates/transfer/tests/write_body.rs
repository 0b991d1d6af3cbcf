use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use bytes::BytesMut;
use http::{HeaderMap, Method};
use micro_http_transfer::protocol::body::{BodyReader, ReaderKind};
use micro_http_transfer::protocol::ErrorKind;
use micro_http_transfer::transfer::{BodySink, BulkTransfer, TransferStrategy, TransferWriter};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio_test::io::Builder;

/// A sink recording how the body reached it.
#[derive(Debug, Default)]
struct RecordingSink {
    bulk_capable: bool,
    bulk_fails: bool,
    bulk_calls: usize,
    write_calls: usize,
    flush_calls: usize,
    received: Vec<u8>,
}

impl RecordingSink {
    fn bulk() -> Self {
        Self { bulk_capable: true, ..Default::default() }
    }

    fn broken_bulk() -> Self {
        Self { bulk_capable: true, bulk_fails: true, ..Default::default() }
    }
}

impl AsyncWrite for RecordingSink {
    fn poll_write(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        self.write_calls += 1;
        self.received.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.flush_calls += 1;
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

impl BodySink for RecordingSink {
    fn bulk_transfer(&mut self) -> Option<&mut dyn BulkTransfer> {
        if self.bulk_capable { Some(self) } else { None }
    }
}

#[async_trait]
impl BulkTransfer for RecordingSink {
    async fn read_from(&mut self, src: &mut (dyn AsyncRead + Send + Unpin)) -> io::Result<u64> {
        self.bulk_calls += 1;
        if self.bulk_fails {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        }
        let n = src.read_to_end(&mut self.received).await?;
        Ok(n as u64)
    }
}

/// A sink whose every write fails.
#[derive(Debug)]
struct BrokenSink;

impl AsyncWrite for BrokenSink {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, _buf: &[u8]) -> Poll<io::Result<usize>> {
        Poll::Ready(Err(io::Error::from(io::ErrorKind::BrokenPipe)))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

impl BodySink for BrokenSink {}

struct TempFile {
    path: PathBuf,
}

impl TempFile {
    async fn create(name: &str, len: usize) -> Self {
        let path = std::env::temp_dir().join(format!("micro-http-transfer-{}-{name}", std::process::id()));
        tokio::fs::write(&path, vec![0u8; len]).await.unwrap();
        Self { path }
    }

    async fn open(&self) -> BodyReader {
        tokio::fs::File::open(&self.path).await.unwrap().into()
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

fn buffer() -> BodyReader {
    vec![0u8; 1024].into()
}

#[derive(Debug)]
enum Source {
    File,
    Buffer,
}

struct Case {
    name: &'static str,
    source: Source,
    nop_close: bool,
    method: Method,
    content_length: i64,
    transfer_encoding: &'static [&'static str],
    expected: TransferStrategy,
}

#[tokio::test]
async fn reader_types_pick_the_strategy() {
    let cases = [
        Case {
            name: "file, non-chunked, size set",
            source: Source::File,
            nop_close: false,
            method: Method::PUT,
            content_length: 1024,
            transfer_encoding: &[],
            expected: TransferStrategy::Bulk { bounded: true },
        },
        Case {
            name: "file, non-chunked, size set, nop close wrapped",
            source: Source::File,
            nop_close: true,
            method: Method::PUT,
            content_length: 1024,
            transfer_encoding: &[],
            expected: TransferStrategy::Bulk { bounded: true },
        },
        Case {
            name: "file, non-chunked, negative size",
            source: Source::File,
            nop_close: false,
            method: Method::PUT,
            content_length: -1,
            transfer_encoding: &[],
            expected: TransferStrategy::Bulk { bounded: false },
        },
        Case {
            name: "file, non-chunked, CONNECT, negative size",
            source: Source::File,
            nop_close: false,
            method: Method::CONNECT,
            content_length: -1,
            transfer_encoding: &[],
            expected: TransferStrategy::Bulk { bounded: false },
        },
        Case {
            name: "file, chunked",
            source: Source::File,
            nop_close: false,
            method: Method::PUT,
            content_length: -1,
            transfer_encoding: &["chunked"],
            expected: TransferStrategy::Chunked,
        },
        Case {
            name: "buffer, non-chunked, size set",
            source: Source::Buffer,
            nop_close: false,
            method: Method::PUT,
            content_length: 1024,
            transfer_encoding: &[],
            expected: TransferStrategy::Bulk { bounded: true },
        },
        Case {
            name: "buffer, non-chunked, size set, nop close wrapped",
            source: Source::Buffer,
            nop_close: true,
            method: Method::PUT,
            content_length: 1024,
            transfer_encoding: &[],
            expected: TransferStrategy::Bulk { bounded: true },
        },
        Case {
            name: "buffer, non-chunked, negative size",
            source: Source::Buffer,
            nop_close: false,
            method: Method::PUT,
            content_length: -1,
            transfer_encoding: &[],
            expected: TransferStrategy::Plain { bounded: false },
        },
        Case {
            name: "buffer, non-chunked, CONNECT, negative size",
            source: Source::Buffer,
            nop_close: false,
            method: Method::CONNECT,
            content_length: -1,
            transfer_encoding: &[],
            expected: TransferStrategy::Plain { bounded: false },
        },
        Case {
            name: "buffer, chunked",
            source: Source::Buffer,
            nop_close: false,
            method: Method::PUT,
            content_length: -1,
            transfer_encoding: &["chunked"],
            expected: TransferStrategy::Chunked,
        },
    ];

    for (i, case) in cases.into_iter().enumerate() {
        let temp = TempFile::create(&format!("reader-types-{i}"), 1024).await;
        let mut body = match case.source {
            Source::File => temp.open().await,
            Source::Buffer => buffer(),
        };
        if case.nop_close {
            body = BodyReader::nop_close(body);
        }

        let writer = TransferWriter::new(case.content_length)
            .method(case.method.clone())
            .transfer_encoding(case.transfer_encoding.iter().copied());
        let mut sink = RecordingSink::bulk();
        let transfer = writer.write_body(&mut body, &mut sink).await.unwrap();

        assert_eq!(transfer.strategy, case.expected, "{}", case.name);
        match case.expected {
            TransferStrategy::Bulk { .. } => {
                assert_eq!(sink.bulk_calls, 1, "{}", case.name);
                assert_eq!(sink.write_calls, 0, "{}", case.name);
                assert_eq!(sink.received.len(), 1024, "{}", case.name);
            }
            TransferStrategy::Plain { .. } | TransferStrategy::Chunked => {
                assert_eq!(sink.bulk_calls, 0, "{}", case.name);
                assert!(sink.write_calls > 0, "{}", case.name);
            }
            TransferStrategy::NoBody => unreachable!(),
        }
        assert_eq!(transfer.body_bytes, 1024, "{}", case.name);
    }
}

#[tokio::test]
async fn bounded_bulk_stops_at_declared_length() {
    let temp = TempFile::create("bounded-bulk", 2048).await;
    let mut body = temp.open().await;
    let mut sink = RecordingSink::bulk();

    let transfer = TransferWriter::new(1024).method(Method::PUT).write_body(&mut body, &mut sink).await.unwrap();
    assert_eq!(transfer.strategy, TransferStrategy::Bulk { bounded: true });
    assert_eq!(sink.received.len(), 1024);
}

#[tokio::test]
async fn connect_with_declared_length_stays_bounded() {
    let source = TempFile::create("connect-source", 2048).await;
    let target = TempFile::create("connect-target", 0).await;
    let mut body = source.open().await;
    let mut sink = tokio::fs::File::create(&target.path).await.unwrap();

    let writer = TransferWriter::new(1024).method(Method::CONNECT);
    let mut header = BytesMut::new();
    writer.write_header(&mut header).unwrap();
    assert_eq!(&header[..], b"content-length: 1024\r\n");

    let transfer = writer.write_body(&mut body, &mut sink).await.unwrap();
    assert_eq!(transfer.strategy, TransferStrategy::Bulk { bounded: true });
    assert_eq!(transfer.body_bytes, 1024);

    drop(sink);
    assert_eq!(tokio::fs::read(&target.path).await.unwrap().len(), 1024);
}

#[tokio::test]
async fn connect_file_without_length_is_sent_whole() {
    let temp = TempFile::create("connect-file", 2048).await;
    let mut body = temp.open().await;
    let mut sink = RecordingSink::bulk();

    let transfer = TransferWriter::new(-1).method(Method::CONNECT).write_body(&mut body, &mut sink).await.unwrap();
    assert_eq!(transfer.strategy, TransferStrategy::Bulk { bounded: false });
    assert_eq!(transfer.body_bytes, 2048);
}

#[tokio::test]
async fn connect_flushes_every_write() {
    let mut body = BodyReader::stream(Builder::new().read(b"hello ").read(b"tunnel").build());
    assert_eq!(body.kind(), ReaderKind::Generic);
    let mut sink = RecordingSink::default();

    let writer = TransferWriter::new(-1).method(Method::CONNECT);
    let transfer = writer.write_body(&mut body, &mut sink).await.unwrap();

    assert_eq!(transfer.strategy, TransferStrategy::Plain { bounded: false });
    assert_eq!(sink.received, b"hello tunnel");
    assert!(sink.flush_calls >= sink.write_calls);
}

#[tokio::test]
async fn file_without_bulk_sink_is_written_plainly() {
    let temp = TempFile::create("plain-file", 1024).await;
    let mut body = temp.open().await;
    let mut sink = Vec::new();

    let transfer = TransferWriter::new(1024).write_body(&mut body, &mut sink).await.unwrap();
    assert_eq!(transfer.strategy, TransferStrategy::Plain { bounded: true });
    assert_eq!(sink.len(), 1024);
}

#[tokio::test]
async fn short_bulk_body_is_a_mismatch() {
    let mut body = BodyReader::from("short");
    let mut sink = RecordingSink::bulk();

    let error = TransferWriter::new(1024).write_body(&mut body, &mut sink).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::ContentLengthMismatch);
}

#[tokio::test]
async fn chunked_body_with_trailers_on_the_wire() {
    let mut trailer = HeaderMap::new();
    trailer.insert("x-checksum", "abc".parse().unwrap());
    let writer = TransferWriter::new(-1).transfer_encoding(["chunked"]).trailer(trailer);

    let mut body = BodyReader::stream(Builder::new().read(b"Body here\n").read(b"continued").build());
    let mut sink = RecordingSink::bulk();
    let transfer = writer.write_body(&mut body, &mut sink).await.unwrap();

    assert_eq!(transfer.body_bytes, 19);
    assert_eq!(sink.bulk_calls, 0);
    assert_eq!(sink.received, b"A\r\nBody here\n\r\n9\r\ncontinued\r\n0\r\nx-checksum: abc\r\n\r\n");
}

#[tokio::test]
async fn write_failure_is_reported() {
    let mut body = BodyReader::from("hello");
    let error = TransferWriter::new(5).write_body(&mut body, &mut BrokenSink).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::TransportWriteFailure);
}

#[tokio::test]
async fn bulk_failure_is_reported_without_retry() {
    let mut body = BodyReader::from("hello");
    let mut sink = RecordingSink::broken_bulk();

    let error = TransferWriter::new(5).write_body(&mut body, &mut sink).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::TransportWriteFailure);
    assert_eq!(sink.bulk_calls, 1);
    assert_eq!(sink.write_calls, 0);
}

#[tokio::test]
async fn chunked_write_failure_is_reported() {
    let mut body = BodyReader::from("hello");
    let writer = TransferWriter::new(-1).transfer_encoding(["chunked"]);

    let error = writer.write_body(&mut body, &mut BrokenSink).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::TransportWriteFailure);
}

#[tokio::test]
async fn read_failure_is_reported() {
    let source = Builder::new().read(b"hel").read_error(io::Error::from(io::ErrorKind::ConnectionAborted)).build();
    let mut body = BodyReader::stream(source);
    let mut sink = Vec::new();

    let error = TransferWriter::new(5).write_body(&mut body, &mut sink).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::TransportReadFailure);
    assert_eq!(sink, b"hel");
}
