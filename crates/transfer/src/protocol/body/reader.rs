use std::fmt;
use std::io;
use std::io::Cursor;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncRead, ReadBuf};

/// What the writer knows about a body source.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ReaderKind {
    /// Anything else: a pipe, a socket, a decoded body.
    Generic,
    /// The whole body is already in memory.
    KnownInMemory,
    /// The body is read from a file.
    KnownFile,
}

/// The source of an outgoing message body.
///
/// The variants are the reader shapes the transfer writer knows how to
/// treat; everything else goes through [`BodyReader::stream`].
pub enum BodyReader {
    InMemory(Cursor<Bytes>),
    File(File),
    Stream(Box<dyn AsyncRead + Send + Unpin>),
    /// A reader whose close is a no-op, wrapping another reader.
    NopClose(Box<BodyReader>),
}

impl BodyReader {
    pub fn empty() -> Self {
        Self::InMemory(Cursor::new(Bytes::new()))
    }

    pub fn stream<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self::Stream(Box::new(reader))
    }

    pub fn nop_close(reader: BodyReader) -> Self {
        Self::NopClose(Box::new(reader))
    }

    pub fn kind(&self) -> ReaderKind {
        classify(self)
    }

    /// Number of bytes left, when the reader knows it without reading.
    pub fn len_hint(&self) -> Option<u64> {
        match self {
            BodyReader::InMemory(cursor) => Some((cursor.get_ref().len() as u64).saturating_sub(cursor.position())),
            BodyReader::NopClose(inner) => inner.len_hint(),
            BodyReader::File(_) | BodyReader::Stream(_) => None,
        }
    }
}

/// Classifies a body source.
///
/// Exactly one [`BodyReader::NopClose`] layer is looked through; a reader
/// wrapped twice is [`ReaderKind::Generic`].
pub fn classify(reader: &BodyReader) -> ReaderKind {
    let reader = match reader {
        BodyReader::NopClose(inner) => inner.as_ref(),
        other => other,
    };

    match reader {
        BodyReader::InMemory(_) => ReaderKind::KnownInMemory,
        BodyReader::File(_) => ReaderKind::KnownFile,
        BodyReader::Stream(_) | BodyReader::NopClose(_) => ReaderKind::Generic,
    }
}

impl AsyncRead for BodyReader {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            BodyReader::InMemory(cursor) => Pin::new(cursor).poll_read(cx, buf),
            BodyReader::File(file) => Pin::new(file).poll_read(cx, buf),
            BodyReader::Stream(stream) => Pin::new(stream).poll_read(cx, buf),
            BodyReader::NopClose(inner) => Pin::new(inner.as_mut()).poll_read(cx, buf),
        }
    }
}

impl fmt::Debug for BodyReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyReader::InMemory(cursor) => f.debug_tuple("InMemory").field(&cursor.get_ref().len()).finish(),
            BodyReader::File(file) => f.debug_tuple("File").field(file).finish(),
            BodyReader::Stream(_) => f.write_str("Stream"),
            BodyReader::NopClose(inner) => f.debug_tuple("NopClose").field(inner).finish(),
        }
    }
}

impl From<Bytes> for BodyReader {
    fn from(bytes: Bytes) -> Self {
        Self::InMemory(Cursor::new(bytes))
    }
}

impl From<Vec<u8>> for BodyReader {
    fn from(vec: Vec<u8>) -> Self {
        Bytes::from(vec).into()
    }
}

impl From<String> for BodyReader {
    fn from(s: String) -> Self {
        Bytes::from(s).into()
    }
}

impl From<&'static [u8]> for BodyReader {
    fn from(slice: &'static [u8]) -> Self {
        Bytes::from_static(slice).into()
    }
}

impl From<&'static str> for BodyReader {
    fn from(s: &'static str) -> Self {
        Bytes::from_static(s.as_bytes()).into()
    }
}

impl From<File> for BodyReader {
    fn from(file: File) -> Self {
        Self::File(file)
    }
}
