use std::io;

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncWrite, BufWriter, DuplexStream};
use tokio::net::TcpStream;
use tracing::trace;

/// A destination that pulls a whole source through its own copy loop.
///
/// This is the fast path of a body transfer: the destination reads the
/// source directly instead of receiving one write per buffer.
#[async_trait]
pub trait BulkTransfer: Send {
    /// Copies `src` to this destination until `src` is exhausted, returning the bytes copied.
    async fn read_from(&mut self, src: &mut (dyn AsyncRead + Send + Unpin)) -> io::Result<u64>;
}

/// The destination of a message body.
///
/// Every sink takes plain writes; a sink that can also pull a source in bulk
/// advertises it through [`BodySink::bulk_transfer`].
pub trait BodySink: AsyncWrite + Unpin {
    fn bulk_transfer(&mut self) -> Option<&mut dyn BulkTransfer> {
        None
    }
}

impl<S: BodySink + ?Sized> BodySink for &mut S {
    fn bulk_transfer(&mut self) -> Option<&mut dyn BulkTransfer> {
        (**self).bulk_transfer()
    }
}

impl BodySink for Vec<u8> {}

impl BodySink for DuplexStream {}

impl<W: AsyncWrite + Unpin> BodySink for BufWriter<W> {}

impl BodySink for TcpStream {
    fn bulk_transfer(&mut self) -> Option<&mut dyn BulkTransfer> {
        Some(self)
    }
}

#[async_trait]
impl BulkTransfer for TcpStream {
    async fn read_from(&mut self, src: &mut (dyn AsyncRead + Send + Unpin)) -> io::Result<u64> {
        let n = tokio::io::copy(src, self).await?;
        trace!(size = n, "bulk copied into tcp stream");
        Ok(n)
    }
}

impl BodySink for File {
    fn bulk_transfer(&mut self) -> Option<&mut dyn BulkTransfer> {
        Some(self)
    }
}

#[async_trait]
impl BulkTransfer for File {
    async fn read_from(&mut self, src: &mut (dyn AsyncRead + Send + Unpin)) -> io::Result<u64> {
        let n = tokio::io::copy(src, self).await?;
        trace!(size = n, "bulk copied into file");
        Ok(n)
    }
}
