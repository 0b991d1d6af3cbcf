use std::cmp;
use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use pin_project_lite::pin_project;
use tokio::io::{AsyncRead, ReadBuf};

pin_project! {
    /// Reads at most `limit` bytes from the inner reader and counts what went through.
    #[derive(Debug)]
    pub struct LimitedReader<R> {
        #[pin]
        inner: R,
        remaining: u64,
        read: u64,
    }
}

impl<R> LimitedReader<R> {
    pub fn new(inner: R, limit: u64) -> Self {
        Self { inner, remaining: limit, read: 0 }
    }

    /// Bytes handed out so far.
    pub fn bytes_read(&self) -> u64 {
        self.read
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: AsyncRead> AsyncRead for LimitedReader<R> {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let this = self.project();
        if *this.remaining == 0 || buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }

        let max = cmp::min(buf.remaining() as u64, *this.remaining) as usize;
        let mut limited = ReadBuf::new(buf.initialize_unfilled_to(max));
        ready!(this.inner.poll_read(cx, &mut limited))?;

        let n = limited.filled().len();
        buf.advance(n);
        *this.remaining -= n as u64;
        *this.read += n as u64;
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn stops_at_limit() {
        let mut reader = LimitedReader::new(&b"hello world"[..], 5);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();

        assert_eq!(out, b"hello");
        assert_eq!(reader.bytes_read(), 5);
        assert_eq!(reader.remaining(), 0);
        assert_eq!(reader.into_inner(), b" world");
    }

    #[tokio::test]
    async fn short_source_is_counted() {
        let mut reader = LimitedReader::new(&b"abc"[..], 10);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();

        assert_eq!(reader.bytes_read(), 3);
        assert_eq!(reader.remaining(), 7);
    }
}
