use std::cmp;
use std::fmt;
use std::future::poll_fn;
use std::io;
use std::mem;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::{Buf, Bytes, BytesMut};
use http::HeaderMap;
use http_body::{Frame, SizeHint};
use tokio::io::{AsyncRead, ReadBuf};
use tokio_util::codec::Decoder;
use tokio_util::io::poll_read_buf;
use tracing::{debug, trace, warn};

use crate::codec::body::PayloadDecoder;
use crate::codec::header::{parse_declared_trailers, parse_framing, MessageKind, TrailerDecoder};
use crate::protocol::{BodyConfig, Framing, ParseError, PayloadItem};

/// Status returned together with the byte count of a successful read.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReadStatus {
    /// The body may have more bytes.
    MoreData,
    /// The body ended; the bytes of this read are the last ones.
    EndOfStream,
}

/// Progress of the trailer section of a body.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TrailerState {
    /// The payload is still being read, or the body failed before its trailer section.
    NotReached,
    /// Part of the trailer section was read, the rest is still to come.
    Parsing,
    /// The body ended, with or without trailer fields.
    Complete,
    /// The trailer section was missing or malformed.
    Failed,
}

enum BodyState {
    Open { decoder: PayloadDecoder, pending: Bytes },
    EndOfStream,
    Failed(ParseError),
}

/// The transport half of a body: the source and the bytes read from it but not decoded yet.
struct Transport<R> {
    io: R,
    read_buf: BytesMut,
    eof: bool,
    read_size: usize,
}

impl<R: AsyncRead + Unpin> Transport<R> {
    /// Decodes the next payload item, reading from the source as often as needed.
    fn poll_decode(&mut self, cx: &mut Context<'_>, decoder: &mut PayloadDecoder) -> Poll<Result<PayloadItem, ParseError>> {
        loop {
            let item = if self.eof { decoder.decode_eof(&mut self.read_buf)? } else { decoder.decode(&mut self.read_buf)? };
            if let Some(item) = item {
                return Poll::Ready(Ok(item));
            }

            if self.eof {
                return Poll::Ready(Err(ParseError::unexpected_eof("transport closed before the body ended")));
            }

            self.read_buf.reserve(self.read_size);
            let n = ready!(poll_read_buf(Pin::new(&mut self.io), cx, &mut self.read_buf))?;
            if n == 0 {
                trace!("transport reached eof");
                self.eof = true;
            }
        }
    }

    /// Decodes the next payload item from buffered bytes only.
    fn decode_buffered(&mut self, decoder: &mut PayloadDecoder) -> Result<Option<PayloadItem>, ParseError> {
        if self.eof { decoder.decode_eof(&mut self.read_buf) } else { decoder.decode(&mut self.read_buf) }
    }
}

/// A message body read from a transport according to its framing.
///
/// `Body` owns the transport while the body is open and hands out exactly the
/// body bytes: chunk framing, trailer sections and anything after the body
/// boundary never reach the caller. It can be consumed with [`Body::read`],
/// through the [`http_body::Body`] implementation, or as an [`AsyncRead`].
///
/// The read contract:
/// - the read that hands out the last body bytes also reports
///   [`ReadStatus::EndOfStream`] whenever the boundary is already buffered
/// - after end of stream every read returns `(0, EndOfStream)`
/// - after a failure every read returns the same error
/// - a malformed trailer or a transport EOF before the boundary is never
///   reported as end of stream
pub struct Body<R> {
    transport: Transport<R>,
    state: BodyState,
    framing: Framing,
    trailer_expected: bool,
    trailers: Option<HeaderMap>,
    trailer_failed: bool,
    config: BodyConfig,
}

impl<R> Body<R>
where
    R: AsyncRead + Unpin,
{
    /// Creates a body read from `source` with the given framing.
    pub fn new(source: R, framing: Framing) -> Self {
        Self::with_config(source, framing, BodyConfig::default())
    }

    pub fn with_config(source: R, framing: Framing, config: BodyConfig) -> Self {
        let transport = Transport { io: source, read_buf: BytesMut::new(), eof: false, read_size: config.get_read_buffer_size() };
        let decoder = PayloadDecoder::new(framing, trailer_decoder(&config));
        Self {
            transport,
            state: BodyState::Open { decoder, pending: Bytes::new() },
            framing,
            trailer_expected: false,
            trailers: None,
            trailer_failed: false,
            config,
        }
    }

    /// Creates a body from the framing headers of a message.
    ///
    /// A chunked body announcing fields with the `Trailer` header expects a
    /// trailer section; every chunked body reads one anyway.
    pub fn from_headers(source: R, headers: &HeaderMap, kind: MessageKind, config: BodyConfig) -> Result<Self, ParseError> {
        let framing = parse_framing(headers, kind)?;
        let trailer_expected = framing.is_chunked() && !parse_declared_trailers(headers)?.is_empty();
        debug!(?framing, trailer_expected, "create body from headers");

        let mut body = Self::with_config(source, framing, config);
        body.trailer_expected = trailer_expected;
        Ok(body)
    }

    /// Seeds the body with bytes already read from the source, typically
    /// whatever followed the header block in the header read.
    pub fn with_read_buffer(mut self, buf: BytesMut) -> Self {
        self.transport.read_buf = buf;
        self
    }

    /// Forces a trailer section to be read after the payload, whatever the framing.
    ///
    /// Must be called before the first read.
    pub fn expect_trailers(mut self, expected: bool) -> Self {
        self.trailer_expected = expected || (self.trailer_expected && self.framing.is_chunked());
        if let BodyState::Open { decoder, .. } = &mut self.state {
            let fresh = PayloadDecoder::new(self.framing, trailer_decoder(&self.config));
            *decoder = if expected { fresh.force_trailer(trailer_decoder(&self.config)) } else { fresh };
        }
        self
    }

    /// Reads body bytes into `buf`.
    ///
    /// Waits on the transport only when no byte could be copied yet, then keeps
    /// decoding already buffered bytes to fill `buf` and to notice the end of
    /// the body. An error met after some bytes were copied is returned by the
    /// next read.
    pub fn poll_read(&mut self, cx: &mut Context<'_>, buf: &mut [u8]) -> Poll<Result<(usize, ReadStatus), ParseError>> {
        let mut filled = 0;

        let outcome = {
            let (decoder, pending) = match &mut self.state {
                BodyState::EndOfStream => return Poll::Ready(Ok((0, ReadStatus::EndOfStream))),
                BodyState::Failed(e) => return Poll::Ready(Err(e.clone())),
                BodyState::Open { decoder, pending } => (decoder, pending),
            };

            if buf.is_empty() {
                return Poll::Ready(Ok((0, ReadStatus::MoreData)));
            }

            loop {
                if !pending.is_empty() {
                    let n = cmp::min(pending.len(), buf.len() - filled);
                    buf[filled..filled + n].copy_from_slice(&pending[..n]);
                    pending.advance(n);
                    filled += n;
                    if !pending.is_empty() {
                        break Ok(ReadStatus::MoreData);
                    }
                }

                let item = if filled == 0 {
                    ready!(self.transport.poll_decode(cx, decoder))
                } else {
                    match self.transport.decode_buffered(decoder) {
                        Ok(Some(item)) => Ok(item),
                        Ok(None) => break Ok(ReadStatus::MoreData),
                        Err(e) => Err(e),
                    }
                };

                match item {
                    Ok(PayloadItem::Chunk(bytes)) => {
                        *pending = bytes;
                        if filled == buf.len() {
                            break Ok(ReadStatus::MoreData);
                        }
                    }
                    Ok(PayloadItem::Trailers(trailers)) => {
                        trace!(fields = trailers.len(), "received trailers");
                        self.trailers = Some(trailers);
                    }
                    Ok(PayloadItem::Eof) => break Ok(ReadStatus::EndOfStream),
                    Err(e) => break Err(e),
                }
            }
        };

        match outcome {
            Ok(ReadStatus::EndOfStream) => {
                self.finish();
                Poll::Ready(Ok((filled, ReadStatus::EndOfStream)))
            }
            Ok(ReadStatus::MoreData) => Poll::Ready(Ok((filled, ReadStatus::MoreData))),
            Err(e) => {
                self.fail(e.clone());
                if filled > 0 { Poll::Ready(Ok((filled, ReadStatus::MoreData))) } else { Poll::Ready(Err(e)) }
            }
        }
    }

    /// Reads body bytes into `buf`, see [`Body::poll_read`].
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<(usize, ReadStatus), ParseError> {
        poll_fn(|cx| self.poll_read(cx, buf)).await
    }

    /// Releases the decode state once the body reached its end.
    fn finish(&mut self) {
        trace!(framing = ?self.framing, "body reached end of stream");
        self.state = BodyState::EndOfStream;
        if self.transport.read_buf.is_empty() {
            self.transport.read_buf = BytesMut::new();
        }
    }

    fn fail(&mut self, e: ParseError) {
        if let BodyState::Open { decoder, .. } = &self.state {
            self.trailer_failed = decoder.in_trailer();
        }
        warn!(cause = %e, framing = ?self.framing, "body read failed");
        self.state = BodyState::Failed(e);
        self.transport.read_buf = BytesMut::new();
    }
}

impl<R> Body<R> {
    pub fn framing(&self) -> Framing {
        self.framing
    }

    /// Returns whether the sender announced trailer fields, or they were forced.
    pub fn trailer_expected(&self) -> bool {
        self.trailer_expected
    }

    /// The trailer fields received after the last chunk, once the body ended.
    pub fn trailers(&self) -> Option<&HeaderMap> {
        self.trailers.as_ref()
    }

    pub fn trailer_state(&self) -> TrailerState {
        match &self.state {
            BodyState::Open { decoder, .. } if decoder.in_trailer() => TrailerState::Parsing,
            BodyState::Open { .. } => TrailerState::NotReached,
            BodyState::EndOfStream => TrailerState::Complete,
            BodyState::Failed(_) if self.trailer_failed => TrailerState::Failed,
            BodyState::Failed(_) => TrailerState::NotReached,
        }
    }

    /// Returns whether the end of the body was reached.
    pub fn is_eof(&self) -> bool {
        matches!(self.state, BodyState::EndOfStream)
    }

    /// Gives the source back, along with the bytes read from it past the body boundary.
    pub fn into_inner(self) -> (R, Bytes) {
        (self.transport.io, self.transport.read_buf.freeze())
    }
}

fn trailer_decoder(config: &BodyConfig) -> TrailerDecoder {
    TrailerDecoder::new(config.get_max_trailer_bytes(), config.get_max_trailer_fields())
}

impl<R> fmt::Debug for Body<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body")
            .field("framing", &self.framing)
            .field("trailer_expected", &self.trailer_expected)
            .field("trailer_state", &self.trailer_state())
            .field("buffered", &self.transport.read_buf.len())
            .finish()
    }
}

impl<R> http_body::Body for Body<R>
where
    R: AsyncRead + Unpin,
{
    type Data = Bytes;
    type Error = ParseError;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let item = match &mut this.state {
            BodyState::EndOfStream => return Poll::Ready(None),
            BodyState::Failed(e) => return Poll::Ready(Some(Err(e.clone()))),
            BodyState::Open { pending, .. } if !pending.is_empty() => {
                return Poll::Ready(Some(Ok(Frame::data(mem::take(pending)))));
            }
            BodyState::Open { decoder, .. } => ready!(this.transport.poll_decode(cx, decoder)),
        };

        match item {
            Ok(PayloadItem::Chunk(bytes)) => Poll::Ready(Some(Ok(Frame::data(bytes)))),
            Ok(PayloadItem::Trailers(trailers)) => {
                this.trailers = Some(trailers.clone());
                Poll::Ready(Some(Ok(Frame::trailers(trailers))))
            }
            Ok(PayloadItem::Eof) => {
                this.finish();
                Poll::Ready(None)
            }
            Err(e) => {
                this.fail(e.clone());
                Poll::Ready(Some(Err(e)))
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        match &self.state {
            BodyState::EndOfStream => true,
            BodyState::Open { .. } => self.framing.is_empty() && !self.trailer_expected,
            BodyState::Failed(_) => false,
        }
    }

    fn size_hint(&self) -> SizeHint {
        match &self.state {
            BodyState::EndOfStream => SizeHint::with_exact(0),
            BodyState::Open { decoder, pending } => match decoder.remaining_length() {
                Some(remaining) => SizeHint::with_exact(remaining + pending.len() as u64),
                None => {
                    let mut hint = SizeHint::new();
                    hint.set_lower(pending.len() as u64);
                    hint
                }
            },
            BodyState::Failed(_) => SizeHint::new(),
        }
    }
}

/// Reading a `Body` as a byte stream, so a decoded body can be sent on as the
/// source of another message.
impl<R> AsyncRead for Body<R>
where
    R: AsyncRead + Unpin,
{
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let dst = buf.initialize_unfilled();
        match ready!(Body::poll_read(this, cx, dst)) {
            Ok((n, _status)) => {
                buf.advance(n);
                Poll::Ready(Ok(()))
            }
            Err(e) => Poll::Ready(Err(into_io_error(e))),
        }
    }
}

fn into_io_error(e: ParseError) -> io::Error {
    match &e {
        ParseError::Io { source } => io::Error::new(source.kind(), e),
        _ => io::Error::new(io::ErrorKind::InvalidData, e),
    }
}
