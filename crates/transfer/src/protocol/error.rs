use std::io;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("body read error: {source}")]
    ReadError {
        #[from]
        source: ParseError,
    },

    #[error("body write error: {source}")]
    WriteError {
        #[from]
        source: SendError,
    },
}

/// The failure kinds a body transfer can end with.
///
/// Every [`ParseError`] and [`SendError`] maps onto exactly one kind, which is
/// what callers should branch on instead of matching error messages.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedChunkHeader,
    MalformedTrailer,
    UnexpectedTransportEof,
    TransportReadFailure,
    TransportWriteFailure,
    /// The message headers describe an impossible or conflicting framing.
    InvalidFraming,
    /// A fixed-length body ended before its declared length.
    ContentLengthMismatch,
}

/// Errors raised while reading a message body.
///
/// The error is `Clone` because a failed [`Body`](crate::protocol::body::Body)
/// hands the same error back on every later read.
#[derive(Error, Debug, Clone)]
pub enum ParseError {
    #[error("malformed chunk header: {reason}")]
    MalformedChunkHeader { reason: String },

    #[error("malformed trailer: {reason}")]
    MalformedTrailer { reason: String },

    #[error("unexpected eof: {reason}")]
    UnexpectedEof { reason: String },

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("invalid transfer-encoding header: {reason}")]
    InvalidTransferEncoding { reason: String },

    #[error("invalid trailer header: {reason}")]
    InvalidTrailerHeader { reason: String },

    #[error("io error: {source}")]
    Io { source: Arc<io::Error> },
}

impl ParseError {
    pub fn malformed_chunk_header<S: ToString>(str: S) -> Self {
        Self::MalformedChunkHeader { reason: str.to_string() }
    }

    pub fn malformed_trailer<S: ToString>(str: S) -> Self {
        Self::MalformedTrailer { reason: str.to_string() }
    }

    pub fn unexpected_eof<S: ToString>(str: S) -> Self {
        Self::UnexpectedEof { reason: str.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn invalid_transfer_encoding<S: ToString>(str: S) -> Self {
        Self::InvalidTransferEncoding { reason: str.to_string() }
    }

    pub fn invalid_trailer_header<S: ToString>(str: S) -> Self {
        Self::InvalidTrailerHeader { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: Arc::new(e.into()) }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ParseError::MalformedChunkHeader { .. } => ErrorKind::MalformedChunkHeader,
            ParseError::MalformedTrailer { .. } => ErrorKind::MalformedTrailer,
            ParseError::UnexpectedEof { .. } => ErrorKind::UnexpectedTransportEof,
            ParseError::InvalidContentLength { .. }
            | ParseError::InvalidTransferEncoding { .. }
            | ParseError::InvalidTrailerHeader { .. } => ErrorKind::InvalidFraming,
            ParseError::Io { .. } => ErrorKind::TransportReadFailure,
        }
    }
}

impl From<io::Error> for ParseError {
    fn from(e: io::Error) -> Self {
        Self::io(e)
    }
}

/// Errors raised while transmitting a message body.
#[derive(Error, Debug)]
pub enum SendError {
    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    #[error("read body source error: {source}")]
    Read { source: io::Error },

    #[error("content-length {declared} declared but body ended after {actual} bytes")]
    ContentLengthMismatch { declared: u64, actual: u64 },
}

impl SendError {
    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }

    pub fn read<E: Into<io::Error>>(e: E) -> Self {
        Self::Read { source: e.into() }
    }

    pub fn content_length_mismatch(declared: u64, actual: u64) -> Self {
        Self::ContentLengthMismatch { declared, actual }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SendError::Io { .. } => ErrorKind::TransportWriteFailure,
            SendError::Read { .. } => ErrorKind::TransportReadFailure,
            SendError::ContentLengthMismatch { .. } => ErrorKind::ContentLengthMismatch,
        }
    }
}

impl HttpError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HttpError::ReadError { source } => source.kind(),
            HttpError::WriteError { source } => source.kind(),
        }
    }
}
