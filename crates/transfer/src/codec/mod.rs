//! HTTP codec module for message body framing
//!
//! This module holds the byte-level pieces of body transfer, built on the
//! `tokio_util::codec` [`Decoder`](tokio_util::codec::Decoder) and
//! [`Encoder`](tokio_util::codec::Encoder) traits:
//!
//! - Payload decoding via [`body`]:
//!   - chunked transfer coding with trailer sections
//!   - Content-Length bounded payloads
//!   - payloads delimited by the transport closing
//! - Header handling via [`header`]:
//!   - framing detection from `Transfer-Encoding` / `Content-Length`
//!   - trailer section decoding
//!   - framing header encoding
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use micro_http_transfer::codec::body::PayloadDecoder;
//! use tokio_util::codec::Decoder;
//!
//! let mut decoder = PayloadDecoder::chunked();
//! let mut buffer = BytesMut::from(&b"5\r\nhello\r\n0\r\n\r\n"[..]);
//!
//! let chunk = decoder.decode(&mut buffer).unwrap().unwrap();
//! assert_eq!(&chunk.as_bytes().unwrap()[..], b"hello");
//! assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_eof());
//! ```

pub mod body;
pub mod header;
