//! HTTP/1.1 message body transfer
//!
//! This crate moves HTTP/1.1 message bodies between a transport and the
//! application, built on top of tokio. It does not parse start lines or manage
//! connections: it starts where the header block ends.
//!
//! # Features
//!
//! - Chunked transfer coding, trailer sections included
//! - Content-Length bounded and close-delimited bodies
//! - End of stream reported together with the last body bytes
//! - Errors that stay put once a body failed
//! - Body writing that lets capable destinations pull the body in bulk
//!
//! # Example
//!
//! ```
//! use micro_http_transfer::protocol::body::{Body, BodyReader, ReadStatus};
//! use micro_http_transfer::protocol::Framing;
//! use micro_http_transfer::transfer::TransferWriter;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // read a chunked body
//! let wire = &b"4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n"[..];
//! let mut body = Body::new(wire, Framing::Chunked);
//!
//! let mut buf = [0u8; 64];
//! let (n, status) = body.read(&mut buf).await?;
//! assert_eq!(&buf[..n], b"Wikipedia");
//! assert_eq!(status, ReadStatus::EndOfStream);
//!
//! // write it back out with chunked framing
//! let mut reader = BodyReader::from(buf[..n].to_vec());
//! let mut out = Vec::new();
//! TransferWriter::new(-1).transfer_encoding(["chunked"]).write_body(&mut reader, &mut out).await?;
//! assert_eq!(out, b"9\r\nWikipedia\r\n0\r\n\r\n");
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`codec`]: Byte-level decoders and encoders for payloads and framing headers
//! - [`protocol`]: Payload items, framing, configuration, errors and the [`protocol::body::Body`] reader
//! - [`transfer`]: The [`transfer::TransferWriter`] and the destination capability traits
//!
//! ## Error Handling
//!
//! - [`protocol::HttpError`]: Top-level error type
//! - [`protocol::ParseError`]: Body read errors
//! - [`protocol::SendError`]: Body write errors
//!
//! Every error maps to a [`protocol::ErrorKind`].
//!
//! # Limitations
//!
//! - HTTP/1.1 only
//! - Maximum trailer section size: 8KB (configurable with [`protocol::BodyConfig`])
//! - Maximum number of trailer fields: 64 (configurable with [`protocol::BodyConfig`])

pub mod codec;
pub mod protocol;
pub mod transfer;

mod utils;
pub(crate) use utils::ensure;
