//! HTTP header processing for message bodies
//!
//! This module handles the header fields that decide how a body travels:
//! the framing headers of a message and the trailer section after a chunked body.
//!
//! # Components
//!
//! - [`parse_framing`]: Derives the [`Framing`](crate::protocol::Framing) from
//!   `Transfer-Encoding` and `Content-Length`
//! - [`parse_declared_trailers`]: Reads the field names announced by `Trailer`
//! - [`TrailerDecoder`]: Decodes a trailer section into a `HeaderMap`
//!   - Uses `httparse` for field syntax
//!   - Enforces size and field count limits
//! - [`FramingEncoder`]: Writes the framing header lines of an outgoing message

mod framing;
mod header_encoder;
mod trailer_decoder;

pub use framing::{is_chunked, parse_declared_trailers, parse_framing, MessageKind};
pub use header_encoder::FramingEncoder;
pub use trailer_decoder::TrailerDecoder;
