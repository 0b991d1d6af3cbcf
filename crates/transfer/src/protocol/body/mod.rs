//! Message body handling for both directions of a transfer.
//!
//! - [`Body`]: reads an incoming body from a transport according to its
//!   [`Framing`](crate::protocol::Framing), with end-of-stream reported on the
//!   read that returns the last bytes and errors that stay put once raised.
//!   Also implements `http_body::Body` and `AsyncRead`.
//! - [`BodyReader`]: the source of an outgoing body, and [`classify`] which
//!   tells the writer whether that source is in memory, a file, or anything else.

#[allow(clippy::module_inception, reason = "the body reader lives next to its source types")]
mod body;
mod reader;

pub use body::{Body, ReadStatus, TrailerState};
pub use reader::{classify, BodyReader, ReaderKind};
