//! Writing outgoing message bodies.
//!
//! [`TransferWriter::write_body`] picks one of three ways to move a
//! [`BodyReader`](crate::protocol::body::BodyReader) to a [`BodySink`]:
//!
//! - chunked: plain writes wrapped in chunk framing, then the trailers
//! - bulk: the sink pulls the body through [`BulkTransfer`], capped at the
//!   declared length when there is one
//! - plain: one write per buffer read from the body
//!
//! The choice depends on the transfer codings, the declared length, the kind
//! of body reader, the request method and whether the sink supports bulk transfer.

mod limited_reader;
mod sink;
mod transfer_writer;

pub use limited_reader::LimitedReader;
pub use sink::{BodySink, BulkTransfer};
pub use transfer_writer::{Transfer, TransferStrategy, TransferWriter, DEFAULT_COPY_BUFFER_SIZE};
