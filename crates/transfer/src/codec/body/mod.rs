//! HTTP body handling module for decoding and encoding message payloads
//!
//! # Components
//!
//! ## Decoders
//! - [`ChunkedDecoder`]: Handles chunked transfer encoded payloads and their trailer section
//! - [`LengthDecoder`]: Processes fixed-length payloads
//! - [`PayloadDecoder`]: Main decoder that coordinates the decoding strategies
//!
//! ## Encoders
//! - [`ChunkedEncoder`]: Implements chunked transfer encoding, trailers included
//!
//! Decoders turn transport EOF into the right outcome for their framing: the
//! end of a close-delimited body, or an error for every framing that carries
//! its own boundary.

mod chunked_decoder;
mod chunked_encoder;
mod length_decoder;
mod payload_decoder;

pub use chunked_decoder::ChunkedDecoder;
pub use chunked_encoder::ChunkedEncoder;
pub use length_decoder::LengthDecoder;
pub use payload_decoder::PayloadDecoder;
