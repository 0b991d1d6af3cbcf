//! Core protocol types of the body transfer layer.
//!
//! - **Message Handling**: payload items and body framing
//!   - [`PayloadItem`]: a chunk of body data, the trailer fields, or EOF
//!   - [`Framing`]: how the end of a body is found
//!
//! - **Body Streaming** ([`body`]): reading incoming bodies and describing outgoing ones
//!
//! - **Configuration** ([`config`]): buffer sizes and trailer limits
//!
//! - **Error Handling**:
//!   - [`HttpError`]: Top-level error type
//!   - [`ParseError`]: Body read errors
//!   - [`SendError`]: Body write errors
//!   - [`ErrorKind`]: The failure kind behind each error

mod message;
pub use message::Framing;
pub use message::PayloadItem;

pub mod config;
pub use config::BodyConfig;

mod error;
pub use error::ErrorKind;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;

pub mod body;
