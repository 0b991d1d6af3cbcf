//! Body framing detection from message headers.
//!
//! Decides how the body of an incoming message is delimited, following
//! [RFC 9112 Section 6.3](https://www.rfc-editor.org/rfc/rfc9112.html#name-message-body-length),
//! and which trailer fields the sender announced with the `Trailer` header.

use http::header::{CONTENT_LENGTH, TRAILER, TRANSFER_ENCODING};
use http::{HeaderMap, HeaderName, HeaderValue};
use tracing::debug;

use crate::ensure;
use crate::protocol::{Framing, ParseError};

/// Which side of the exchange a message comes from.
///
/// Requests without framing headers have no body, while responses without
/// framing headers run until the connection closes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MessageKind {
    Request,
    Response,
}

/// Determines the body framing from the `Transfer-Encoding` and `Content-Length` headers.
///
/// # Errors
///
/// Returns `ParseError` if:
/// - Both Content-Length and Transfer-Encoding headers are present
/// - A request uses a transfer coding other than chunked as final coding
/// - Content-Length values are invalid or disagree with each other
pub fn parse_framing(headers: &HeaderMap, kind: MessageKind) -> Result<Framing, ParseError> {
    // refer: https://www.rfc-editor.org/rfc/rfc9112.html#name-transfer-encoding
    let te_header = headers.get_all(TRANSFER_ENCODING).iter().next_back();
    let has_cl = headers.contains_key(CONTENT_LENGTH);

    let framing = match (te_header, has_cl) {
        (None, false) => match kind {
            MessageKind::Request => Framing::Empty,
            MessageKind::Response => Framing::UntilClose,
        },

        (te_value @ Some(_), false) => {
            if is_chunked(te_value) {
                Framing::Chunked
            } else {
                ensure!(
                    kind == MessageKind::Response,
                    ParseError::invalid_transfer_encoding("chunked must be the final transfer coding of a request")
                );
                Framing::UntilClose
            }
        }

        (None, true) => match parse_content_length(headers)? {
            0 => Framing::Empty,
            length => Framing::Length(length),
        },

        (Some(_), true) => {
            return Err(ParseError::invalid_content_length("transfer_encoding and content_length both present in headers"));
        }
    };

    debug!(?framing, ?kind, "parsed body framing");
    Ok(framing)
}

/// Parses every `Content-Length` value; repeated values must all agree.
fn parse_content_length(headers: &HeaderMap) -> Result<u64, ParseError> {
    let mut length = None;
    for cl_value in headers.get_all(CONTENT_LENGTH) {
        let cl_str = cl_value.to_str().map_err(|_e| ParseError::invalid_content_length("value can't to_str"))?;

        for part in cl_str.split(',') {
            let part = part.trim();
            let value = part.parse::<u64>().map_err(|_e| ParseError::invalid_content_length(format!("value {part} is not u64")))?;

            match length {
                Some(previous) if previous != value => {
                    return Err(ParseError::invalid_content_length(format!("conflicting values {previous} and {value}")));
                }
                _ => length = Some(value),
            }
        }
    }

    length.ok_or_else(|| ParseError::invalid_content_length("missing value"))
}

/// Checks if the Transfer-Encoding header indicates chunked encoding.
///
/// According to RFC 7230, chunked must be the last encoding if present.
pub fn is_chunked(header_value: Option<&HeaderValue>) -> bool {
    const CHUNKED: &[u8] = b"chunked";
    if let Some(value) = header_value {
        if let Some(bytes) = value.as_bytes().rsplit(|b| *b == b',').next() {
            return bytes.trim_ascii().eq_ignore_ascii_case(CHUNKED);
        }
    }
    false
}

/// Collects the field names announced by the `Trailer` header.
///
/// Fields that frame the message can never be sent as trailers, so announcing
/// one of them is rejected.
pub fn parse_declared_trailers(headers: &HeaderMap) -> Result<Vec<HeaderName>, ParseError> {
    let mut names = Vec::new();
    for value in headers.get_all(TRAILER) {
        let value = value.to_str().map_err(|_e| ParseError::invalid_trailer_header("value can't to_str"))?;
        for part in value.split(',').map(str::trim).filter(|part| !part.is_empty()) {
            let name = HeaderName::from_bytes(part.as_bytes()).map_err(ParseError::invalid_trailer_header)?;
            ensure!(
                name != TRANSFER_ENCODING && name != TRAILER && name != CONTENT_LENGTH,
                ParseError::invalid_trailer_header(format!("{name} is not allowed as trailer"))
            );
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    Ok(names)
}
