//! Error types for the OData client core.
//!
//! # Design
//! Two layers. `ODataError` is the single normalized shape every transport
//! failure and protocol-level error body collapses into: a message, a numeric
//! status and the raw error object when the server sent one. `Error` is the
//! crate-wide result error; it wraps `ODataError` next to the failures that
//! happen before any network activity (bad configuration, unknown EDM types,
//! values that cannot be converted).

use thiserror::Error;

/// Message used when neither the transport nor the server said anything useful.
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

/// Message attached to a verbose envelope that carries no payload.
pub const MALFORMED_RESPONSE_MESSAGE: &str = "Malformed or unsupported JSON response received";

/// A normalized OData failure.
///
/// `http_status` is the transport status, or 500 when the server answered
/// with a success status but embedded an error object, or the error object's
/// own numeric `code` when it has one. 200 never appears here.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ODataError {
    pub message: String,
    pub http_status: u16,
    pub error_details: Option<serde_json::Value>,
}

impl ODataError {
    pub fn new(message: impl Into<String>, http_status: u16) -> Self {
        Self {
            message: message.into(),
            http_status,
            error_details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.error_details = Some(details);
        self
    }
}

/// Errors returned by the serializer, the codecs and `ODataClient`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Only protocol versions 2, 3 and 4 have a wire dialect.
    #[error("unsupported OData protocol version: {0}")]
    UnsupportedProtocolVersion(u8),

    /// `convert_primitive_value` was asked for a type it has no converter for.
    #[error("unknown key type: {0}")]
    UnknownKeyType(String),

    #[error("invalid guid: {0}")]
    InvalidGuid(String),

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("not a number: {0}")]
    NotANumber(String),

    /// A count-only request came back without a parseable count.
    #[error("the server response did not provide a numeric count")]
    NonNumericCount,

    /// The request payload could not be encoded.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Transport failure, protocol-level error body or malformed response.
    #[error(transparent)]
    OData(#[from] ODataError),
}
