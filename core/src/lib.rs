//! OData protocol client core.
//!
//! # Overview
//! Builds HTTP requests from abstract query parameters, writes values in the
//! literal syntax of OData v2, v3 and v4, reads verbose (`{"d": ...}`) and
//! light (`{"value": ...}`) JSON responses, folds every kind of failure into
//! one `ODataError`, and follows server-driven paging until the result set
//! is complete.
//!
//! # Design
//! - The network is not ours: `Transport` is injected and everything around
//!   it (`ODataClient::build_request`, `ODataClient::parse_response`) is pure.
//! - Version differences live in one `Dialect` table per `ProtocolVersion`.
//! - Responses are decoded into `Value`, which adds dates, guids and raw
//!   literals to plain JSON.

pub mod client;
pub mod config;
pub mod date;
pub mod error;
pub mod guid;
pub mod interpret;
pub mod literal;
pub mod normalize;
pub mod request;
pub mod transport;
pub mod value;
pub mod version;

pub use client::{ODataClient, Outcome};
pub use config::ClientConfig;
pub use error::{Error, ODataError};
pub use guid::Guid;
pub use interpret::{interpret, Envelope, TransformOptions};
pub use literal::{convert_primitive_value, serialize_key, serialize_prop_name, serialize_value, EdmType, Key, PropName};
pub use normalize::{error_from_response, RawResponse, TransportStatus};
pub use request::{Request, RequestOptions};
pub use transport::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError};
pub use value::{EdmLiteral, Map, Value};
pub use version::{ProtocolVersion, JSON_VERBOSE_MIME_TYPE};
