//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! Requests and responses are plain data. `ODataClient` builds `HttpRequest`
//! values and interprets `HttpResponse` values; the only I/O happens inside
//! the caller-supplied `Transport`. All fields use owned types so a transport
//! can move them across threads or into another runtime.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Query parameter naming the JSONP callback.
pub const JSONP_CALLBACK_PARAM: &str = "$callback";

/// HTTP method for a request. Displays lower-case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Merge,
    Delete,
    Other(String),
}

impl HttpMethod {
    pub fn as_str(&self) -> &str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Patch => "patch",
            HttpMethod::Merge => "merge",
            HttpMethod::Delete => "delete",
            HttpMethod::Other(method) => method,
        }
    }
}

/// Case-insensitive; unknown verbs are kept lower-cased in `Other`.
impl From<&str> for HttpMethod {
    fn from(method: &str) -> Self {
        match method.to_ascii_lowercase().as_str() {
            "" | "get" => HttpMethod::Get,
            "post" => HttpMethod::Post,
            "put" => HttpMethod::Put,
            "patch" => HttpMethod::Patch,
            "merge" => HttpMethod::Merge,
            "delete" => HttpMethod::Delete,
            other => HttpMethod::Other(other.to_string()),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
///
/// `url` already carries the query string. `jsonp_callback` names the
/// callback parameter when the transport should use JSONP instead of a
/// regular exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub timeout: Duration,
    pub asynchronous: bool,
    pub with_credentials: bool,
    pub jsonp_callback: Option<String>,
}

impl HttpRequest {
    /// First header named `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Failures where no HTTP response was received.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("request aborted")]
    Aborted,

    /// The request was abandoned because the host is shutting the page or
    /// session down. The client swallows this one.
    #[error("request aborted due to unload")]
    Unloaded,

    #[error("network error: {0}")]
    Network(String),
}

/// The "send HTTP request" capability injected into `ODataClient`.
///
/// Implementations must return non-2xx responses as `Ok` so the client can
/// read their bodies; `Err` is only for exchanges that produced no response.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn methods_are_lower_cased() {
        assert_eq!(HttpMethod::from("GET"), HttpMethod::Get);
        assert_eq!(HttpMethod::from("Merge"), HttpMethod::Merge);
        assert_eq!(HttpMethod::from("PROPFIND"), HttpMethod::Other("propfind".to_string()));
        assert_eq!(HttpMethod::from("PATCH").to_string(), "patch");
        assert_eq!(HttpMethod::from(""), HttpMethod::Get);
    }
}
