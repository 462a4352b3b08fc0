//! Request orchestration: build, dispatch, interpret, follow continuation links.
//!
//! # Design
//! `ODataClient` holds the protocol version, a default timeout and the
//! injected `Transport`; nothing else survives between calls. As in a
//! host-does-IO client, `build_request` and `parse_response` are pure and
//! usable on their own. `send` strings them together around the transport
//! and follows server-driven paging in a loop, one page at a time, appending
//! each page after the records already collected.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{Error, ODataError};
use crate::interpret::{interpret, Envelope};
use crate::normalize::RawResponse;
use crate::request::{append_query, encode_payload, Request, RequestOptions, DEFAULT_TIMEOUT};
use crate::transport::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError, JSONP_CALLBACK_PARAM};
use crate::value::Value;
use crate::version::ProtocolVersion;

/// Query parameter selecting the response format.
pub const FORMAT_PARAM: &str = "$format";

static ABSOLUTE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:[a-z]+:)?//").expect("absolute url pattern is valid"));

/// How a `send` finished.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The payload, with every continuation page appended when paging was
    /// followed. `total_count` is the count the first page reported.
    Records {
        data: Value,
        total_count: Option<u64>,
    },
    /// Answer to a `count_only` request.
    Count(u64),
    /// The transport abandoned the request during unload; nothing to report.
    Abandoned,
}

impl Outcome {
    /// The records, or `None` for counts and abandoned requests.
    pub fn into_data(self) -> Option<Value> {
        match self {
            Outcome::Records { data, .. } => Some(data),
            _ => None,
        }
    }
}

/// OData client over an injected transport.
#[derive(Debug, Clone)]
pub struct ODataClient<T> {
    version: ProtocolVersion,
    timeout: Duration,
    transport: T,
}

impl<T: Transport> ODataClient<T> {
    pub fn new(version: ProtocolVersion, transport: T) -> Self {
        Self {
            version,
            timeout: DEFAULT_TIMEOUT,
            transport,
        }
    }

    pub fn from_config(config: &ClientConfig, transport: T) -> Self {
        Self {
            version: config.protocol_version,
            timeout: Duration::from_millis(config.timeout_ms),
            transport,
        }
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Turn `request` into the `HttpRequest` handed to the transport.
    ///
    /// Runs `before_send` first. Parameters always travel in the query
    /// string; non-GET requests carry the JSON payload as body.
    pub fn build_request(&self, mut request: Request, options: &RequestOptions) -> Result<HttpRequest, Error> {
        if let Some(hook) = &options.before_send {
            hook(&mut request);
        }

        let dialect = self.version.dialect();
        let method = HttpMethod::from(request.method.as_str());
        let is_get = method == HttpMethod::Get;
        let use_jsonp = is_get && options.jsonp;

        let mut params = request.params;
        if use_jsonp {
            params.insert(FORMAT_PARAM.to_string(), "json".to_string());
        }
        let url = append_query(&request.url, &params)?;

        let body = match &request.payload {
            Some(payload) if !is_get => Some(encode_payload(payload, self.version)?),
            _ => None,
        };

        let mut headers = vec![("accept".to_string(), dialect.accept.to_string())];
        if !is_get {
            headers.push(("content-type".to_string(), dialect.content_type.to_string()));
        }
        for (name, value) in request.headers {
            match headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&name)) {
                Some(existing) => existing.1 = value,
                None => headers.push((name, value)),
            }
        }

        Ok(HttpRequest {
            method,
            url,
            headers,
            body,
            timeout: request.timeout.unwrap_or(self.timeout),
            asynchronous: request.asynchronous,
            with_credentials: options.with_credentials,
            jsonp_callback: use_jsonp.then(|| JSONP_CALLBACK_PARAM.to_string()),
        })
    }

    /// Interpret one response.
    pub fn parse_response(&self, response: HttpResponse, options: &RequestOptions) -> Result<Envelope, ODataError> {
        interpret(RawResponse::from_http(response), &options.transform_options())
    }

    /// Send `request` and collect the result, following continuation links
    /// unless `options.is_paged` is set.
    pub async fn send(&self, request: Request, options: &RequestOptions) -> Result<Outcome, Error> {
        let mut request = request;
        let mut records: Vec<Value> = Vec::new();
        let mut total_count = None;
        let mut page = 0usize;

        loop {
            let http_request = self.build_request(request, options)?;
            let url = http_request.url.clone();
            debug!(method = %http_request.method, url = %url, page, version = %self.version, "sending OData request");

            let raw = match self.transport.send(http_request).await {
                Ok(response) => RawResponse::from_http(response),
                Err(TransportError::Unloaded) => {
                    debug!(url = %url, "request abandoned during unload");
                    return Ok(Outcome::Abandoned);
                }
                Err(err) => RawResponse::from_transport_error(err),
            };

            let envelope = match interpret(raw, &options.transform_options()) {
                Ok(envelope) => envelope,
                Err(err) => {
                    warn!(url = %url, status = err.http_status, message = %err.message, "OData request failed");
                    return Err(err.into());
                }
            };

            if options.count_only {
                return envelope.count.map(Outcome::Count).ok_or(Error::NonNumericCount);
            }
            if page == 0 {
                total_count = envelope.count;
            }

            match envelope.next_url {
                Some(next) if !options.is_paged => {
                    append_page(&mut records, envelope.data);
                    let next = resolve_next_url(&url, &next);
                    debug!(next = %next, page = page + 1, "following continuation link");
                    request = Request::get(next);
                    page += 1;
                }
                _ if page == 0 => {
                    return Ok(Outcome::Records {
                        data: envelope.data.unwrap_or(Value::Null),
                        total_count,
                    });
                }
                _ => {
                    append_page(&mut records, envelope.data);
                    return Ok(Outcome::Records {
                        data: Value::Array(records),
                        total_count,
                    });
                }
            }
        }
    }
}

fn append_page(records: &mut Vec<Value>, data: Option<Value>) {
    match data {
        Some(Value::Array(items)) => records.extend(items),
        Some(other) => records.push(other),
        None => {}
    }
}

pub fn is_absolute_url(url: &str) -> bool {
    ABSOLUTE_URL.is_match(url)
}

/// Resolve a continuation link against the URL of the request that
/// produced it. The base loses its query string and last segment; each
/// `..` in the link pops one more segment.
pub fn resolve_next_url(base: &str, next: &str) -> String {
    if is_absolute_url(next) {
        return next.to_string();
    }
    let base = base.split_once('?').map_or(base, |(path, _)| path);
    let mut parts: Vec<&str> = base.split('/').collect();
    parts.pop();
    for part in next.split('/').filter(|part| !part.is_empty()) {
        if part == ".." {
            parts.pop();
        } else {
            parts.push(part);
        }
    }
    parts.join("/")
}
