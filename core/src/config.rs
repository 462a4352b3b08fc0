//! Client configuration.

use serde::Deserialize;

use crate::error::Error;
use crate::request::{RequestOptions, DEFAULT_TIMEOUT};
use crate::version::ProtocolVersion;

/// Settings fixed for the lifetime of an `ODataClient`.
///
/// Deserializes from any serde format; an unsupported `protocol_version`
/// fails deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub protocol_version: ProtocolVersion,
    pub timeout_ms: u64,
    pub with_credentials: bool,
    pub deserialize_dates: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            protocol_version: ProtocolVersion::V4,
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            with_credentials: false,
            deserialize_dates: true,
        }
    }
}

impl ClientConfig {
    pub fn new(protocol_version: u8) -> Result<Self, Error> {
        Ok(Self {
            protocol_version: ProtocolVersion::try_from(protocol_version)?,
            ..Self::default()
        })
    }

    /// Per-call options seeded from this configuration.
    pub fn request_options(&self) -> RequestOptions {
        RequestOptions {
            with_credentials: self.with_credentials,
            deserialize_dates: self.deserialize_dates,
            ..RequestOptions::default()
        }
    }
}
