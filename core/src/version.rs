//! OData protocol versions and their wire dialects.
//!
//! # Design
//! Everything that differs between v2/v3 and v4 (date and guid literal
//! syntax, array literals, how dates are written into JSON payloads, content
//! negotiation) lives in one `Dialect` table per version. Callers pick the
//! table once through `ProtocolVersion::dialect` instead of branching on the
//! version number at every call site.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

use crate::date::format_iso8601;
use crate::error::Error;
use crate::guid::Guid;

/// MIME type used for verbose JSON requests and content negotiation.
pub const JSON_VERBOSE_MIME_TYPE: &str = "application/json;odata=verbose";

/// Protocol dialect selected per client. Only 2, 3 and 4 exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "u8")]
pub enum ProtocolVersion {
    V2,
    V3,
    V4,
}

impl ProtocolVersion {
    pub fn number(self) -> u8 {
        match self {
            ProtocolVersion::V2 => 2,
            ProtocolVersion::V3 => 3,
            ProtocolVersion::V4 => 4,
        }
    }

    pub fn dialect(self) -> &'static Dialect {
        match self {
            ProtocolVersion::V2 => &V2_DIALECT,
            ProtocolVersion::V3 => &V3_DIALECT,
            ProtocolVersion::V4 => &V4_DIALECT,
        }
    }
}

impl TryFrom<u8> for ProtocolVersion {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(ProtocolVersion::V2),
            3 => Ok(ProtocolVersion::V3),
            4 => Ok(ProtocolVersion::V4),
            other => Err(Error::UnsupportedProtocolVersion(other)),
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.number())
    }
}

/// Per-version wire syntax.
pub struct Dialect {
    /// Literal form of a date inside `$filter` or a key.
    pub date_literal: fn(&DateTime<FixedOffset>) -> String,
    /// Literal form of a guid inside `$filter` or a key.
    pub guid_literal: fn(&Guid) -> String,
    /// Whether arrays have a `[a,b]` literal form.
    pub array_literals: bool,
    /// String a date becomes when embedded in a JSON request body.
    pub payload_date: fn(&DateTime<FixedOffset>) -> String,
    /// `Accept` header value.
    pub accept: &'static str,
    /// `Content-Type` header value for requests carrying a body.
    pub content_type: &'static str,
}

const VERBOSE_ACCEPT: &str = "application/json;odata=verbose,text/plain";

static V2_DIALECT: Dialect = Dialect {
    date_literal: prefixed_date_literal,
    guid_literal: prefixed_guid_literal,
    array_literals: false,
    payload_date: payload_date_without_utc_marker,
    accept: VERBOSE_ACCEPT,
    content_type: JSON_VERBOSE_MIME_TYPE,
};

static V3_DIALECT: Dialect = Dialect {
    date_literal: prefixed_date_literal,
    guid_literal: prefixed_guid_literal,
    array_literals: false,
    payload_date: payload_date,
    accept: VERBOSE_ACCEPT,
    content_type: JSON_VERBOSE_MIME_TYPE,
};

static V4_DIALECT: Dialect = Dialect {
    date_literal: bare_date_literal,
    guid_literal: bare_guid_literal,
    array_literals: true,
    payload_date: payload_date,
    accept: VERBOSE_ACCEPT,
    content_type: JSON_VERBOSE_MIME_TYPE,
};

fn prefixed_date_literal(date: &DateTime<FixedOffset>) -> String {
    format!("datetime'{}'", format_iso8601(date, true, true))
}

fn bare_date_literal(date: &DateTime<FixedOffset>) -> String {
    format_iso8601(date, false, false)
}

fn prefixed_guid_literal(guid: &Guid) -> String {
    format!("guid'{guid}'")
}

fn bare_guid_literal(guid: &Guid) -> String {
    guid.to_string()
}

fn payload_date(date: &DateTime<FixedOffset>) -> String {
    format_iso8601(date, false, false)
}

// v2 servers reject the UTC designator in payload dates.
fn payload_date_without_utc_marker(date: &DateTime<FixedOffset>) -> String {
    let formatted = payload_date(date);
    match formatted.strip_suffix('Z') {
        Some(stripped) => stripped.to_string(),
        None => formatted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(y, mo, d, h, mi, s)
            .unwrap()
    }

    #[test]
    fn only_versions_two_to_four_are_supported() {
        assert_eq!(ProtocolVersion::try_from(2).unwrap(), ProtocolVersion::V2);
        assert_eq!(ProtocolVersion::try_from(3).unwrap(), ProtocolVersion::V3);
        assert_eq!(ProtocolVersion::try_from(4).unwrap(), ProtocolVersion::V4);
        for bad in [0, 1, 5, 255] {
            let err = ProtocolVersion::try_from(bad).unwrap_err();
            assert!(matches!(err, Error::UnsupportedProtocolVersion(v) if v == bad));
        }
    }

    #[test]
    fn deserializes_from_number() {
        let v: ProtocolVersion = serde_json::from_str("3").unwrap();
        assert_eq!(v, ProtocolVersion::V3);
        assert!(serde_json::from_str::<ProtocolVersion>("7").is_err());
    }

    #[test]
    fn v2_payload_dates_drop_utc_marker() {
        let date = utc(2020, 1, 2, 3, 4, 5);
        assert_eq!((ProtocolVersion::V2.dialect().payload_date)(&date), "2020-01-02T03:04:05");
        assert_eq!((ProtocolVersion::V3.dialect().payload_date)(&date), "2020-01-02T03:04:05Z");
        assert_eq!((ProtocolVersion::V4.dialect().payload_date)(&date), "2020-01-02T03:04:05Z");
    }

    #[test]
    fn v2_payload_dates_keep_non_utc_offsets() {
        let date = FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2020, 1, 2, 3, 4, 5)
            .unwrap();
        assert_eq!(
            (ProtocolVersion::V2.dialect().payload_date)(&date),
            "2020-01-02T03:04:05+0100"
        );
    }

    #[test]
    fn only_v4_has_array_literals() {
        assert!(!ProtocolVersion::V2.dialect().array_literals);
        assert!(!ProtocolVersion::V3.dialect().array_literals);
        assert!(ProtocolVersion::V4.dialect().array_literals);
    }
}
