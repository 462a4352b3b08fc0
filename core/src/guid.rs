//! Unique identifier value type.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

static GUID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\{?[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}\}?$",
    )
    .expect("guid pattern is valid")
});

/// A 128-bit identifier compared by value.
///
/// Parsed from the 8-4-4-4-12 hex form, optionally wrapped in braces.
/// Displays as lower-case hyphenated hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Guid(Uuid);

impl Guid {
    pub fn new(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Whether `value` has the shape of a guid.
    pub fn matches(value: &str) -> bool {
        GUID_PATTERN.is_match(value)
    }
}

impl From<Uuid> for Guid {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl FromStr for Guid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !Self::matches(s) {
            return Err(Error::InvalidGuid(s.to_string()));
        }
        let inner = s.trim_start_matches('{').trim_end_matches('}');
        Uuid::parse_str(inner)
            .map(Self)
            .map_err(|_| Error::InvalidGuid(s.to_string()))
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_braced_forms() {
        let plain: Guid = "3f2504e0-4f89-11d3-9a0c-0305e82c3301".parse().unwrap();
        let braced: Guid = "{3F2504E0-4F89-11D3-9A0C-0305E82C3301}".parse().unwrap();
        assert_eq!(plain, braced);
        assert_eq!(braced.to_string(), "3f2504e0-4f89-11d3-9a0c-0305e82c3301");
    }

    #[test]
    fn canonical_form_round_trips() {
        let s = "00000000-0000-0000-0000-000000000001";
        let guid: Guid = s.parse().unwrap();
        assert_eq!(guid.to_string(), s);
        assert_eq!(guid, Guid::new(Uuid::from_u128(1)));
        assert_eq!(guid.as_uuid().as_u128(), 1);
    }

    #[test]
    fn rejects_other_shapes() {
        for bad in [
            "",
            "3f2504e04f8911d39a0c0305e82c3301",
            "3f2504e0-4f89-11d3-9a0c-0305e82c330",
            "urn:uuid:3f2504e0-4f89-11d3-9a0c-0305e82c3301",
            "xf2504e0-4f89-11d3-9a0c-0305e82c3301",
        ] {
            assert!(!Guid::matches(bad), "{bad} should not match");
            assert!(matches!(bad.parse::<Guid>(), Err(Error::InvalidGuid(_))));
        }
    }
}
