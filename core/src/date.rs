//! Date codec for the verbose `/Date(ms)/` format and ISO-8601.
//!
//! # Design
//! Dates are `DateTime<FixedOffset>`. The offset plays the role of the
//! "local" frame: wall-clock fields are read in that offset, and an offset of
//! zero prints as `Z`. Parsing keeps milliseconds and drops anything finer.

use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Timelike};
use regex::Regex;

use crate::error::Error;

static VERBOSE_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/Date\((-?\d+)((\+|-)?(\d+)?)\)/$").expect("verbose date pattern is valid")
});

static ISO8601_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[-+]\d{2}(:?)(\d{2})?)?$")
        .expect("iso8601 pattern is valid")
});

static CALENDAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([+-]?\d{4,})-(\d{2})-(\d{2})$").expect("calendar pattern is valid"));

static TIME_OF_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{2}):(\d{2}):(\d{2})\.?(\d{0,7})?").expect("time pattern is valid")
});

static OFFSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([+-])(\d{2}):?(\d{2})?$").expect("offset pattern is valid"));

/// Whether `value` is a verbose `/Date(...)/` literal.
pub fn is_verbose_date(value: &str) -> bool {
    VERBOSE_DATE.is_match(value)
}

/// Whether `value` is an ISO-8601 date-time with an optional offset.
pub fn is_iso8601_date(value: &str) -> bool {
    ISO8601_DATE.is_match(value)
}

/// Format `date` as ISO-8601.
///
/// With `skip_time_if_midnight` the time part is omitted when the date sits
/// exactly on midnight: wall-clock midnight when `skip_timezone` is set, UTC
/// midnight otherwise. With `skip_timezone` no offset suffix is written.
///
/// The offset suffix is `Z` for zero, else `±HHMM` signed by the offset east
/// of UTC. That is the reverse of the minutes-behind-UTC convention and is
/// what servers expect.
pub fn format_iso8601(
    date: &DateTime<FixedOffset>,
    skip_time_if_midnight: bool,
    skip_timezone: bool,
) -> String {
    let local = date.naive_local();
    let mut out = local.format("%Y-%m-%d").to_string();

    let at_midnight = if skip_timezone {
        local.time() == NaiveTime::MIN
    } else {
        date.naive_utc().time() == NaiveTime::MIN
    };
    if skip_time_if_midnight && at_midnight {
        return out;
    }

    out.push('T');
    out.push_str(&local.format("%H:%M:%S").to_string());
    let millis = local.nanosecond() / 1_000_000;
    if millis != 0 {
        out.push_str(&format!(".{millis:03}"));
    }

    if !skip_timezone {
        let east = date.offset().local_minus_utc();
        if east == 0 {
            out.push('Z');
        } else {
            let sign = if east > 0 { '+' } else { '-' };
            let minutes = east.unsigned_abs() / 60;
            out.push_str(&format!("{sign}{:02}{:02}", minutes / 60, minutes % 60));
        }
    }
    out
}

/// Parse an ISO-8601 date or date-time.
///
/// Fractional seconds are cut to milliseconds. A missing offset (or `Z`)
/// means UTC.
pub fn parse_iso8601(value: &str) -> Result<DateTime<FixedOffset>, Error> {
    let invalid = || Error::InvalidDate(value.to_string());

    let stripped = value.replacen('Z', "", 1);
    let mut chunks = stripped.split('T');
    let date_chunk = chunks.next().unwrap_or_default();
    let time_chunk = chunks.next();

    let calendar = CALENDAR.captures(date_chunk).ok_or_else(invalid)?;
    let date = NaiveDate::from_ymd_opt(
        calendar[1].parse::<i32>().map_err(|_| invalid())?,
        capture_number(&calendar, 2).ok_or_else(invalid)?,
        capture_number(&calendar, 3).ok_or_else(invalid)?,
    )
    .ok_or_else(invalid)?;

    let mut time = NaiveTime::MIN;
    let mut offset_seconds = 0;
    if let Some(chunk) = time_chunk {
        if let Some(caps) = TIME_OF_DAY.captures(chunk) {
            let millis = caps.get(4).map(|m| fraction_to_millis(m.as_str())).unwrap_or(0);
            time = NaiveTime::from_hms_milli_opt(
                capture_number(&caps, 1).ok_or_else(invalid)?,
                capture_number(&caps, 2).ok_or_else(invalid)?,
                capture_number(&caps, 3).ok_or_else(invalid)?,
                millis,
            )
            .ok_or_else(invalid)?;
        }
        if let Some(caps) = OFFSET.captures(chunk) {
            let hours = capture_number(&caps, 2).unwrap_or(0) as i32;
            let minutes = capture_number(&caps, 3).unwrap_or(0) as i32;
            let magnitude = hours * 3600 + minutes * 60;
            offset_seconds = if &caps[1] == "-" { -magnitude } else { magnitude };
        }
    }

    let offset = FixedOffset::east_opt(offset_seconds).ok_or_else(invalid)?;
    offset
        .from_local_datetime(&date.and_time(time))
        .single()
        .ok_or_else(invalid)
}

/// Parse a verbose `/Date(ms[±offsetMinutes])/` literal.
///
/// The instant is `ms` since the epoch; the offset only moves the wall clock.
pub fn parse_verbose_date(value: &str) -> Result<DateTime<FixedOffset>, Error> {
    let invalid = || Error::InvalidDate(value.to_string());

    let caps = VERBOSE_DATE.captures(value).ok_or_else(invalid)?;
    let millis: i64 = caps[1].parse().map_err(|_| invalid())?;
    let offset_minutes: i32 = match caps.get(4) {
        Some(m) => {
            let magnitude: i32 = m.as_str().parse().map_err(|_| invalid())?;
            if caps.get(3).is_some_and(|s| s.as_str() == "-") {
                -magnitude
            } else {
                magnitude
            }
        }
        None => 0,
    };

    let offset = offset_minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(invalid)?;
    let instant = DateTime::from_timestamp_millis(millis).ok_or_else(invalid)?;
    Ok(instant.with_timezone(&offset))
}

fn capture_number(caps: &regex::Captures<'_>, index: usize) -> Option<u32> {
    caps.get(index)?.as_str().parse().ok()
}

fn fraction_to_millis(digits: &str) -> u32 {
    let mut padded: String = digits.chars().take(3).collect();
    while padded.len() < 3 {
        padded.push('0');
    }
    padded.parse().unwrap_or(0)
}
