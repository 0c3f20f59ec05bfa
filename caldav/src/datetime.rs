// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Date and time conversions between `jiff` values and `CalDAV` wire forms.

use jiff::tz::TimeZone;
use jiff::{Span, Timestamp, Zoned, civil};

use crate::error::CalDavError;

/// Format of UTC stamps in time-range filters and `FREEBUSY` periods.
pub const UTC_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Format date-valued sort keys are compared in.
const SORT_FORMAT: &str = "%Y-%m-%d%H%M%S";

/// Values that can bound a calendar query.
///
/// Floating date-times carry no zone and are taken to be UTC; a bare date
/// means midnight UTC.
pub trait IntoUtc {
    /// Converts the value to an instant.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is outside the supported range.
    fn into_utc(self) -> Result<Timestamp, CalDavError>;
}

impl IntoUtc for Timestamp {
    fn into_utc(self) -> Result<Timestamp, CalDavError> {
        Ok(self)
    }
}

impl IntoUtc for Zoned {
    fn into_utc(self) -> Result<Timestamp, CalDavError> {
        Ok(self.timestamp())
    }
}

impl IntoUtc for &Zoned {
    fn into_utc(self) -> Result<Timestamp, CalDavError> {
        Ok(self.timestamp())
    }
}

impl IntoUtc for civil::DateTime {
    fn into_utc(self) -> Result<Timestamp, CalDavError> {
        Ok(self.to_zoned(TimeZone::UTC)?.timestamp())
    }
}

impl IntoUtc for civil::Date {
    fn into_utc(self) -> Result<Timestamp, CalDavError> {
        self.to_datetime(civil::Time::midnight()).into_utc()
    }
}

/// Renders an instant as `YYYYMMDDTHHMMSSZ`.
#[must_use]
pub fn utc_stamp(ts: Timestamp) -> String {
    ts.strftime(UTC_FORMAT).to_string()
}

/// Converts a query bound to its wire form.
pub(crate) fn to_utc_stamp(value: impl IntoUtc) -> Result<String, CalDavError> {
    value.into_utc().map(utc_stamp)
}

/// Reads an iCalendar DATE or DATE-TIME value as wall-clock time.
///
/// A trailing `Z` is accepted and ignored; any `TZID` is the caller's
/// business.
pub(crate) fn parse_wall_clock(value: &str) -> Option<civil::DateTime> {
    let value = value.trim();
    let value = value.strip_suffix('Z').unwrap_or(value);
    civil::DateTime::strptime("%Y%m%dT%H%M%S", value)
        .ok()
        .or_else(|| {
            civil::Date::strptime("%Y%m%d", value)
                .ok()
                .map(|d| d.to_datetime(civil::Time::midnight()))
        })
}

/// Renders wall-clock time in the form sort keys are compared in.
pub(crate) fn sort_stamp(dt: civil::DateTime) -> String {
    dt.strftime(SORT_FORMAT).to_string()
}

/// Parses a UTC DATE-TIME such as `19980314T233000Z`.
pub(crate) fn parse_utc(value: &str) -> Result<Timestamp, CalDavError> {
    parse_wall_clock(value)
        .ok_or_else(|| CalDavError::Time(format!("not a date-time value: {value}")))?
        .into_utc()
}

/// Parses a PERIOD value, `start/end` or `start/duration`.
pub(crate) fn parse_period(period: &str) -> Result<(Timestamp, Timestamp), CalDavError> {
    let (start, rest) = period
        .trim()
        .split_once('/')
        .ok_or_else(|| CalDavError::Time(format!("not a period value: {period}")))?;
    let start = parse_utc(start)?;

    let end = if rest.starts_with(['P', '+', '-']) {
        let span: Span = rest.trim_start_matches('+').parse()?;
        start.to_zoned(TimeZone::UTC).checked_add(span)?.timestamp()
    } else {
        parse_utc(rest)?
    };
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;

    use super::*;

    #[test]
    fn floating_datetime_is_utc() {
        let dt = date(2007, 7, 14).at(17, 0, 0, 0);
        assert_eq!(to_utc_stamp(dt).unwrap(), "20070714T170000Z");
        assert_eq!(to_utc_stamp(date(2007, 7, 14)).unwrap(), "20070714T000000Z");
    }

    #[test]
    fn zoned_is_converted() {
        let zoned = date(2007, 7, 14)
            .at(19, 0, 0, 0)
            .to_zoned(TimeZone::fixed(jiff::tz::offset(2)))
            .unwrap();
        assert_eq!(to_utc_stamp(&zoned).unwrap(), "20070714T170000Z");
    }

    #[test]
    fn wall_clock_accepts_dates_and_datetimes() {
        let dt = parse_wall_clock("20230101").unwrap();
        assert_eq!(sort_stamp(dt), "2023-01-01000000");
        let dt = parse_wall_clock("20230102T103000Z").unwrap();
        assert_eq!(sort_stamp(dt), "2023-01-02103000");
        assert!(parse_wall_clock("tomorrow").is_none());
    }

    #[test]
    fn period_with_end_or_duration() {
        let (start, end) = parse_period("20070714T170000Z/20070715T040000Z").unwrap();
        assert_eq!(utc_stamp(start), "20070714T170000Z");
        assert_eq!(utc_stamp(end), "20070715T040000Z");

        let (start, end) = parse_period("20070715T040000Z/PT14H").unwrap();
        assert_eq!(utc_stamp(start), "20070715T040000Z");
        assert_eq!(utc_stamp(end), "20070715T180000Z");

        assert!(parse_period("20070715T040000Z").is_err());
    }
}
