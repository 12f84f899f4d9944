/*
 * mailheaders - datetime
 *
 * Copyright 2019 Manos Pitsidianakis
 *
 * This file is part of mailheaders.
 *
 * mailheaders is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * mailheaders is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with mailheaders. If not, see <http://www.gnu.org/licenses/>.
 */

//! Functions for dealing with date strings and UNIX Epoch timestamps.
//!
//! Timezone offsets are kept in the `RFC5322` `±HHMM` integer form (`-500`
//! stands for `-0500`), the same form they are written in.
//!
//! # Examples
//!
//! ```rust
//! # use mailheaders::utils::datetime::*;
//! let timestamp = rfc5322_to_timestamp("Wed, 8 Jan 2020 10:44:03 -0800").unwrap();
//! assert_eq!(timestamp, (1578509043, -800));
//!
//! assert_eq!(
//!     timestamp_to_rfc5322(1578509043, -800),
//!     "Wed, 08 Jan 2020 10:44:03 -0800"
//! );
//! ```

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, TimeZone, Utc};

use crate::error::Result;

pub type UnixTimestamp = i64;

/// A timezone offset in `±HHMM` form.
pub type TzOffset = i32;

pub mod formats {
    /// `<date>`T`<time>`
    pub const RFC3339_DATETIME: &str = "%Y-%m-%dT%H:%M:%S";

    pub const RFC822_DATE: &str = "%a, %d %b %Y %H:%M:%S %z";
}

pub fn now() -> UnixTimestamp {
    Utc::now().timestamp()
}

/// Return a UNIX epoch timestamp as an `RFC3339` string in UTC.
pub fn timestamp_to_string(timestamp: UnixTimestamp) -> String {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .unwrap_or_default()
        .format(formats::RFC3339_DATETIME)
        .to_string()
}

/// Converts a `±HHMM` offset to seconds east of UTC.
///
/// Returns `None` when the minutes part is not a valid minute count or the
/// offset is a day or more.
pub fn tz_offset_to_seconds(tz_offset: TzOffset) -> Option<i32> {
    let hours = tz_offset / 100;
    let minutes = tz_offset % 100;
    if minutes.abs() >= 60 || hours.abs() >= 24 {
        return None;
    }
    Some(hours * 3600 + minutes * 60)
}

/// Converts seconds east of UTC to a `±HHMM` offset, dropping seconds.
pub fn seconds_to_tz_offset(seconds: i32) -> TzOffset {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    hours * 100 + minutes
}

/// Formats a timestamp and offset pair as an `RFC5322` `date-time`, e.g.
/// `Sat, 31 May 2008 08:56:43 -0500`.
///
/// Invalid offsets are written as `+0000`.
pub fn timestamp_to_rfc5322(timestamp: UnixTimestamp, tz_offset: TzOffset) -> String {
    let offset = tz_offset_to_seconds(tz_offset)
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| Utc.fix());
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .unwrap_or_default()
        .with_timezone(&offset)
        .format(formats::RFC822_DATE)
        .to_string()
}

/// Builds a timestamp out of calendar fields expressed in the local time of
/// `tz_offset`.
pub fn timestamp_from_fields(
    (year, month, day): (i32, u32, u32),
    (hour, minute, second): (u32, u32, u32),
    tz_offset: TzOffset,
) -> Option<UnixTimestamp> {
    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)?;
    let local = Utc.from_utc_datetime(&naive).timestamp();
    Some(local - i64::from(tz_offset_to_seconds(tz_offset).unwrap_or(0)))
}

/// Parses an `RFC5322` `date-time` into a timestamp and offset pair.
pub fn rfc5322_to_timestamp<T: AsRef<[u8]>>(s: T) -> Result<(UnixTimestamp, TzOffset)> {
    crate::email::parser::dates::rfc5322_date(s.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datetime_tz_offsets() {
        assert_eq!(tz_offset_to_seconds(-500), Some(-5 * 3600));
        assert_eq!(tz_offset_to_seconds(530), Some(5 * 3600 + 30 * 60));
        assert_eq!(tz_offset_to_seconds(0), Some(0));
        assert_eq!(tz_offset_to_seconds(175), None);
        assert_eq!(tz_offset_to_seconds(2400), None);
        assert_eq!(seconds_to_tz_offset(-5 * 3600), -500);
        assert_eq!(seconds_to_tz_offset(5 * 3600 + 30 * 60), 530);
    }

    #[test]
    fn test_datetime_rfc5322_format() {
        let expected = DateTime::parse_from_rfc2822("Sat, 31 May 2008 08:56:43 -0500").unwrap();
        assert_eq!(
            timestamp_to_rfc5322(expected.timestamp(), -500),
            "Sat, 31 May 2008 08:56:43 -0500"
        );
        assert_eq!(
            timestamp_to_rfc5322(expected.timestamp(), 0),
            "Sat, 31 May 2008 13:56:43 +0000"
        );
        assert_eq!(
            timestamp_to_rfc5322(expected.timestamp(), 9999),
            "Sat, 31 May 2008 13:56:43 +0000"
        );
        assert_eq!(timestamp_to_rfc5322(0, 0), "Thu, 01 Jan 1970 00:00:00 +0000");
    }

    #[test]
    fn test_datetime_from_fields() {
        let expected = DateTime::parse_from_rfc2822("Sat, 31 May 2008 08:56:43 -0500").unwrap();
        assert_eq!(
            timestamp_from_fields((2008, 5, 31), (8, 56, 43), -500),
            Some(expected.timestamp())
        );
        assert_eq!(timestamp_from_fields((2008, 2, 30), (8, 56, 43), -500), None);
    }

    #[test]
    fn test_datetime_now() {
        // 2020-01-01T00:00:00Z
        assert!(now() > 1577836800);
        assert_eq!(timestamp_to_string(now()).len(), "2020-01-08T18:44:03".len());
    }

    #[test]
    fn test_datetime_timestamp_to_string() {
        assert_eq!(timestamp_to_string(1578509043), "2020-01-08T18:44:03");
    }
}
