//! Date header parsing.
//!
//! Accepted layouts, tried in order:
//!
//! ```text
//! Mon, 2 Jan 2006 15:04:05 -0700
//! Mon, 2 Jan 2006 15:04 -0700
//! Mon, 2 Jan 2006 15:04:05 -0700 (MST)
//! Mon, 2 Jan 2006 15:04 -0700 (MST)
//! ```
//!
//! Parsing never fails: anything else yields [`zero_date`].

use chrono::{DateTime, FixedOffset};

const DAY_NAMES: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];

/// `(format after the day name, trailing zone comment)` per layout.
const LAYOUTS: [(&str, bool); 4] = [
    ("%d %b %Y %H:%M:%S %z", false),
    ("%d %b %Y %H:%M %z", false),
    ("%d %b %Y %H:%M:%S %z", true),
    ("%d %b %Y %H:%M %z", true),
];

/// The instant returned for unparseable dates: the Unix epoch, UTC.
#[must_use]
pub fn zero_date() -> DateTime<FixedOffset> {
    DateTime::<FixedOffset>::default()
}

/// Parses a Date header value. Never fails.
///
/// The day name must be present and well-formed but is not checked
/// against the date.
#[must_use]
pub fn parse_date(value: &str) -> DateTime<FixedOffset> {
    let value = value.trim();

    if let Some(rest) = strip_day_name(value) {
        for (format, commented) in LAYOUTS {
            let candidate = if commented {
                match strip_zone_comment(rest) {
                    Some(stripped) => stripped,
                    None => continue,
                }
            } else {
                rest
            };
            if let Ok(date) = DateTime::parse_from_str(candidate, format) {
                return date;
            }
        }
    }

    tracing::trace!(value, "Unparseable date, using zero date");
    zero_date()
}

fn strip_day_name(value: &str) -> Option<&str> {
    let (day, rest) = value.split_once(',')?;
    let day = day.trim().to_ascii_lowercase();
    DAY_NAMES.contains(&day.as_str()).then(|| rest.trim_start())
}

/// Strips a trailing ` (ZONE)` comment.
fn strip_zone_comment(value: &str) -> Option<&str> {
    let open = value.strip_suffix(')')?.rfind('(')?;
    let head = &value[..open];
    head.ends_with(char::is_whitespace).then(|| head.trim_end())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::unreadable_literal)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};
    use proptest::prelude::*;

    fn expected(secs: i64, offset_secs: i32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(offset_secs)
            .unwrap()
            .timestamp_opt(secs, 0)
            .unwrap()
    }

    #[test]
    fn test_canonical_layout() {
        let date = parse_date("Mon, 2 Jan 2006 15:04:05 -0700");
        assert_eq!(date.to_rfc3339(), "2006-01-02T15:04:05-07:00");
    }

    #[test]
    fn test_without_seconds() {
        let date = parse_date("Mon, 02 Jan 2006 15:04 +0100");
        assert_eq!(date.to_rfc3339(), "2006-01-02T15:04:00+01:00");
    }

    #[test]
    fn test_with_zone_comment() {
        let date = parse_date("Tue, 3 Feb 2009 10:11:12 +0000 (UTC)");
        assert_eq!(date, expected(1233655872, 0));

        let date = parse_date("Tue, 3 Feb 2009 10:11 -0500 (EST)");
        assert_eq!(date.to_rfc3339(), "2009-02-03T10:11:00-05:00");
    }

    #[test]
    fn test_day_name_not_checked_against_date() {
        let date = parse_date("Fri, 2 Jan 2006 15:04:05 -0700");
        assert_eq!(date.to_rfc3339(), "2006-01-02T15:04:05-07:00");
    }

    #[test]
    fn test_unparseable_is_zero_not_error() {
        assert_eq!(parse_date(""), zero_date());
        assert_eq!(parse_date("yesterday"), zero_date());
        assert_eq!(parse_date("2 Jan 2006 15:04:05 -0700"), zero_date());
        assert_eq!(parse_date("Mon, 2 Jan 2006"), zero_date());
        assert_eq!(parse_date("Mon, 2 Jan 2006 15:04:05 -0700 UTC"), zero_date());
        assert_eq!(zero_date().timestamp(), 0);
    }

    proptest! {
        #[test]
        fn prop_layouts_round_trip(
            secs in 0i64..4_000_000_000,
            offset_minutes in -720i32..=840,
            layout in 0usize..4,
        ) {
            let original = expected(secs, offset_minutes * 60);
            let with_seconds = layout % 2 == 0;
            let original = if with_seconds {
                original
            } else {
                original.with_second(0).unwrap()
            };

            let mut text = if with_seconds {
                original.format("%a, %-d %b %Y %H:%M:%S %z").to_string()
            } else {
                original.format("%a, %-d %b %Y %H:%M %z").to_string()
            };
            if layout >= 2 {
                text.push_str(" (XYZ)");
            }

            let parsed = parse_date(&text);
            prop_assert_eq!(parsed, original);
            prop_assert_eq!(parsed.offset(), original.offset());
        }
    }
}
