//! Week alignment and the ISO date wire format.
//!
//! One week-numbering convention is used throughout: ISO 8601, weeks start on
//! Monday. Every date the scope state stores as a window start or expanded
//! week is passed through [`start_of_week`] first.

use chrono::{Datelike, Days, NaiveDate};

use crate::errors::CodecError;

/// Wire format for dates in query parameters.
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// First day (Monday) of the week containing `date`.
#[must_use]
pub fn start_of_week(date: NaiveDate) -> NaiveDate {
    let offset = u64::from(date.weekday().num_days_from_monday());
    date.checked_sub_days(Days::new(offset)).unwrap_or(date)
}

/// Last day (Sunday) of the week containing `date`.
#[must_use]
pub fn end_of_week(date: NaiveDate) -> NaiveDate {
    let start = start_of_week(date);
    start.checked_add_days(Days::new(6)).unwrap_or(start)
}

/// Format a date as `YYYY-MM-DD`.
#[must_use]
pub fn format_iso_date(date: NaiveDate) -> String {
    date.format(ISO_DATE_FORMAT).to_string()
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_iso_date(value: &str) -> Result<NaiveDate, CodecError> {
    NaiveDate::parse_from_str(value.trim(), ISO_DATE_FORMAT)
        .map_err(|_| CodecError::InvalidDate(value.to_owned()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;
    use proptest::prelude::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn start_of_week_is_monday() {
        // 2024-01-03 is a Wednesday
        assert_eq!(start_of_week(d(2024, 1, 3)), d(2024, 1, 1));
        assert_eq!(start_of_week(d(2024, 1, 1)), d(2024, 1, 1));
        // Sunday belongs to the week that started the previous Monday
        assert_eq!(start_of_week(d(2024, 1, 7)), d(2024, 1, 1));
    }

    #[test]
    fn end_of_week_is_sunday() {
        assert_eq!(end_of_week(d(2024, 1, 3)), d(2024, 1, 7));
        assert_eq!(end_of_week(d(2024, 1, 7)), d(2024, 1, 7));
    }

    #[test]
    fn week_crossing_year_boundary() {
        // 2025-01-01 is a Wednesday; its week starts in 2024
        assert_eq!(start_of_week(d(2025, 1, 1)), d(2024, 12, 30));
    }

    #[test]
    fn iso_format_and_parse() {
        assert_eq!(format_iso_date(d(2024, 3, 4)), "2024-03-04");
        assert_eq!(parse_iso_date("2024-03-04").unwrap(), d(2024, 3, 4));
        assert!(parse_iso_date("04.03.2024").is_err());
        assert!(parse_iso_date("").is_err());
    }

    proptest! {
        #[test]
        fn start_of_week_idempotent_and_monday(days in 0i64..200_000) {
            let date = d(1900, 1, 1) + chrono::Duration::days(days);
            let start = start_of_week(date);
            prop_assert_eq!(start.weekday(), Weekday::Mon);
            prop_assert_eq!(start_of_week(start), start);
            prop_assert!(start <= date);
            prop_assert!((date - start).num_days() < 7);
        }
    }
}
