//! Parsing of EXIF capture-date strings

use crate::error::{Error, Result};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

/// Date-time layouts accepted on the first, strict pass
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M",
];

/// Date-only layouts accepted on the first, strict pass
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// 0001-01-01, the zero value of most date types, counts as "no date"
fn is_min_date(date: &NaiveDate) -> bool {
    (date.year(), date.month(), date.day()) == (1, 1, 1)
}

/// Strip the NUL padding and quoting EXIF ASCII values often carry
pub fn clean_exif_value(raw: &str) -> &str {
    raw.trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .trim_matches('"')
        .trim()
}

/// Parse a date-time string written in one of the common ISO-like layouts
///
/// Returns `None` when no layout matches or the only match is the minimum
/// sentinel date. The EXIF-native `YYYY:MM:DD HH:MM:SS` form is intentionally
/// not accepted here; it goes through [`parse_year_month`].
pub fn parse_standard(s: &str) -> Option<NaiveDate> {
    let s = clean_exif_value(s);

    let date = DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
        .map(|dt| dt.date())
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
        })?;

    (!is_min_date(&date)).then_some(date)
}

/// Recover year and month from a colon-separated date string
///
/// Spaces become colons, the value is split on colons and the first two
/// tokens are read as year and month. The day is always 1: camera day
/// fields are too often out of range to be trusted.
pub fn parse_year_month(s: &str) -> Result<NaiveDate> {
    let cleaned = clean_exif_value(s).replace(' ', ":");
    let mut tokens = cleaned.split(':').map(str::trim);

    let unparseable = |message: &str| Error::DateUnparseable {
        value: s.to_string(),
        message: message.to_string(),
    };

    let year = tokens
        .next()
        .and_then(|t| t.parse::<i32>().ok())
        .ok_or_else(|| unparseable("missing numeric year"))?;
    let month = tokens
        .next()
        .and_then(|t| t.parse::<u32>().ok())
        .ok_or_else(|| unparseable("missing numeric month"))?;

    NaiveDate::from_ymd_opt(year, month, 1)
        .filter(|date| !is_min_date(date))
        .ok_or_else(|| unparseable("year and month do not form a calendar date"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_standard() {
        let date = parse_standard("2024-01-15 14:30:00").unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2024, 1, 15));

        let date = parse_standard("2024-01-15T14:30:00").unwrap();
        assert_eq!(date.day(), 15);

        let date = parse_standard("2024-01-15T14:30:00+02:00").unwrap();
        assert_eq!(date.day(), 15);

        let date = parse_standard("\"2024/01/15 14:30:00\"").unwrap();
        assert_eq!(date.month(), 1);

        let date = parse_standard("2024-01-15").unwrap();
        assert_eq!(date.year(), 2024);
    }

    #[test]
    fn test_parse_standard_rejects_exif_layout() {
        assert!(parse_standard("2016:03:10 12:19:14").is_none());
    }

    #[test]
    fn test_parse_standard_rejects_invalid_and_minimum() {
        assert!(parse_standard("2013-04-31 10:00:00").is_none());
        assert!(parse_standard("0001-01-01 00:00:00").is_none());
        assert!(parse_standard("invalid").is_none());
    }

    #[test]
    fn test_parse_year_month() {
        let date = parse_year_month("2016:03:10 12:19:14").unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2016, 3, 1));

        // Day 31 in April is discarded rather than rejected
        let date = parse_year_month("2013:04:31 10:00:00").unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2013, 4, 1));

        // NUL padding from the EXIF ASCII value
        let date = parse_year_month("2020:01:15 08:00:00\0").unwrap();
        assert_eq!(date.month(), 1);
    }

    #[test]
    fn test_parse_year_month_failures() {
        assert!(matches!(
            parse_year_month("garbage"),
            Err(Error::DateUnparseable { .. })
        ));
        assert!(matches!(
            parse_year_month("2013"),
            Err(Error::DateUnparseable { .. })
        ));
        assert!(matches!(
            parse_year_month("0000:00:00 00:00:00"),
            Err(Error::DateUnparseable { .. })
        ));
        assert!(matches!(
            parse_year_month("2013:13:01 00:00:00"),
            Err(Error::DateUnparseable { .. })
        ));
    }

    #[test]
    fn test_clean_exif_value() {
        assert_eq!(clean_exif_value("  \"2020:01:15\"\0\0"), "2020:01:15");
    }
}
