use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};

/// Parse a duration in "minutes:seconds" form, e.g. "12:34" -> 754.
///
/// Anything else yields `None`; callers treat that as "duration unknown".
pub fn parse_minutes_seconds(value: &str) -> Option<u64> {
    let (minutes, seconds) = value.trim().split_once(':')?;
    let minutes: u64 = minutes.trim().parse().ok()?;
    let seconds: u64 = seconds.trim().parse().ok()?;
    minutes.checked_mul(60)?.checked_add(seconds)
}

/// Parse an ISO-8601 timestamp as found in page metadata.
///
/// Accepts RFC 3339, offsets without a colon, naive date-times (taken as UTC)
/// and bare dates (midnight UTC).
pub fn parse_datetime(value: &str) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt);
    }

    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt);
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc().fixed_offset());
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minutes_seconds_parses_valid_values() {
        assert_eq!(parse_minutes_seconds("12:34"), Some(754));
        assert_eq!(parse_minutes_seconds("0:05"), Some(5));
        assert_eq!(parse_minutes_seconds("90:00"), Some(5400));
        assert_eq!(parse_minutes_seconds(" 1:30 "), Some(90));
    }

    #[test]
    fn minutes_seconds_rejects_malformed_values() {
        assert_eq!(parse_minutes_seconds("abc"), None);
        assert_eq!(parse_minutes_seconds(""), None);
        assert_eq!(parse_minutes_seconds("12"), None);
        assert_eq!(parse_minutes_seconds("1:02:03"), None);
        assert_eq!(parse_minutes_seconds("-1:30"), None);
        assert_eq!(parse_minutes_seconds("ab:cd"), None);
    }

    #[test]
    fn datetime_parses_rfc3339() {
        let dt = parse_datetime("2024-01-15T12:30:00+02:00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-15T12:30:00+02:00");
    }

    #[test]
    fn datetime_parses_offset_without_colon() {
        let dt = parse_datetime("2024-01-15T12:30:00+0000").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-15T12:30:00+00:00");
    }

    #[test]
    fn datetime_parses_naive_as_utc() {
        let dt = parse_datetime("2024-01-15T12:30:00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-15T12:30:00+00:00");

        let dt = parse_datetime("2024-01-15 08:00:00.250").unwrap();
        assert_eq!(dt.format("%H:%M").to_string(), "08:00");
    }

    #[test]
    fn datetime_parses_bare_date() {
        let dt = parse_datetime("2024-01-15").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-15T00:00:00+00:00");
    }

    #[test]
    fn datetime_rejects_garbage() {
        assert!(parse_datetime("yesterday").is_none());
        assert!(parse_datetime("").is_none());
    }
}
