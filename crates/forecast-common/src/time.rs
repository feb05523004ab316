//! Time handling for decoded grid records and request parameters.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

#[derive(Debug, thiserror::Error)]
pub enum TimeParseError {
    #[error("Invalid grid date: {0}")]
    InvalidDate(String),

    #[error("Invalid grid time: {0}")]
    InvalidTime(String),

    #[error("Invalid time format: {0}")]
    InvalidFormat(String),
}

/// Parse a grid record's `dataDate`/`dataTime` pair into a full-hour UTC instant.
///
/// `date` is `YYYYMMDD`. `time` is the integer `HHMM` field as printed by the
/// decode program, which drops leading zeros: `"0"`, `"600"`, `"1230"`. One
/// leading zero is restored for 1 and 3 character values, then the first two
/// characters are the hour. Minutes are discarded.
pub fn parse_grid_time(date: &str, time: &str) -> Result<DateTime<Utc>, TimeParseError> {
    let day = NaiveDate::parse_from_str(date.trim(), "%Y%m%d")
        .map_err(|_| TimeParseError::InvalidDate(date.to_string()))?;

    let time = time.trim();
    if time.is_empty() || !time.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TimeParseError::InvalidTime(time.to_string()));
    }

    let padded = if time.len() == 1 || time.len() == 3 {
        format!("0{}", time)
    } else {
        time.to_string()
    };

    let hour: u32 = padded[..2]
        .parse()
        .map_err(|_| TimeParseError::InvalidTime(time.to_string()))?;

    let naive = day
        .and_hms_opt(hour, 0, 0)
        .ok_or_else(|| TimeParseError::InvalidTime(time.to_string()))?;

    Ok(Utc.from_utc_datetime(&naive))
}

/// Parse a request time parameter (RFC 3339, or naive ISO 8601 assumed UTC).
pub fn parse_query_time(s: &str) -> Result<DateTime<Utc>, TimeParseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(ndt) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    Err(TimeParseError::InvalidFormat(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hour(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2015, 8, 27, h, 0, 0).unwrap()
    }

    #[test]
    fn test_grid_time_shapes() {
        assert_eq!(parse_grid_time("20150827", "0").unwrap(), hour(0));
        assert_eq!(parse_grid_time("20150827", "6").unwrap(), hour(6));
        assert_eq!(parse_grid_time("20150827", "12").unwrap(), hour(12));
        assert_eq!(parse_grid_time("20150827", "600").unwrap(), hour(6));
        assert_eq!(parse_grid_time("20150827", "1600").unwrap(), hour(16));
    }

    #[test]
    fn test_grid_time_discards_minutes() {
        assert_eq!(parse_grid_time("20150827", "1230").unwrap(), hour(12));
        assert_eq!(parse_grid_time("20150827", "645").unwrap(), hour(6));
    }

    #[test]
    fn test_grid_time_rejects_garbage() {
        assert!(parse_grid_time("20150827", "").is_err());
        assert!(parse_grid_time("20150827", "12a0").is_err());
        assert!(parse_grid_time("20150827", "2500").is_err());
        assert!(parse_grid_time("2015-08-27", "600").is_err());
    }

    #[test]
    fn test_query_time_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        assert_eq!(parse_query_time("2024-01-15T12:00:00Z").unwrap(), expected);
        assert_eq!(parse_query_time("2024-01-15T14:00:00+02:00").unwrap(), expected);
        assert_eq!(parse_query_time("2024-01-15T12:00:00").unwrap(), expected);
        assert_eq!(
            parse_query_time("2024-01-15").unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()
        );
        assert!(parse_query_time("yesterday").is_err());
    }
}
