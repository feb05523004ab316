//! Parsing of the decode program's line-oriented text output.
//!
//! Point queries print one record per line:
//!
//! ```text
//! {shortName} {dataDate} {dataTime} {forecastTime} {value}
//! 10v 20150827 600 3 3.72291
//! ```
//!
//! The sample's real time is the reference instant plus `forecastTime` hours.

use chrono::{DateTime, Duration, Utc};
use forecast_common::{parse_grid_time, Bounds, Coordinate};

use crate::error::{DecodeError, DecodeResult};

/// One decoded `{parameter, time, value}` triple.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSample {
    pub name: String,
    pub time: DateTime<Utc>,
    pub value: f64,
}

/// Parse every non-empty line of point-query output.
pub fn parse_records(output: &str) -> DecodeResult<Vec<RawSample>> {
    non_empty_lines(output).map(parse_record).collect()
}

fn parse_record(line: &str) -> DecodeResult<RawSample> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 5 {
        return Err(malformed(line, "expected 5 fields"));
    }

    let reference_time = parse_grid_time(parts[1], parts[2])?;
    let offset_hours: i64 = parts[3]
        .parse()
        .map_err(|_| malformed(line, "forecast hour offset is not an integer"))?;
    let value: f64 = parts[4]
        .parse()
        .map_err(|_| malformed(line, "value is not a number"))?;

    Ok(RawSample {
        name: parts[0].to_string(),
        time: reference_time + Duration::hours(offset_hours),
        value,
    })
}

/// Parse the first line of a grid-extent query: four corner values
/// `{latFirst} {lngFirst} {latLast} {lngLast}`.
pub fn parse_bounds(output: &str) -> DecodeResult<Bounds> {
    let line = non_empty_lines(output).next().ok_or(DecodeError::EmptyOutput)?;

    let values = line
        .split_whitespace()
        .map(|part| {
            part.parse::<f64>()
                .map_err(|_| malformed(line, "corner value is not a number"))
        })
        .collect::<DecodeResult<Vec<f64>>>()?;

    if values.len() < 4 {
        return Err(malformed(line, "expected 4 corner values"));
    }

    Ok(Bounds::enclosing(
        Coordinate::new(values[0], values[1]),
        Coordinate::new(values[2], values[3]),
    ))
}

/// Parse the first line of a `dataDate dataTime` query.
pub fn parse_timestamp(output: &str) -> DecodeResult<DateTime<Utc>> {
    let line = non_empty_lines(output).next().ok_or(DecodeError::EmptyOutput)?;
    let mut parts = line.split_whitespace();

    match (parts.next(), parts.next()) {
        (Some(date), Some(time)) => Ok(parse_grid_time(date, time)?),
        _ => Err(malformed(line, "expected date and time")),
    }
}

fn non_empty_lines(output: &str) -> impl Iterator<Item = &str> {
    output.lines().map(str::trim).filter(|line| !line.is_empty())
}

fn malformed(line: &str, reason: &str) -> DecodeError {
    DecodeError::MalformedRecord {
        line: line.to_string(),
        reason: reason.to_string(),
    }
}
