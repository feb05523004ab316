//! Grid product metadata from the WFS stored query.
//!
//! The response is a `wfs:FeatureCollection` with one `wfs:member` per
//! published grid. Each member carries its publication time at
//! `omso:GridSeriesObservation/om:resultTime/gml:TimeInstant/gml:timePosition`.

use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::upstream::UpstreamError;

/// Path of the publication time below a `member` element, by local name.
const RESULT_TIME_PATH: [&[u8]; 3] = [b"resultTime", b"TimeInstant", b"timePosition"];

/// Publication times of every grid member, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridMetadata {
    pub result_times: Vec<DateTime<Utc>>,
}

impl GridMetadata {
    pub fn parse(xml: &str) -> Result<Self, UpstreamError> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut path: Vec<Vec<u8>> = Vec::new();
        let mut member_depth: Option<usize> = None;
        let mut current: Option<DateTime<Utc>> = None;
        let mut result_times = Vec::new();

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let name = e.local_name().as_ref().to_vec();
                    if name == b"member" && member_depth.is_none() {
                        member_depth = Some(path.len());
                        current = None;
                    }
                    path.push(name);
                }
                Ok(Event::Text(t)) => {
                    if member_depth.is_some() && at_result_time(&path) {
                        let text = t.unescape().map_err(|e| UpstreamError::Metadata(e.to_string()))?;
                        current = Some(parse_time(text.trim())?);
                    }
                }
                Ok(Event::End(_)) => {
                    path.pop();
                    if member_depth == Some(path.len()) {
                        member_depth = None;
                        let time = current.take().ok_or_else(|| {
                            UpstreamError::Metadata("grid member without result time".to_string())
                        })?;
                        result_times.push(time);
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(UpstreamError::Metadata(format!(
                        "XML error at position {}: {}",
                        reader.buffer_position(),
                        e
                    )))
                }
            }
        }

        Ok(Self { result_times })
    }

    /// Publication time of the last member.
    pub fn latest(&self) -> Option<DateTime<Utc>> {
        self.result_times.last().copied()
    }
}

fn at_result_time(path: &[Vec<u8>]) -> bool {
    path.len() >= RESULT_TIME_PATH.len()
        && path[path.len() - RESULT_TIME_PATH.len()..]
            .iter()
            .zip(RESULT_TIME_PATH)
            .all(|(name, expected)| name.as_slice() == expected)
}

fn parse_time(s: &str) -> Result<DateTime<Utc>, UpstreamError> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| UpstreamError::Metadata(format!("invalid timePosition '{}': {}", s, e)))
}
