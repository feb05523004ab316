//! Synthetic decode program for snapshot tests.
//!
//! Answers the three query shapes of `GridDecoder` for a 3x3 grid spanning
//! 60.0..=60.4 N and 24.0..=25.0 E. The center point (60.2, 24.5) has
//! distinctive values.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use grib_decoder::{DecodeCommand, DecodeError, DecodeResult};

pub const CENTER: (f64, f64) = (60.2, 24.5);

#[derive(Default)]
pub struct GridStub {
    /// Coordinates whose point query exits non-zero
    pub failing: Mutex<HashSet<String>>,
    /// Artificial latency per point query
    pub delay: Option<Duration>,
    pub timestamp_output: Option<String>,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub point_calls: AtomicUsize,
}

impl GridStub {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn fail_at(&self, lat: f64, lng: f64) {
        self.failing.lock().unwrap().insert(format!("{},{}", lat, lng));
    }

    async fn point(&self, selector: &str) -> DecodeResult<String> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        self.point_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let mut parts = selector.split(',');
        let lat: f64 = parts.next().unwrap().parse().unwrap();
        let lng: f64 = parts.next().unwrap().parse().unwrap();

        if self.failing.lock().unwrap().contains(&format!("{},{}", lat, lng)) {
            return Err(DecodeError::ExitStatus {
                code: Some(1),
                stderr: "point not in grid".to_string(),
            });
        }

        Ok(point_output(lat, lng))
    }
}

/// Two forecast hours per location.
pub fn point_output(lat: f64, lng: f64) -> String {
    let (v, u, msl) = if (lat, lng) == CENTER {
        (3.72291, 4.61555, 101325.0)
    } else {
        (1.0, 0.0, 100000.0)
    };

    let mut out = String::new();
    for hour in [1, 0] {
        out.push_str(&format!("10v 20150827 600 {} {}\n", hour, v));
        out.push_str(&format!("10u 20150827 600 {} {}\n", hour, u));
        out.push_str(&format!("msl 20150827 600 {} {}\n", hour, msl + hour as f64 * 1000.0));
        out.push_str(&format!("prate 20150827 600 {} 0.0001\n", hour));
    }
    out
}

#[async_trait]
impl DecodeCommand for GridStub {
    async fn run(&self, args: &[String]) -> DecodeResult<String> {
        if let Some(pos) = args.iter().position(|a| a == "-l") {
            return self.point(&args[pos + 1]).await;
        }
        if args[1].starts_with("latitudeOfFirstGridPoint") {
            // North-to-south scan order
            return Ok("60.4 24 60 25\n".to_string());
        }
        if args[1] == "dataDate,dataTime" {
            return Ok(self
                .timestamp_output
                .clone()
                .unwrap_or_else(|| "20150827 600\n".to_string()));
        }
        Err(DecodeError::EmptyOutput)
    }
}
