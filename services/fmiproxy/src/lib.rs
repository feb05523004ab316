//! HIRLAM forecast proxy service.
//!
//! Keeps a locally decoded snapshot of the latest FMI HIRLAM surface grid and
//! serves whole-area, bounded-area and single-point forecasts over HTTP.
//! A background [`scheduler::RefreshScheduler`] polls upstream, downloads
//! newer grids and swaps in rebuilt snapshots while requests keep being
//! answered from the previous one.

pub mod config;
pub mod download;
pub mod error;
pub mod handlers;
pub mod metadata;
pub mod metrics;
pub mod scheduler;
pub mod state;
pub mod upstream;
