//! Forecast snapshot construction and query engine.
//!
//! A [`SnapshotBuilder`] samples a grid file at fixed latitude/longitude
//! increments, decoding every location through a bounded number of
//! concurrent decode processes. The resulting [`AreaForecast`] is installed
//! into a [`ForecastCache`], which serves whole-area and bounded-area reads
//! while later snapshots are being built.
//!
//! [`AreaForecast`]: forecast_common::AreaForecast

pub mod cache;
pub mod error;
pub mod query;
pub mod sampling;
pub mod snapshot;

pub use cache::ForecastCache;
pub use error::{CacheError, CacheResult, SnapshotError, SnapshotResult};
pub use query::bounded_view;
pub use sampling::{round_to_1_decimal, sampling_coordinates, step_range};
pub use snapshot::{SnapshotBuilder, SnapshotConfig};
