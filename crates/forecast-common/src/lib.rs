//! Common types and utilities shared by the forecast proxy crates.

pub mod error;
pub mod forecast;
pub mod geo;
pub mod time;

pub use error::{ForecastError, ForecastResult};
pub use forecast::{AreaForecast, ForecastItem, PointForecast};
pub use geo::{point_in_polygon, Bounds, Coordinate};
pub use time::{parse_grid_time, parse_query_time, TimeParseError};
