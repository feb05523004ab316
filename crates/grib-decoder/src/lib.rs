//! GRIB grid decoding via an external decode program.
//!
//! The grid file itself is never parsed here. Each query runs the decode
//! program (ecCodes `grib_get` by default) once, reads its line-oriented text
//! output and turns it into typed samples:
//!
//! - [`GridDecoder::decode_point`] - raw samples for one location
//! - [`GridDecoder::decode_bounds`] - the grid's geographic extent
//! - [`GridDecoder::decode_timestamp`] - the grid's reference time
//!
//! [`PointForecastBuilder`] groups raw samples into an hourly forecast series
//! and derives wind speed/direction and pressure in millibars.

pub mod command;
pub mod decoder;
pub mod error;
pub mod point;
pub mod records;

pub use command::{DecodeCommand, GribGet};
pub use decoder::GridDecoder;
pub use error::{DecodeError, DecodeResult};
pub use point::{ParameterNames, PointForecastBuilder};
pub use records::RawSample;
