//! Geographic coordinate and bounds types.

use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, ForecastResult};

/// Tolerance used when deciding whether a point lies on a polygon edge.
const EDGE_EPSILON: f64 = 1e-9;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lng")]
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Parse a coordinate from request parameter strings.
    pub fn parse(latitude: &str, longitude: &str) -> ForecastResult<Self> {
        let lat = parse_degrees(latitude)?;
        let lng = parse_degrees(longitude)?;
        if !(-90.0..=90.0).contains(&lat) {
            return Err(ForecastError::InvalidCoordinate(format!(
                "latitude {} out of range",
                lat
            )));
        }
        if !(-180.0..=360.0).contains(&lng) {
            return Err(ForecastError::InvalidCoordinate(format!(
                "longitude {} out of range",
                lng
            )));
        }
        Ok(Self::new(lat, lng))
    }
}

fn parse_degrees(s: &str) -> ForecastResult<f64> {
    let value: f64 = s
        .trim()
        .parse()
        .map_err(|_| ForecastError::InvalidCoordinate(s.to_string()))?;
    if !value.is_finite() {
        return Err(ForecastError::InvalidCoordinate(s.to_string()));
    }
    Ok(value)
}

/// A rectangle in lat/lng space given by its southwest and northeast corners.
///
/// The southwest corner is never north or east of the northeast corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    sw_corner: Coordinate,
    ne_corner: Coordinate,
}

impl Bounds {
    /// Create bounds from already sorted corners.
    pub fn new(sw_corner: Coordinate, ne_corner: Coordinate) -> ForecastResult<Self> {
        if sw_corner.latitude > ne_corner.latitude || sw_corner.longitude > ne_corner.longitude {
            return Err(ForecastError::InvalidBounds(format!(
                "southwest corner ({}, {}) is not south-west of northeast corner ({}, {})",
                sw_corner.latitude, sw_corner.longitude, ne_corner.latitude, ne_corner.longitude
            )));
        }
        Ok(Self {
            sw_corner,
            ne_corner,
        })
    }

    /// Smallest bounds enclosing two arbitrary corners.
    pub fn enclosing(a: Coordinate, b: Coordinate) -> Self {
        Self {
            sw_corner: Coordinate::new(
                a.latitude.min(b.latitude),
                a.longitude.min(b.longitude),
            ),
            ne_corner: Coordinate::new(
                a.latitude.max(b.latitude),
                a.longitude.max(b.longitude),
            ),
        }
    }

    /// Parse the request form "swLat,swLng,neLat,neLng".
    pub fn from_query(s: &str) -> ForecastResult<Self> {
        let parts: Vec<&str> = s.trim().split(',').collect();
        if parts.len() != 4 {
            return Err(ForecastError::InvalidBounds(format!(
                "{}. Expected 'swLat,swLng,neLat,neLng'",
                s
            )));
        }

        let mut values = [0.0f64; 4];
        for (value, part) in values.iter_mut().zip(&parts) {
            *value = part
                .trim()
                .parse()
                .ok()
                .filter(|v: &f64| v.is_finite())
                .ok_or_else(|| ForecastError::InvalidBounds(format!("invalid number: {}", part)))?;
        }

        Self::new(
            Coordinate::new(values[0], values[1]),
            Coordinate::new(values[2], values[3]),
        )
    }

    pub fn sw_corner(&self) -> Coordinate {
        self.sw_corner
    }

    pub fn ne_corner(&self) -> Coordinate {
        self.ne_corner
    }

    /// The four corners in winding order: SW, NW, NE, SE.
    pub fn corners(&self) -> [Coordinate; 4] {
        [
            self.sw_corner,
            Coordinate::new(self.ne_corner.latitude, self.sw_corner.longitude),
            self.ne_corner,
            Coordinate::new(self.sw_corner.latitude, self.ne_corner.longitude),
        ]
    }

    /// Whether a coordinate lies inside or on the edge of these bounds.
    pub fn contains(&self, coordinate: &Coordinate) -> bool {
        point_in_polygon(coordinate, &self.corners())
    }
}

/// Point-in-polygon test (even-odd rule) that counts points on an edge as inside.
pub fn point_in_polygon(point: &Coordinate, polygon: &[Coordinate]) -> bool {
    if polygon.is_empty() {
        return false;
    }

    let (x, y) = (point.longitude, point.latitude);
    let mut inside = false;
    let mut j = polygon.len() - 1;

    for i in 0..polygon.len() {
        let (xi, yi) = (polygon[i].longitude, polygon[i].latitude);
        let (xj, yj) = (polygon[j].longitude, polygon[j].latitude);

        if on_segment(x, y, xi, yi, xj, yj) {
            return true;
        }

        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }

    inside
}

fn on_segment(px: f64, py: f64, ax: f64, ay: f64, bx: f64, by: f64) -> bool {
    let cross = (bx - ax) * (py - ay) - (by - ay) * (px - ax);
    if cross.abs() > EDGE_EPSILON {
        return false;
    }
    px >= ax.min(bx) - EDGE_EPSILON
        && px <= ax.max(bx) + EDGE_EPSILON
        && py >= ay.min(by) - EDGE_EPSILON
        && py <= ay.max(by) + EDGE_EPSILON
}
