//! Locations and the driving-time cost between them.
//!
//! Driving time is a straight-line approximation: the Euclidean distance in
//! degrees scaled by [`DRIVING_TIME_SCALE`] and rounded to whole seconds.
//! It is a pure function so scoring code may call it freely.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Seconds of driving per degree of Euclidean distance.
pub const DRIVING_TIME_SCALE: f64 = 4_000.0;

/// An immutable geographic point.
///
/// Serialized as `[latitude, longitude]`.
///
/// # Examples
///
/// ```
/// use dial_a_ride::geometry::Location;
///
/// let a = Location::new(0.0, 0.0);
/// let b = Location::new(0.003, 0.004);
///
/// // Distance 0.005 degrees at 4000 s/degree
/// assert_eq!(a.driving_time_to(&b), 20);
/// assert_eq!(b.driving_time_to(&a), 20);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Location {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl Location {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Driving time in seconds to `other`. See [`driving_time`].
    #[inline]
    pub fn driving_time_to(&self, other: &Location) -> i64 {
        driving_time(self, other)
    }
}

impl From<[f64; 2]> for Location {
    fn from([latitude, longitude]: [f64; 2]) -> Self {
        Self::new(latitude, longitude)
    }
}

impl From<Location> for [f64; 2] {
    fn from(location: Location) -> Self {
        [location.latitude, location.longitude]
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.latitude, self.longitude)
    }
}

/// Driving time in seconds between two locations.
///
/// Symmetric by construction and zero for identical points.
#[inline]
pub fn driving_time(a: &Location, b: &Location) -> i64 {
    let dlat = a.latitude - b.latitude;
    let dlon = a.longitude - b.longitude;
    ((dlat * dlat + dlon * dlon).sqrt() * DRIVING_TIME_SCALE).round() as i64
}

/// Computes the `(south_west, north_east)` corners enclosing `points`.
///
/// Returns two origin points for an empty input. Display only.
///
/// ```
/// use dial_a_ride::geometry::{bounding_box, Location};
///
/// let (sw, ne) = bounding_box([Location::new(1.0, 5.0), Location::new(-2.0, 7.0)]);
/// assert_eq!(sw, Location::new(-2.0, 5.0));
/// assert_eq!(ne, Location::new(1.0, 7.0));
/// ```
pub fn bounding_box(points: impl IntoIterator<Item = Location>) -> (Location, Location) {
    let mut points = points.into_iter().peekable();
    if points.peek().is_none() {
        return (Location::new(0.0, 0.0), Location::new(0.0, 0.0));
    }

    let mut min_lat = f64::MAX;
    let mut max_lat = f64::MIN;
    let mut min_lon = f64::MAX;
    let mut max_lon = f64::MIN;

    for loc in points {
        min_lat = min_lat.min(loc.latitude);
        max_lat = max_lat.max(loc.latitude);
        min_lon = min_lon.min(loc.longitude);
        max_lon = max_lon.max(loc.longitude);
    }

    (
        Location::new(min_lat, min_lon),
        Location::new(max_lat, max_lon),
    )
}
