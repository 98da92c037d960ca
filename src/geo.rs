use std::fmt;

/// The earth's mean radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Degrees-to-radians multiplier used throughout the display math
const DEG_TO_RAD: f64 = 0.017_453_292_5;

#[inline(always)]
pub fn degrees_to_radians(degrees: f64) -> f64 {
    degrees * DEG_TO_RAD
}

/// A geographic point in degrees, WGS84-like. No range validation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

/// Great-circle distance in meters via the spherical law of cosines.
/// The cosine argument is clamped so identical points come out at exactly 0
/// instead of NaN from rounding past 1.0.
pub fn distance_between(a: LatLng, b: LatLng) -> f64 {
    let lat_a = degrees_to_radians(a.lat);
    let lat_b = degrees_to_radians(b.lat);
    let lng_a = degrees_to_radians(a.lng);
    let lng_b = degrees_to_radians(b.lng);

    let cos_angle =
        lat_a.sin() * lat_b.sin() + lat_a.cos() * lat_b.cos() * (lng_a - lng_b).cos();
    cos_angle.clamp(-1.0, 1.0).acos() * EARTH_RADIUS_M
}

/// Axis-aligned lat/lng box. Grows to cover whatever is extended into it;
/// no antimeridian handling (matches the rendering widget's assumption).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LatLngBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl LatLngBounds {
    /// Degenerate bounds covering a single point
    pub fn of(point: LatLng) -> Self {
        Self {
            south: point.lat,
            west: point.lng,
            north: point.lat,
            east: point.lng,
        }
    }

    /// Bounds covering two corner points in any order
    pub fn from_corners(a: LatLng, b: LatLng) -> Self {
        let mut bounds = Self::of(a);
        bounds.extend(b);
        bounds
    }

    /// Bounds covering a point list, None when empty
    pub fn from_points(points: &[LatLng]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut bounds = Self::of(*first);
        for &p in rest {
            bounds.extend(p);
        }
        Some(bounds)
    }

    /// Grow to include a point
    pub fn extend(&mut self, point: LatLng) {
        self.south = self.south.min(point.lat);
        self.north = self.north.max(point.lat);
        self.west = self.west.min(point.lng);
        self.east = self.east.max(point.lng);
    }

    /// Grow to include another bounds
    pub fn extend_bounds(&mut self, other: &LatLngBounds) {
        self.south = self.south.min(other.south);
        self.north = self.north.max(other.north);
        self.west = self.west.min(other.west);
        self.east = self.east.max(other.east);
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }

    pub fn north_east(&self) -> LatLng {
        LatLng::new(self.north, self.east)
    }

    pub fn north_west(&self) -> LatLng {
        LatLng::new(self.north, self.west)
    }

    pub fn south_east(&self) -> LatLng {
        LatLng::new(self.south, self.east)
    }

    pub fn south_west(&self) -> LatLng {
        LatLng::new(self.south, self.west)
    }

    /// Corner ring NW -> NE -> SE -> SW, for rendering a bbox as a polygon
    pub fn corner_ring(&self) -> [LatLng; 4] {
        [
            self.north_west(),
            self.north_east(),
            self.south_east(),
            self.south_west(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_to_self_is_zero() {
        let p = LatLng::new(40.74, -74.0);
        assert_eq!(distance_between(p, p), 0.0);
    }

    #[test]
    fn test_distance_symmetric() {
        let a = LatLng::new(40.7128, -74.006);
        let b = LatLng::new(51.5074, -0.1278);
        assert_eq!(distance_between(a, b), distance_between(b, a));
    }

    #[test]
    fn test_distance_nyc_london() {
        // Known great-circle distance: ~5570 km
        let nyc = LatLng::new(40.7128, -74.006);
        let london = LatLng::new(51.5074, -0.1278);
        let d = distance_between(nyc, london);
        assert!((d - 5_570_000.0).abs() < 10_000.0, "got {d}");
    }

    #[test]
    fn test_bounds_from_corners_any_order() {
        let a = LatLng::new(40.75, -74.1);
        let b = LatLng::new(40.74, -74.0);
        let bounds = LatLngBounds::from_corners(a, b);
        assert_eq!(bounds.south, 40.74);
        assert_eq!(bounds.north, 40.75);
        assert_eq!(bounds.west, -74.1);
        assert_eq!(bounds.east, -74.0);
    }

    #[test]
    fn test_bounds_corner_ring() {
        let bounds = LatLngBounds::from_corners(
            LatLng::new(40.74, -74.0),
            LatLng::new(40.75, -74.1),
        );
        let ring = bounds.corner_ring();
        assert_eq!(ring[0], LatLng::new(40.75, -74.1)); // NW
        assert_eq!(ring[1], LatLng::new(40.75, -74.0)); // NE
        assert_eq!(ring[2], LatLng::new(40.74, -74.0)); // SE
        assert_eq!(ring[3], LatLng::new(40.74, -74.1)); // SW
    }

    #[test]
    fn test_bounds_extend() {
        let mut bounds = LatLngBounds::of(LatLng::new(0.0, 0.0));
        bounds.extend(LatLng::new(10.0, -5.0));
        assert_eq!(bounds.north, 10.0);
        assert_eq!(bounds.west, -5.0);
        let other = LatLngBounds::of(LatLng::new(-3.0, 12.0));
        bounds.extend_bounds(&other);
        assert_eq!(bounds.south, -3.0);
        assert_eq!(bounds.east, 12.0);
    }
}
