use std::f64::consts::PI;

use crate::geo::{LatLng, LatLngBounds};

const MIN_ZOOM: f64 = 0.5;
const MAX_ZOOM: f64 = 100.0;
/// Zoom used when fitting a single point (a street-level view)
const POINT_ZOOM: f64 = 48.0;

/// Viewport representing the visible map area and zoom level
#[derive(Clone)]
pub struct Viewport {
    /// Center longitude (-180 to 180)
    pub center_lon: f64,
    /// Center latitude (-90 to 90)
    pub center_lat: f64,
    /// Zoom level (higher = more zoomed in)
    pub zoom: f64,
    /// Canvas pixel width
    pub width: usize,
    /// Canvas pixel height
    pub height: usize,
}

impl Viewport {
    pub fn new(center_lon: f64, center_lat: f64, zoom: f64, width: usize, height: usize) -> Self {
        Self {
            center_lon,
            center_lat,
            zoom,
            width,
            height,
        }
    }

    /// Create a world view (shows entire world)
    pub fn world(width: usize, height: usize) -> Self {
        Self::new(0.0, 20.0, 1.0, width, height)
    }

    /// Pan the viewport by pixel delta
    pub fn pan(&mut self, dx: i32, dy: i32) {
        let scale = 360.0 / (self.zoom * self.width as f64);
        self.center_lon += dx as f64 * scale;
        self.center_lat -= dy as f64 * scale * 0.5; // Mercator distortion

        // Wrap longitude
        if self.center_lon > 180.0 {
            self.center_lon -= 360.0;
        } else if self.center_lon < -180.0 {
            self.center_lon += 360.0;
        }

        // Clamp latitude
        self.center_lat = self.center_lat.clamp(-85.0, 85.0);
    }

    /// Zoom in by a factor
    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom * 1.5).min(MAX_ZOOM);
    }

    /// Zoom out by a factor
    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom / 1.5).max(MIN_ZOOM);
    }

    /// Zoom in towards a specific pixel location
    pub fn zoom_in_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.5);
    }

    /// Zoom out from a specific pixel location
    pub fn zoom_out_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.0 / 1.5);
    }

    /// Zoom by factor towards a specific pixel location
    fn zoom_at(&mut self, px: i32, py: i32, factor: f64) {
        // Get the geographic coordinates under the mouse
        let (lon, lat) = self.unproject(px, py);

        // Apply the zoom
        let new_zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        self.zoom = new_zoom;

        // Calculate where that point would now project to
        let (new_px, new_py) = self.project(lon, lat);

        // Calculate the offset needed to bring it back under the mouse
        let dx = new_px - px;
        let dy = new_py - py;

        // Pan to compensate
        self.pan(dx, dy);
    }

    /// Center on a point at a fixed zoom
    pub fn set_view(&mut self, center: LatLng, zoom: f64) {
        self.center_lon = center.lng;
        self.center_lat = center.lat.clamp(-85.0, 85.0);
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Center on a single point at street-level zoom
    pub fn focus_point(&mut self, center: LatLng) {
        self.set_view(center, POINT_ZOOM);
    }

    /// Fit the viewport to a lat/lng box, then back off one step so the
    /// shape has breathing room (the widget convention this mirrors)
    pub fn fit_bounds(&mut self, bounds: &LatLngBounds) {
        let min_y = mercator_y(bounds.north);
        let max_y = mercator_y(bounds.south);

        let dx = (bounds.east - bounds.west).abs() / 360.0;
        let dy = (max_y - min_y).abs();

        // Degenerate box: just focus the center
        if dx < 1e-9 && dy < 1e-9 {
            self.focus_point(bounds.center());
            return;
        }

        // project() scales both axes by zoom * width, so the x constraint is
        // 1/dx and the y constraint height/(width * dy)
        let zoom_x = if dx > 1e-9 { 1.0 / dx } else { MAX_ZOOM };
        let zoom_y = if dy > 1e-9 {
            self.height as f64 / (self.width as f64 * dy)
        } else {
            MAX_ZOOM
        };

        let fitted = (zoom_x.min(zoom_y) * 0.5).clamp(MIN_ZOOM, MAX_ZOOM);
        let center_lat = inverse_mercator_y((min_y + max_y) / 2.0);
        let center_lon = (bounds.west + bounds.east) / 2.0;

        self.set_view(LatLng::new(center_lat, center_lon), fitted);
    }

    /// Unproject pixel coordinates back to geographic coordinates (lon, lat)
    pub fn unproject(&self, px: i32, py: i32) -> (f64, f64) {
        let scale = self.zoom * self.width as f64;

        // Reverse the projection math
        let center_x = (self.center_lon + 180.0) / 360.0;
        let center_y = mercator_y(self.center_lat);

        let x = (px as f64 - self.width as f64 / 2.0) / scale + center_x;
        let y = (py as f64 - self.height as f64 / 2.0) / scale + center_y;

        // Convert from Web Mercator normalized coords back to lon/lat
        let lon = x * 360.0 - 180.0;
        let lat = inverse_mercator_y(y);

        (lon, lat)
    }

    /// Project a geographic coordinate (lon, lat) to pixel coordinates
    pub fn project(&self, lon: f64, lat: f64) -> (i32, i32) {
        // Web Mercator projection
        let x = (lon + 180.0) / 360.0;
        let y = mercator_y(lat);

        // Apply zoom and center offset
        let center_x = (self.center_lon + 180.0) / 360.0;
        let center_y = mercator_y(self.center_lat);

        let scale = self.zoom * self.width as f64;

        let px = ((x - center_x) * scale + self.width as f64 / 2.0) as i32;
        let py = ((y - center_y) * scale + self.height as f64 / 2.0) as i32;

        (px, py)
    }

    /// Project a geographic point
    pub fn project_latlng(&self, ll: LatLng) -> (i32, i32) {
        self.project(ll.lng, ll.lat)
    }

    /// Check if a projected point is visible in the viewport
    pub fn is_visible(&self, px: i32, py: i32) -> bool {
        px >= -10
            && px < self.width as i32 + 10
            && py >= -10
            && py < self.height as i32 + 10
    }

    /// Check if a line segment might be visible (rough bounding box check)
    pub fn line_might_be_visible(&self, p1: (i32, i32), p2: (i32, i32)) -> bool {
        let min_x = p1.0.min(p2.0);
        let max_x = p1.0.max(p2.0);
        let min_y = p1.1.min(p2.1);
        let max_y = p1.1.max(p2.1);

        max_x >= 0
            && min_x < self.width as i32
            && max_y >= 0
            && min_y < self.height as i32
    }
}

/// Normalized Web Mercator y in [0, 1] for latitudes within +/-85
fn mercator_y(lat: f64) -> f64 {
    let lat_rad = lat * PI / 180.0;
    (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0
}

fn inverse_mercator_y(y: f64) -> f64 {
    let lat_rad = (PI * (1.0 - 2.0 * y)).sinh().atan();
    lat_rad * 180.0 / PI
}
