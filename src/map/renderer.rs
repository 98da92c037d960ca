use ratatui::style::Color;

use crate::braille::BrailleCanvas;
use crate::map::geometry::{draw_circle, draw_line, draw_marker, draw_path, draw_ring};
use crate::map::overlay::{Overlay, OverlayKind};
use crate::map::projection::Viewport;

/// A geographic line (sequence of lon/lat coordinates)
pub type LineString = Vec<(f64, f64)>;

/// Level of detail for base-map data
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Lod {
    Low,    // 110m - world view
    Medium, // 50m - continental
    High,   // 10m - regional
}

impl Lod {
    /// Select LOD based on zoom level
    pub fn from_zoom(zoom: f64) -> Self {
        if zoom < 2.0 {
            Lod::Low
        } else if zoom < 8.0 {
            Lod::Medium
        } else {
            Lod::High
        }
    }
}

/// Display settings for base-map layers
#[derive(Clone)]
pub struct DisplaySettings {
    pub show_coastlines: bool,
    pub show_borders: bool,
    pub show_labels: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_coastlines: true,
            show_borders: true,
            show_labels: true,
        }
    }
}

/// Per-frame render output: colored canvas layers back-to-front plus
/// character-cell text labels
pub struct MapLayers {
    pub coastlines: BrailleCanvas,
    pub borders: BrailleCanvas,
    /// One canvas per distinct overlay color, in first-seen order
    pub overlays: Vec<(Color, BrailleCanvas)>,
    pub labels: Vec<(u16, u16, String)>,
}

/// Map renderer: multi-resolution base map plus the transient overlay layer
pub struct MapRenderer {
    pub coastlines_low: Vec<LineString>,
    pub coastlines_medium: Vec<LineString>,
    pub coastlines_high: Vec<LineString>,
    pub borders_medium: Vec<LineString>,
    pub borders_high: Vec<LineString>,
    pub settings: DisplaySettings,
}

impl MapRenderer {
    pub fn new() -> Self {
        Self {
            coastlines_low: Vec::new(),
            coastlines_medium: Vec::new(),
            coastlines_high: Vec::new(),
            borders_medium: Vec::new(),
            borders_high: Vec::new(),
            settings: DisplaySettings::default(),
        }
    }

    /// Get coastlines for the given LOD, falling back to coarser data
    fn get_coastlines(&self, lod: Lod) -> &Vec<LineString> {
        match lod {
            Lod::High => {
                if !self.coastlines_high.is_empty() {
                    &self.coastlines_high
                } else if !self.coastlines_medium.is_empty() {
                    &self.coastlines_medium
                } else {
                    &self.coastlines_low
                }
            }
            Lod::Medium => {
                if !self.coastlines_medium.is_empty() {
                    &self.coastlines_medium
                } else {
                    &self.coastlines_low
                }
            }
            Lod::Low => &self.coastlines_low,
        }
    }

    /// Get borders for the given LOD
    fn get_borders(&self, lod: Lod) -> &Vec<LineString> {
        match lod {
            Lod::High => {
                if !self.borders_high.is_empty() {
                    &self.borders_high
                } else {
                    &self.borders_medium
                }
            }
            _ => &self.borders_medium,
        }
    }

    /// Render base map and overlays into colored layers
    pub fn render(
        &self,
        char_width: usize,
        char_height: usize,
        viewport: &Viewport,
        overlays: &[Overlay],
    ) -> MapLayers {
        let lod = Lod::from_zoom(viewport.zoom);
        let mut layers = MapLayers {
            coastlines: BrailleCanvas::new(char_width, char_height),
            borders: BrailleCanvas::new(char_width, char_height),
            overlays: Vec::new(),
            labels: Vec::new(),
        };

        if self.settings.show_coastlines {
            for line in self.get_coastlines(lod) {
                draw_linestring(&mut layers.coastlines, line, viewport);
            }
        }

        if self.settings.show_borders {
            for line in self.get_borders(lod) {
                draw_linestring(&mut layers.borders, line, viewport);
            }
        }

        for overlay in overlays {
            let canvas = layer_for_color(
                &mut layers.overlays,
                overlay.color,
                char_width,
                char_height,
            );
            match &overlay.kind {
                OverlayKind::Marker { at, label } => {
                    let (px, py) = viewport.project_latlng(*at);
                    if viewport.is_visible(px, py) {
                        draw_marker(canvas, px, py, marker_size(viewport.zoom));
                        if self.settings.show_labels {
                            if let Some(text) = label {
                                push_label(&mut layers.labels, px, py, text.clone());
                            }
                        }
                    }
                }
                OverlayKind::Polyline { points } => {
                    let projected = project_all(points, viewport);
                    draw_path(canvas, &projected, viewport, true);
                    for &(px, py) in &projected {
                        if viewport.is_visible(px, py) {
                            draw_circle(canvas, px, py, 1);
                        }
                    }
                }
                OverlayKind::Polygon { points } => {
                    let projected = project_all(points, viewport);
                    draw_ring(canvas, &projected, viewport);
                }
            }
        }

        layers
    }

    /// Add coastline data at a specific LOD
    pub fn add_coastline(&mut self, line: LineString, lod: Lod) {
        match lod {
            Lod::Low => self.coastlines_low.push(line),
            Lod::Medium => self.coastlines_medium.push(line),
            Lod::High => self.coastlines_high.push(line),
        }
    }

    /// Add border data at a specific LOD
    pub fn add_border(&mut self, line: LineString, lod: Lod) {
        match lod {
            Lod::Medium => self.borders_medium.push(line),
            Lod::High => self.borders_high.push(line),
            Lod::Low => self.borders_medium.push(line), // Low uses medium
        }
    }

    /// Check if any base-map data is loaded
    pub fn has_data(&self) -> bool {
        !self.coastlines_low.is_empty()
            || !self.coastlines_medium.is_empty()
            || !self.coastlines_high.is_empty()
    }

    /// Toggle borders
    pub fn toggle_borders(&mut self) {
        self.settings.show_borders = !self.settings.show_borders;
    }

    /// Toggle marker labels
    pub fn toggle_labels(&mut self) {
        self.settings.show_labels = !self.settings.show_labels;
    }
}

impl Default for MapRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Draw a base-map linestring with viewport culling
fn draw_linestring(canvas: &mut BrailleCanvas, line: &LineString, viewport: &Viewport) {
    if line.len() < 2 {
        return;
    }

    let mut prev: Option<(i32, i32)> = None;

    for &(lon, lat) in line {
        let (px, py) = viewport.project(lon, lat);

        if let Some((prev_x, prev_y)) = prev {
            let dist = ((px - prev_x).abs() + (py - prev_y).abs()) as usize;
            if dist < viewport.width && viewport.line_might_be_visible((prev_x, prev_y), (px, py)) {
                draw_line(canvas, prev_x, prev_y, px, py);
            }
        }

        prev = Some((px, py));
    }
}

fn project_all(points: &[crate::geo::LatLng], viewport: &Viewport) -> Vec<(i32, i32)> {
    points
        .iter()
        .map(|&ll| viewport.project_latlng(ll))
        .collect()
}

fn layer_for_color(
    layers: &mut Vec<(Color, BrailleCanvas)>,
    color: Color,
    width: usize,
    height: usize,
) -> &mut BrailleCanvas {
    if let Some(idx) = layers.iter().position(|(c, _)| *c == color) {
        return &mut layers[idx].1;
    }
    layers.push((color, BrailleCanvas::new(width, height)));
    &mut layers.last_mut().expect("just pushed").1
}

fn marker_size(zoom: f64) -> i32 {
    if zoom > 10.0 {
        3
    } else if zoom > 6.0 {
        2
    } else {
        1
    }
}

/// Place a label one character right of a marker, in char-cell coords
fn push_label(labels: &mut Vec<(u16, u16, String)>, px: i32, py: i32, text: String) {
    if px < 0 || py < 0 {
        return;
    }
    let char_x = (px / 2) as u16;
    let char_y = (py / 4) as u16;
    if let Some(label_x) = char_x.checked_add(2) {
        labels.push((label_x, char_y, text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::LatLng;
    use crate::map::overlay::{CELL_COLOR, SHAPE_COLOR};

    fn square(cx: f64, cy: f64) -> Vec<LatLng> {
        vec![
            LatLng::new(cy - 1.0, cx - 1.0),
            LatLng::new(cy + 1.0, cx - 1.0),
            LatLng::new(cy + 1.0, cx + 1.0),
            LatLng::new(cy - 1.0, cx + 1.0),
        ]
    }

    #[test]
    fn test_overlays_group_by_color() {
        let renderer = MapRenderer::new();
        let viewport = Viewport::world(100, 50);
        let overlays = vec![
            Overlay::polygon(square(0.0, 0.0)),
            Overlay::polygon(square(10.0, 0.0)),
            Overlay {
                color: CELL_COLOR,
                ..Overlay::polygon(square(-10.0, 0.0))
            },
        ];

        let layers = renderer.render(50, 12, &viewport, &overlays);
        assert_eq!(layers.overlays.len(), 2);
        assert_eq!(layers.overlays[0].0, SHAPE_COLOR);
        assert_eq!(layers.overlays[1].0, CELL_COLOR);
        assert!(!layers.overlays[0].1.is_empty());
    }

    #[test]
    fn test_marker_label_collected() {
        let renderer = MapRenderer::new();
        let viewport = Viewport::world(100, 48);
        let overlays = vec![Overlay::labeled_marker(
            LatLng::new(20.0, 0.0),
            "1".to_string(),
        )];

        let layers = renderer.render(50, 12, &viewport, &overlays);
        assert_eq!(layers.labels.len(), 1);
        assert_eq!(layers.labels[0].2, "1");
    }

    #[test]
    fn test_labels_respect_toggle() {
        let mut renderer = MapRenderer::new();
        renderer.toggle_labels();
        let viewport = Viewport::world(100, 48);
        let overlays = vec![Overlay::labeled_marker(
            LatLng::new(20.0, 0.0),
            "1".to_string(),
        )];

        let layers = renderer.render(50, 12, &viewport, &overlays);
        assert!(layers.labels.is_empty());
    }

    #[test]
    fn test_lod_from_zoom() {
        assert!(matches!(Lod::from_zoom(1.0), Lod::Low));
        assert!(matches!(Lod::from_zoom(4.0), Lod::Medium));
        assert!(matches!(Lod::from_zoom(20.0), Lod::High));
    }
}
