use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;

use crate::api::{ApiEvent, ApiHandle, ApiRequest, CellInfo, CellStyles, CoverParams};
use crate::config::Config;
use crate::geo::{distance_between, LatLng, LatLngBounds};
use crate::map::{cell_overlay, Lod, MapRenderer, Overlay, Viewport};
use crate::parse::{self, CoordOrder, ParsedInput};

/// Example queries shown when the input is empty; an empty submit renders one
const PLACEHOLDERS: &[&str] = &[
    "40.74,-74.0",
    "40.74,-74.0,40.75,-74.1",
    "bbox: { ne: { lat: 40.74, lng: -74.0 }, sw: { lat: 40.75, lng: -74.1 } }",
];

/// How multi-point input is rendered
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawMode {
    Point,
    Line,
    Polygon,
}

impl DrawMode {
    pub fn label(self) -> &'static str {
        match self {
            DrawMode::Point => "point",
            DrawMode::Line => "line",
            DrawMode::Polygon => "polygon",
        }
    }
}

/// Which pane receives keystrokes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Focus {
    Map,
    Input,
}

/// Application state
pub struct App {
    pub viewport: Viewport,
    pub map_renderer: MapRenderer,
    pub should_quit: bool,
    /// Last mouse position for drag tracking
    pub last_mouse: Option<(u16, u16)>,
    /// Current mouse position for cursor marker
    pub mouse_pos: Option<(u16, u16)>,

    pub focus: Focus,
    pub input: String,
    pub placeholder: String,

    pub draw_mode: DrawMode,
    pub coord_order: CoordOrder,
    /// Clear overlays wholesale before each render
    pub clear_on_render: bool,
    /// Request an S2 covering for rendered shapes
    pub covering: bool,
    pub cover_params: CoverParams,

    /// Transient overlay layer, rebuilt on each render
    pub overlays: Vec<Overlay>,
    /// Info panel lines (descriptions, distances, errors)
    pub info: Vec<String>,
    previous_bounds: Option<LatLngBounds>,

    api: ApiHandle,
}

impl App {
    pub fn new(cfg: &Config, width: usize, height: usize) -> Result<Self> {
        let (pixel_width, pixel_height) = map_pixels(width, height);

        Ok(Self {
            viewport: Viewport::world(pixel_width, pixel_height),
            map_renderer: MapRenderer::new(),
            should_quit: false,
            last_mouse: None,
            mouse_pos: None,
            focus: Focus::Input,
            input: String::new(),
            placeholder: pick_placeholder(),
            draw_mode: DrawMode::Point,
            coord_order: CoordOrder::LatLng,
            clear_on_render: true,
            covering: false,
            cover_params: CoverParams::default(),
            overlays: Vec::new(),
            info: Vec::new(),
            previous_bounds: None,
            api: ApiHandle::spawn(cfg)?,
        })
    }

    /// Update viewport size when terminal resizes
    pub fn resize(&mut self, width: usize, height: usize) {
        let (pixel_width, pixel_height) = map_pixels(width, height);
        self.viewport.width = pixel_width;
        self.viewport.height = pixel_height;
    }

    /// Back to the world view; overlays and bounds state are dropped
    pub fn reset_view(&mut self) {
        self.viewport = Viewport::world(self.viewport.width, self.viewport.height);
        self.overlays.clear();
        self.info.clear();
        self.previous_bounds = None;
    }

    /// Pan the map
    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.viewport.pan(dx, dy);
    }

    /// Zoom in
    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
    }

    /// Zoom out
    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
    }

    /// Zoom in towards a screen position (terminal column/row)
    pub fn zoom_in_at(&mut self, col: u16, row: u16) {
        let (px, py) = braille_pixel(col, row);
        self.viewport.zoom_in_at(px, py);
    }

    /// Zoom out from a screen position (terminal column/row)
    pub fn zoom_out_at(&mut self, col: u16, row: u16) {
        let (px, py) = braille_pixel(col, row);
        self.viewport.zoom_out_at(px, py);
    }

    /// Request quit
    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Get current zoom level as a string
    pub fn zoom_level(&self) -> String {
        format!("{:.1}x", self.viewport.zoom)
    }

    /// Get current center coordinates as a string
    pub fn center_coords(&self) -> String {
        format!(
            "{:.1}°{}, {:.1}°{}",
            self.viewport.center_lat.abs(),
            if self.viewport.center_lat >= 0.0 { "N" } else { "S" },
            self.viewport.center_lon.abs(),
            if self.viewport.center_lon >= 0.0 { "E" } else { "W" }
        )
    }

    /// Get current LOD level as a string
    pub fn lod_level(&self) -> &'static str {
        match Lod::from_zoom(self.viewport.zoom) {
            Lod::Low => "110m",
            Lod::Medium => "50m",
            Lod::High => "10m",
        }
    }

    /// Handle mouse drag panning
    pub fn handle_drag(&mut self, x: u16, y: u16) {
        if let Some((last_x, last_y)) = self.last_mouse {
            let dx = last_x as i32 - x as i32;
            let dy = last_y as i32 - y as i32;
            // Scale based on zoom: less sensitive when zoomed out
            let scale = if self.viewport.zoom < 2.0 {
                2
            } else if self.viewport.zoom < 4.0 {
                3
            } else {
                4
            };
            self.pan(dx * scale, dy * scale);
        }
        self.last_mouse = Some((x, y));
    }

    /// Reset drag state when mouse button released
    pub fn end_drag(&mut self) {
        self.last_mouse = None;
    }

    /// Update mouse cursor position
    pub fn set_mouse_pos(&mut self, col: u16, row: u16) {
        self.mouse_pos = Some((col, row));
    }

    /// Get mouse position in braille pixel coordinates (for rendering marker)
    pub fn mouse_pixel_pos(&self) -> Option<(i32, i32)> {
        self.mouse_pos.map(|(col, row)| braille_pixel(col, row))
    }

    /// Right click echoes the clicked coordinates to the info panel
    pub fn echo_position(&mut self, col: u16, row: u16) {
        let (px, py) = braille_pixel(col, row);
        let (lon, lat) = self.viewport.unproject(px, py);
        self.add_info(format!("clicked: {lat},{lon}"));
    }

    // --- input editing ---

    pub fn focus_input(&mut self) {
        self.focus = Focus::Input;
    }

    pub fn focus_map(&mut self) {
        self.focus = Focus::Map;
    }

    pub fn push_char(&mut self, c: char) {
        self.input.push(c);
    }

    pub fn backspace(&mut self) {
        self.input.pop();
    }

    pub fn clear_input(&mut self) {
        self.input.clear();
    }

    // --- mode toggles ---

    pub fn set_draw_mode(&mut self, mode: DrawMode) {
        self.draw_mode = mode;
    }

    pub fn toggle_coord_order(&mut self) {
        self.coord_order = self.coord_order.toggled();
    }

    pub fn toggle_clear_on_render(&mut self) {
        self.clear_on_render = !self.clear_on_render;
    }

    pub fn toggle_covering(&mut self) {
        self.covering = !self.covering;
    }

    pub fn bump_min_level(&mut self, delta: i16) {
        bump_level(&mut self.cover_params.min_level, delta);
    }

    pub fn bump_max_level(&mut self, delta: i16) {
        bump_level(&mut self.cover_params.max_level, delta);
    }

    pub fn bump_max_cells(&mut self, delta: i32) {
        let current = self.cover_params.max_cells.unwrap_or(0) as i64 + delta as i64;
        self.cover_params.max_cells = if current <= 0 {
            None
        } else {
            Some(current.min(10_000) as u32)
        };
    }

    pub fn cycle_level_mod(&mut self) {
        self.cover_params.level_mod = match self.cover_params.level_mod {
            None => Some(1),
            Some(1) => Some(2),
            Some(2) => Some(3),
            _ => None,
        };
    }

    /// One-line covering summary for the status bar
    pub fn cover_summary(&self) -> String {
        fn fmt<T: std::fmt::Display>(v: Option<T>) -> String {
            v.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
        }
        format!(
            "lvl {}..{} cells {} mod {}",
            fmt(self.cover_params.min_level),
            fmt(self.cover_params.max_level),
            fmt(self.cover_params.max_cells),
            fmt(self.cover_params.level_mod),
        )
    }

    // --- rendering pipeline ---

    pub fn add_info(&mut self, line: String) {
        self.info.push(line);
    }

    /// Clear transient view state ahead of a render
    fn reset_display(&mut self) {
        if self.clear_on_render {
            self.overlays.clear();
        }
        self.info.clear();
    }

    /// Fit the view to new bounds, extending the previous fit when
    /// clear-on-render is off
    fn process_bounds(&mut self, mut bounds: LatLngBounds) {
        if !self.clear_on_render {
            if let Some(prev) = self.previous_bounds {
                bounds.extend_bounds(&prev);
            }
        }
        self.previous_bounds = Some(bounds);
        self.viewport.fit_bounds(&bounds);
    }

    fn request_covering(&mut self, points: &[LatLng]) {
        if self.covering {
            self.api.request(ApiRequest::Cover {
                points: points.to_vec(),
                params: self.cover_params,
            });
        }
    }

    /// Submit the current input: coordinates render locally (plus an optional
    /// covering request), anything else resolves as cell ids
    pub fn submit(&mut self) {
        let text = if self.input.trim().is_empty() {
            self.placeholder.clone()
        } else {
            self.input.clone()
        };

        match parse::parse_input(&text, self.coord_order) {
            ParsedInput::CellIds(ids) => {
                if ids.is_empty() {
                    return; // silent no-op on malformed input
                }
                self.reset_display();
                self.api.request(ApiRequest::CellInfo { ids });
            }
            ParsedInput::Points(points) => {
                self.reset_display();
                if points.len() == 1 {
                    self.submit_single_point(&text, points[0]);
                } else {
                    self.submit_points(points);
                }
            }
        }
    }

    fn submit_single_point(&mut self, text: &str, ll: LatLng) {
        // A trailing @N turns covering on at that min level
        if let Some(level) = parse::level_hint(text) {
            self.cover_params.min_level = Some(level);
            self.covering = true;
        }

        self.overlays.push(Overlay::marker(ll));
        // Degenerate bounds focus the point; with clear-on-render off they
        // extend the accumulated fit like any other shape
        self.process_bounds(LatLngBounds::of(ll));
        self.request_covering(&[ll]);
    }

    fn submit_points(&mut self, points: Vec<LatLng>) {
        match self.draw_mode {
            DrawMode::Polygon => {
                // Two points are a bbox; expand to its corner ring
                let ring: Vec<LatLng> = if points.len() == 2 {
                    LatLngBounds::from_corners(points[0], points[1])
                        .corner_ring()
                        .to_vec()
                } else {
                    points.clone()
                };
                if let Some(bounds) = LatLngBounds::from_points(&ring) {
                    self.overlays.push(Overlay::polygon(ring.clone()));
                    self.process_bounds(bounds);
                    self.request_covering(&ring);
                }
            }
            DrawMode::Line => {
                if let Some(bounds) = LatLngBounds::from_points(&points) {
                    self.overlays.push(Overlay::polyline(points.clone()));
                    self.process_bounds(bounds);
                    for pair in points.windows(2) {
                        let distance = distance_between(pair[0], pair[1]);
                        self.add_info(format!("{} --> {}", pair[0], pair[1]));
                        self.add_info(format!("  distance: {distance}m"));
                    }
                    self.request_covering(&points);
                }
            }
            DrawMode::Point => {
                if let Some(bounds) = LatLngBounds::from_points(&points) {
                    self.process_bounds(bounds);
                }
            }
        }

        for (i, &p) in points.iter().enumerate() {
            self.overlays
                .push(Overlay::labeled_marker(p, (i + 1).to_string()));
            self.add_info(format!("Point {}: {}", i + 1, p));
        }
    }

    /// Kick off heatmap rendering from a remote cell,color,desc file
    pub fn request_heatmap(&mut self, url: &str) {
        self.reset_display();
        self.api.request(ApiRequest::Heatmap {
            url: url.to_string(),
        });
    }

    /// Drain fetch results; called once per frame
    pub fn drain_api_events(&mut self) {
        while let Some(event) = self.api.poll() {
            match event {
                ApiEvent::Cells { cells, styles } => self.render_cells(&cells, styles.as_ref()),
                ApiEvent::Failed { what } => self.add_info(what),
            }
        }
    }

    /// Overlay a batch of resolved cells and fit the view to them
    fn render_cells(&mut self, cells: &[CellInfo], styles: Option<&CellStyles>) {
        let mut bounds: Option<LatLngBounds> = None;

        for cell in cells.iter().filter(|c| c.is_resolved()) {
            let (overlay, description) = cell_overlay(cell, styles);
            if let Some(b) = overlay.bounds() {
                match &mut bounds {
                    Some(acc) => acc.extend_bounds(&b),
                    None => bounds = Some(b),
                }
            }
            for line in description {
                self.add_info(line);
            }
            self.add_info(String::new());
            self.overlays.push(overlay);
        }

        if let Some(bounds) = bounds {
            self.process_bounds(bounds);
        }
    }
}

/// Braille gives 2x4 pixels per character; account for the map border, the
/// info panel to the right, and the input/status rows below. Must stay in
/// step with the layout so unprojection hits the pixel under the cursor.
fn map_pixels(width: usize, height: usize) -> (usize, usize) {
    let info_width = crate::ui::info_panel_width(width as u16) as usize;
    let inner_width = width.saturating_sub(info_width + 2);
    let inner_height = height.saturating_sub(6);
    (inner_width * 2, inner_height * 4)
}

/// Convert terminal coords to braille pixel coords (1-cell border offset)
fn braille_pixel(col: u16, row: u16) -> (i32, i32) {
    let px = ((col.saturating_sub(1)) as i32) * 2;
    let py = ((row.saturating_sub(1)) as i32) * 4;
    (px, py)
}

fn bump_level(level: &mut Option<u8>, delta: i16) {
    let current = level.unwrap_or(0) as i16 + delta;
    *level = if current <= 0 {
        None
    } else {
        Some(current.min(30) as u8)
    };
}

/// Deterministic-enough placeholder pick; no RNG dependency needed
fn pick_placeholder() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    PLACEHOLDERS[nanos as usize % PLACEHOLDERS.len()].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::CellPoint;

    fn test_app() -> App {
        let cfg = Config {
            api_url: "http://localhost:9000".to_string(),
            data_dir: "data".into(),
            request_timeout: std::time::Duration::from_secs(1),
            log_file: None,
        };
        App::new(&cfg, 120, 40).expect("app")
    }

    fn cell(token: &str, lat: f64, lng: f64) -> CellInfo {
        CellInfo {
            id: "1".to_string(),
            id_signed: "1".to_string(),
            token: token.to_string(),
            face: None,
            level: 10,
            ll: CellPoint { lat, lng },
            shape: vec![
                CellPoint {
                    lat: lat - 0.1,
                    lng: lng - 0.1,
                },
                CellPoint {
                    lat: lat + 0.1,
                    lng: lng - 0.1,
                },
                CellPoint {
                    lat: lat + 0.1,
                    lng: lng + 0.1,
                },
                CellPoint {
                    lat: lat - 0.1,
                    lng: lng + 0.1,
                },
            ],
        }
    }

    #[test]
    fn test_single_point_submit_focuses_view() {
        let mut app = test_app();
        app.input = "40.74,-74.0".to_string();
        app.submit();
        assert_eq!(app.overlays.len(), 1);
        assert!((app.viewport.center_lat - 40.74).abs() < 1e-9);
        assert!((app.viewport.center_lon - (-74.0)).abs() < 1e-9);
    }

    #[test]
    fn test_level_hint_enables_covering() {
        let mut app = test_app();
        app.input = "40.74,-74.0@12".to_string();
        app.submit();
        assert!(app.covering);
        assert_eq!(app.cover_params.min_level, Some(12));
    }

    #[test]
    fn test_two_points_polygon_mode_renders_bbox() {
        let mut app = test_app();
        app.set_draw_mode(DrawMode::Polygon);
        app.input = "40.74,-74.0,40.75,-74.1".to_string();
        app.submit();

        // One polygon plus two numbered markers
        assert_eq!(app.overlays.len(), 3);
        match &app.overlays[0].kind {
            crate::map::OverlayKind::Polygon { points } => assert_eq!(points.len(), 4),
            other => panic!("expected polygon, got {other:?}"),
        }
        assert!(app.info.iter().any(|l| l.starts_with("Point 1:")));
    }

    #[test]
    fn test_line_mode_reports_segment_distances() {
        let mut app = test_app();
        app.set_draw_mode(DrawMode::Line);
        app.input = "40.0,-74.0 41.0,-74.0 42.0,-74.0".to_string();
        app.submit();

        let distances: Vec<&String> = app
            .info
            .iter()
            .filter(|l| l.contains("distance:"))
            .collect();
        assert_eq!(distances.len(), 2);
    }

    #[test]
    fn test_clear_on_render_toggle_accumulates_overlays() {
        let mut app = test_app();
        app.toggle_clear_on_render();
        app.input = "40.74,-74.0".to_string();
        app.submit();
        app.input = "41.0,-73.0".to_string();
        app.submit();
        assert_eq!(app.overlays.len(), 2);

        app.toggle_clear_on_render();
        app.input = "42.0,-72.0".to_string();
        app.submit();
        assert_eq!(app.overlays.len(), 1);
    }

    #[test]
    fn test_render_cells_skips_sentinels() {
        let mut app = test_app();
        app.render_cells(&[cell("808f7ed4", 40.74, -74.0), cell("X", 0.0, 0.0)], None);
        assert_eq!(app.overlays.len(), 1);
        assert!(app.info.iter().any(|l| l == "cell token: 808f7ed4"));
    }

    #[test]
    fn test_render_cells_fits_bounds() {
        let mut app = test_app();
        app.render_cells(&[cell("a1", 40.0, -74.0), cell("b2", 41.0, -73.0)], None);
        // Viewport centered within the union of both cells
        assert!(app.viewport.center_lat > 39.0 && app.viewport.center_lat < 42.0);
        assert!(app.viewport.center_lon > -75.0 && app.viewport.center_lon < -72.0);
    }

    #[test]
    fn test_empty_submit_uses_placeholder() {
        let mut app = test_app();
        app.placeholder = "40.74,-74.0".to_string();
        app.submit();
        assert_eq!(app.overlays.len(), 1);
    }

    #[test]
    fn test_map_pixels_track_info_panel() {
        let mut app = test_app();
        // Wide terminal: 42 info columns plus the map border
        assert_eq!(app.viewport.width, (120 - 42 - 2) * 2);
        assert_eq!(app.viewport.height, (40 - 6) * 4);
        // Narrow terminal: the panel collapses
        app.resize(60, 40);
        assert_eq!(app.viewport.width, (60 - 2) * 2);
    }

    #[test]
    fn test_single_point_extends_bounds_when_not_clearing() {
        let mut app = test_app();
        app.toggle_clear_on_render();
        app.input = "10.0,10.0 20.0,20.0".to_string();
        app.submit();
        app.input = "40.0,40.0".to_string();
        app.submit();
        // The view fits the accumulated bounds, not just the last point
        assert!(app.viewport.zoom < 40.0);
        assert!(app.viewport.center_lat > 20.0 && app.viewport.center_lat < 40.0);
    }

    #[test]
    fn test_bump_levels() {
        let mut app = test_app();
        app.bump_min_level(1);
        app.bump_min_level(1);
        assert_eq!(app.cover_params.min_level, Some(2));
        app.bump_min_level(-1);
        app.bump_min_level(-1);
        assert_eq!(app.cover_params.min_level, None);
        app.bump_max_cells(25);
        assert_eq!(app.cover_params.max_cells, Some(25));
        app.cycle_level_mod();
        assert_eq!(app.cover_params.level_mod, Some(1));
    }
}
