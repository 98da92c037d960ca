use ratatui::style::Color;

use crate::api::{CellInfo, CellStyles};
use crate::geo::{LatLng, LatLngBounds};

/// Default cell overlay color (#ff0000)
pub const CELL_COLOR: Color = Color::Rgb(255, 0, 0);
/// Default user shape color (#0000ff)
pub const SHAPE_COLOR: Color = Color::Rgb(0, 0, 255);

/// A single rendered shape in the transient overlay layer
#[derive(Clone, Debug)]
pub struct Overlay {
    pub kind: OverlayKind,
    pub color: Color,
}

#[derive(Clone, Debug)]
pub enum OverlayKind {
    /// A point with an optional short screen label
    Marker { at: LatLng, label: Option<String> },
    /// An open line
    Polyline { points: Vec<LatLng> },
    /// A closed shape (ring closure drawn even if vertices do not repeat)
    Polygon { points: Vec<LatLng> },
}

impl Overlay {
    pub fn marker(at: LatLng) -> Self {
        Self {
            kind: OverlayKind::Marker { at, label: None },
            color: SHAPE_COLOR,
        }
    }

    pub fn labeled_marker(at: LatLng, label: String) -> Self {
        Self {
            kind: OverlayKind::Marker {
                at,
                label: Some(label),
            },
            color: SHAPE_COLOR,
        }
    }

    pub fn polyline(points: Vec<LatLng>) -> Self {
        Self {
            kind: OverlayKind::Polyline { points },
            color: SHAPE_COLOR,
        }
    }

    pub fn polygon(points: Vec<LatLng>) -> Self {
        Self {
            kind: OverlayKind::Polygon { points },
            color: SHAPE_COLOR,
        }
    }

    /// Geographic bounds of the shape, None for empty vertex lists
    pub fn bounds(&self) -> Option<LatLngBounds> {
        match &self.kind {
            OverlayKind::Marker { at, .. } => Some(LatLngBounds::of(*at)),
            OverlayKind::Polyline { points } | OverlayKind::Polygon { points } => {
                LatLngBounds::from_points(points)
            }
        }
    }
}

/// Build the polygon overlay for a resolved cell, honoring heatmap colors.
/// Returns the overlay plus the info-panel description lines.
pub fn cell_overlay(cell: &CellInfo, styles: Option<&CellStyles>) -> (Overlay, Vec<String>) {
    let color = styles
        .and_then(|s| s.color_for(cell))
        .and_then(|hex| parse_hex_color(&hex))
        .unwrap_or(CELL_COLOR);

    let mut description = cell.description();
    if let Some(extra) = styles.and_then(|s| s.description_for(cell)) {
        description.push(extra.to_string());
    }

    let overlay = Overlay {
        kind: OverlayKind::Polygon {
            points: cell.outline(),
        },
        color,
    };
    (overlay, description)
}

/// Parse `#rrggbb` (leading `#` optional) into a terminal RGB color.
/// Heatmap files are remote input; anything non-ASCII is rejected rather
/// than sliced.
pub fn parse_hex_color(hex: &str) -> Option<Color> {
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Color::Rgb(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::CellPoint;

    fn cell() -> CellInfo {
        CellInfo {
            id: "123".to_string(),
            id_signed: "123".to_string(),
            token: "808f7ed4".to_string(),
            face: None,
            level: 12,
            ll: CellPoint {
                lat: 40.74,
                lng: -74.0,
            },
            shape: vec![
                CellPoint {
                    lat: 40.7,
                    lng: -74.1,
                },
                CellPoint {
                    lat: 40.8,
                    lng: -74.1,
                },
                CellPoint {
                    lat: 40.8,
                    lng: -73.9,
                },
                CellPoint {
                    lat: 40.7,
                    lng: -73.9,
                },
            ],
        }
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#ff0000"), Some(Color::Rgb(255, 0, 0)));
        assert_eq!(parse_hex_color("00ff7f"), Some(Color::Rgb(0, 255, 127)));
        assert_eq!(parse_hex_color("#abc"), None);
        assert_eq!(parse_hex_color("zzzzzz"), None);
    }

    #[test]
    fn test_parse_hex_color_rejects_multibyte() {
        // 6 bytes but not 6 ASCII digits; must not panic on a slice boundary
        assert_eq!(parse_hex_color("€abc"), None);
        let (_, styles) = crate::api::parse_heatmap("808f7ed4,€abc\n");
        let (overlay, _) = cell_overlay(&cell(), Some(&styles));
        assert_eq!(overlay.color, CELL_COLOR);
    }

    #[test]
    fn test_cell_overlay_default_color() {
        let (overlay, description) = cell_overlay(&cell(), None);
        assert_eq!(overlay.color, CELL_COLOR);
        assert_eq!(description.len(), 5);
        match overlay.kind {
            OverlayKind::Polygon { ref points } => assert_eq!(points.len(), 4),
            _ => panic!("expected polygon"),
        }
    }

    #[test]
    fn test_cell_overlay_heatmap_color_and_desc() {
        let (_, styles) = crate::api::parse_heatmap("808f7ed4,00ff00,park\n");
        let (overlay, description) = cell_overlay(&cell(), Some(&styles));
        assert_eq!(overlay.color, Color::Rgb(0, 255, 0));
        assert_eq!(description.last().map(String::as_str), Some("park"));
    }

    #[test]
    fn test_overlay_bounds() {
        let (overlay, _) = cell_overlay(&cell(), None);
        let bounds = overlay.bounds().unwrap();
        assert_eq!(bounds.south, 40.7);
        assert_eq!(bounds.east, -73.9);
        assert!(Overlay::polyline(vec![]).bounds().is_none());
    }
}
