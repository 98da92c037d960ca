use std::sync::OnceLock;

use regex::Regex;

use crate::geo::LatLng;

/// Pairing order for freeform coordinate input
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoordOrder {
    /// lat,lng (default)
    LatLng,
    /// lng,lat ("reverse order" toggle)
    LngLat,
}

impl CoordOrder {
    pub fn toggled(self) -> Self {
        match self {
            CoordOrder::LatLng => CoordOrder::LngLat,
            CoordOrder::LngLat => CoordOrder::LatLng,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CoordOrder::LatLng => "lat,lng",
            CoordOrder::LngLat => "lng,lat",
        }
    }
}

/// What a piece of freeform input parsed into
#[derive(Clone, Debug, PartialEq)]
pub enum ParsedInput {
    Points(Vec<LatLng>),
    CellIds(Vec<String>),
}

fn coord_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Signed decimals only; bare integers are not coordinates
    RE.get_or_init(|| Regex::new(r"[+-]?\d+\.\d+").unwrap())
}

fn level_hint_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@(\d+)$").unwrap())
}

fn id_junk_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Everything outside word chars / whitespace / . - , plus underscores
    RE.get_or_init(|| Regex::new(r"[^\w\s.,-]|_").unwrap())
}

/// Extract coordinate pairs from free text, honoring the order flag.
/// A trailing unpaired token is dropped. Malformed input yields an empty Vec.
pub fn extract_points(text: &str, order: CoordOrder) -> Vec<LatLng> {
    let tokens: Vec<f64> = coord_regex()
        .find_iter(text)
        .filter_map(|m| m.as_str().parse().ok())
        .collect();

    tokens
        .chunks_exact(2)
        .map(|pair| match order {
            CoordOrder::LatLng => LatLng::new(pair[0], pair[1]),
            CoordOrder::LngLat => LatLng::new(pair[1], pair[0]),
        })
        .collect()
}

/// A trailing `@N` marks a requested covering min level
pub fn level_hint(text: &str) -> Option<u8> {
    level_hint_regex()
        .captures(text.trim_end())
        .and_then(|caps| caps[1].parse().ok())
}

/// Treat text as a comma/space/newline-separated list of opaque cell
/// identifiers: strip junk characters, then split with empties dropped.
pub fn extract_cell_ids(text: &str) -> Vec<String> {
    let cleaned = text.trim_start().replace(' ', ",").replace('\n', ",");
    let cleaned = id_junk_regex().replace_all(&cleaned, "");

    cleaned
        .split(',')
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse freeform input: coordinate pairs first, cell-ID list as fallback
pub fn parse_input(text: &str, order: CoordOrder) -> ParsedInput {
    let points = extract_points(text, order);
    if points.is_empty() {
        ParsedInput::CellIds(extract_cell_ids(text))
    } else {
        ParsedInput::Points(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_points_basic() {
        let pts = extract_points("40.74,-74.0", CoordOrder::LatLng);
        assert_eq!(pts, vec![LatLng::new(40.74, -74.0)]);
    }

    #[test]
    fn test_extract_points_reverse_order() {
        let pts = extract_points("-74.0 40.74", CoordOrder::LngLat);
        assert_eq!(pts, vec![LatLng::new(40.74, -74.0)]);
    }

    #[test]
    fn test_extract_points_from_noisy_text() {
        let text = "bbox: { ne: { lat: 40.74, lng: -74.0 }, sw: { lat: 40.75, lng: -74.1 } }";
        let pts = extract_points(text, CoordOrder::LatLng);
        assert_eq!(
            pts,
            vec![LatLng::new(40.74, -74.0), LatLng::new(40.75, -74.1)]
        );
    }

    #[test]
    fn test_extract_points_drops_trailing_token() {
        let pts = extract_points("1.0 2.0 3.0", CoordOrder::LatLng);
        assert_eq!(pts, vec![LatLng::new(1.0, 2.0)]);
    }

    #[test]
    fn test_extract_points_ignores_integers() {
        // Bare integers are cell ids, not coordinates
        assert!(extract_points("9263007499635197952", CoordOrder::LatLng).is_empty());
    }

    #[test]
    fn test_level_hint() {
        assert_eq!(level_hint("40.74,-74.0@12"), Some(12));
        assert_eq!(level_hint("40.74,-74.0"), None);
        assert_eq!(level_hint("@8 40.74"), None);
    }

    #[test]
    fn test_extract_cell_ids() {
        let ids = extract_cell_ids("  89c2584f 89c2585\n89c259,,89c25c");
        assert_eq!(ids, vec!["89c2584f", "89c2585", "89c259", "89c25c"]);
    }

    #[test]
    fn test_extract_cell_ids_strips_junk() {
        let ids = extract_cell_ids("89c2584f! 89c_25(85)");
        assert_eq!(ids, vec!["89c2584f", "89c2585"]);
    }

    #[test]
    fn test_parse_input_fallback() {
        assert_eq!(
            parse_input("89c2584f", CoordOrder::LatLng),
            ParsedInput::CellIds(vec!["89c2584f".to_string()])
        );
        assert_eq!(
            parse_input("40.74,-74.0", CoordOrder::LatLng),
            ParsedInput::Points(vec![LatLng::new(40.74, -74.0)])
        );
    }

    #[test]
    fn test_parse_input_empty() {
        assert_eq!(
            parse_input("", CoordOrder::LatLng),
            ParsedInput::CellIds(vec![])
        );
    }
}
