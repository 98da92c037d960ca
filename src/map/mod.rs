mod geometry;
mod overlay;
mod projection;
mod renderer;

pub use overlay::{cell_overlay, Overlay, OverlayKind, CELL_COLOR, SHAPE_COLOR};
pub use projection::Viewport;
pub use renderer::{Lod, MapLayers, MapRenderer};
