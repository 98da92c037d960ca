use crate::braille::BrailleCanvas;
use crate::map::projection::Viewport;

/// Draw a line using Bresenham's algorithm
pub fn draw_line(canvas: &mut BrailleCanvas, x0: i32, y0: i32, x1: i32, y1: i32) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut x = x0;
    let mut y = y0;

    loop {
        canvas.set_pixel_signed(x, y);

        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;

        if e2 >= dy {
            if x == x1 {
                break;
            }
            err += dy;
            x += sx;
        }

        if e2 <= dx {
            if y == y1 {
                break;
            }
            err += dx;
            y += sy;
        }
    }
}

/// Draw a thicker line (polylines get more weight than cell outlines)
pub fn draw_thick_line(canvas: &mut BrailleCanvas, x0: i32, y0: i32, x1: i32, y1: i32) {
    draw_line(canvas, x0, y0, x1, y1);
    draw_line(canvas, x0 + 1, y0, x1 + 1, y1);
    draw_line(canvas, x0, y0 + 1, x1, y1 + 1);
}

/// Draw a point marker (small cross)
pub fn draw_marker(canvas: &mut BrailleCanvas, x: i32, y: i32, size: i32) {
    for i in -size..=size {
        canvas.set_pixel_signed(x + i, y);
        canvas.set_pixel_signed(x, y + i);
    }
}

/// Draw a filled circle (dot-icon vertex markers)
pub fn draw_circle(canvas: &mut BrailleCanvas, cx: i32, cy: i32, radius: i32) {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                canvas.set_pixel_signed(cx + dx, cy + dy);
            }
        }
    }
}

/// Draw an open path of projected points with viewport culling
pub fn draw_path(canvas: &mut BrailleCanvas, points: &[(i32, i32)], viewport: &Viewport, thick: bool) {
    for pair in points.windows(2) {
        draw_segment(canvas, pair[0], pair[1], viewport, thick);
    }
}

/// Draw a closed ring of projected points with viewport culling
pub fn draw_ring(canvas: &mut BrailleCanvas, points: &[(i32, i32)], viewport: &Viewport) {
    if points.len() < 2 {
        return;
    }
    draw_path(canvas, points, viewport, false);
    let last = points[points.len() - 1];
    let first = points[0];
    if last != first {
        draw_segment(canvas, last, first, viewport, false);
    }
}

fn draw_segment(
    canvas: &mut BrailleCanvas,
    a: (i32, i32),
    b: (i32, i32),
    viewport: &Viewport,
    thick: bool,
) {
    // Skip segments that wrap around or cannot intersect the view
    let dist = ((b.0 - a.0).abs() + (b.1 - a.1).abs()) as usize;
    if dist >= viewport.width || !viewport.line_might_be_visible(a, b) {
        return;
    }
    if thick {
        draw_thick_line(canvas, a.0, a.1, b.0, b.1);
    } else {
        draw_line(canvas, a.0, a.1, b.0, b.1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizontal_line() {
        let mut canvas = BrailleCanvas::new(5, 1);
        draw_line(&mut canvas, 0, 0, 9, 0);
        assert!(!canvas.is_empty());
    }

    #[test]
    fn test_vertical_line() {
        let mut canvas = BrailleCanvas::new(1, 2);
        draw_line(&mut canvas, 0, 0, 0, 7);
        assert!(!canvas.is_empty());
    }

    #[test]
    fn test_ring_closes() {
        let vp = Viewport::new(0.0, 0.0, 1.0, 20, 20);
        let mut open = BrailleCanvas::new(10, 5);
        let mut closed = BrailleCanvas::new(10, 5);
        let square = [(2, 2), (8, 2), (8, 8), (2, 8)];
        draw_path(&mut open, &square, &vp, false);
        draw_ring(&mut closed, &square, &vp);
        // The closing edge (2,8)-(2,2) only exists in the ring
        assert_ne!(open.to_string(), closed.to_string());
    }

    #[test]
    fn test_offscreen_segment_culled() {
        let vp = Viewport::new(0.0, 0.0, 1.0, 10, 10);
        let mut canvas = BrailleCanvas::new(5, 3);
        draw_path(&mut canvas, &[(-50, -50), (-40, -40)], &vp, false);
        assert!(canvas.is_empty());
    }
}
