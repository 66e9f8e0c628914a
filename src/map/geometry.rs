use crate::braille::BrailleCanvas;
use county_conquest::geo::LonLat;

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

/// Small cross used for site anchors
pub fn draw_marker(canvas: &mut BrailleCanvas, x: i32, y: i32, size: i32) {
    for i in -size..=size {
        canvas.set_pixel_signed(x + i, y);
        canvas.set_pixel_signed(x, y + i);
    }
}

/// Even-odd scanline fill of projected rings, clipped to the canvas.
/// Samples each pixel row at its center so shared edges do not double-fill.
pub fn fill_rings(canvas: &mut BrailleCanvas, rings: &[Vec<(i32, i32)>], tag: u16) {
    let (max_x, max_y) = ((canvas.width() * 2) as i32, (canvas.height() * 4) as i32);

    let mut min_ry = i32::MAX;
    let mut max_ry = i32::MIN;
    for &(_, y) in rings.iter().flatten() {
        min_ry = min_ry.min(y);
        max_ry = max_ry.max(y);
    }
    if min_ry > max_ry {
        return;
    }

    let mut crossings: Vec<f64> = Vec::new();
    for y in min_ry.max(0)..=max_ry.min(max_y - 1) {
        let sy = y as f64 + 0.5;
        crossings.clear();
        for ring in rings {
            for pair in ring.windows(2) {
                let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
                let (fy0, fy1) = (y0 as f64, y1 as f64);
                if (fy0 <= sy) != (fy1 <= sy) {
                    let t = (sy - fy0) / (fy1 - fy0);
                    crossings.push(x0 as f64 + t * (x1 - x0) as f64);
                }
            }
        }
        crossings.sort_by(|a, b| a.total_cmp(b));
        for span in crossings.chunks_exact(2) {
            let start = (span[0] - 0.5).ceil().max(0.0) as i32;
            let end = ((span[1] - 0.5).floor() as i32).min(max_x - 1);
            for x in start..=end {
                canvas.set_tagged(x as usize, y as usize, tag);
            }
        }
    }
}

/// Even-odd point-in-polygon test over all rings (holes included)
pub fn point_in_rings(point: LonLat, rings: &[Vec<LonLat>]) -> bool {
    let (px, py) = point;
    let mut inside = false;
    for ring in rings {
        for pair in ring.windows(2) {
            let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
            if (y0 > py) != (y1 > py) && px < x0 + (py - y0) / (y1 - y0) * (x1 - x0) {
                inside = !inside;
            }
        }
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizontal_line() {
        let mut canvas = BrailleCanvas::new(5, 1);
        draw_line(&mut canvas, 0, 0, 9, 0);
        assert_eq!(canvas.to_string(), "⠉⠉⠉⠉⠉");
    }

    #[test]
    fn test_vertical_line() {
        let mut canvas = BrailleCanvas::new(1, 2);
        draw_line(&mut canvas, 0, 0, 0, 7);
        assert_eq!(canvas.to_string(), "⡇\n⡇");
    }

    #[test]
    fn test_fill_square_tags_cells() {
        let mut canvas = BrailleCanvas::new(4, 2);
        let ring = vec![(0, 0), (4, 0), (4, 8), (0, 8), (0, 0)];
        fill_rings(&mut canvas, &[ring], 5);
        assert_eq!(canvas.cell(0, 0), Some(('⣿', Some(5))));
        assert_eq!(canvas.cell(1, 1), Some(('⣿', Some(5))));
        assert_eq!(canvas.cell(2, 0), None);
    }

    #[test]
    fn test_fill_respects_holes() {
        let mut canvas = BrailleCanvas::new(6, 3);
        let outer = vec![(0, 0), (12, 0), (12, 12), (0, 12), (0, 0)];
        let hole = vec![(4, 4), (8, 4), (8, 8), (4, 8), (4, 4)];
        fill_rings(&mut canvas, &[outer, hole], 1);
        assert!(canvas.cell(0, 0).is_some());
        // Cell (2,1) covers pixels x 4..6, y 4..8: entirely inside the hole
        assert_eq!(canvas.cell(2, 1), None);
    }

    #[test]
    fn test_fill_clips_offscreen() {
        let mut canvas = BrailleCanvas::new(2, 1);
        let ring = vec![(-50, -50), (50, -50), (50, 50), (-50, 50), (-50, -50)];
        fill_rings(&mut canvas, &[ring], 2);
        assert_eq!(canvas.to_string(), "⣿⣿");
    }

    #[test]
    fn test_point_in_rings() {
        let outer = vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0), (0.0, 0.0)];
        let hole = vec![(1.0, 1.0), (3.0, 1.0), (3.0, 3.0), (1.0, 3.0), (1.0, 1.0)];
        let rings = vec![outer, hole];
        assert!(point_in_rings((0.5, 0.5), &rings));
        assert!(!point_in_rings((2.0, 2.0), &rings));
        assert!(!point_in_rings((5.0, 2.0), &rings));
    }
}
