use county_conquest::data::RegionShape;
use county_conquest::geo::LonLat;

use crate::braille::BrailleCanvas;
use crate::map::geometry::{draw_line, draw_marker, fill_rings, point_in_rings};
use crate::map::projection::Viewport;
use crate::map::spatial::FeatureGrid;

/// Region outlines start to read as detail rather than noise around here
const OUTLINE_MIN_ZOOM: f64 = 12.0;

/// Spatial index cell size in degrees
const GRID_CELL: f64 = 1.0;

/// Canvases for one frame, drawn back to front
pub struct TerritoryLayers {
    /// Interior dots, each cell tagged with its owner's roster slot
    pub fill: BrailleCanvas,
    pub outlines: BrailleCanvas,
    /// Region under the cursor
    pub hover: BrailleCanvas,
    /// Site anchors
    pub markers: BrailleCanvas,
}

/// Display settings for map layers
#[derive(Clone)]
pub struct DisplaySettings {
    pub show_outlines: bool,
    pub show_labels: bool,
    pub show_anchors: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_outlines: true,
            show_labels: true,
            show_anchors: true,
        }
    }
}

/// Choropleth renderer over region outlines, index-aligned with the region graph
pub struct TerritoryRenderer {
    shapes: Vec<RegionShape>,
    grid: FeatureGrid,
    pub settings: DisplaySettings,
}

impl TerritoryRenderer {
    pub fn new(shapes: Vec<RegionShape>) -> Self {
        let grid = FeatureGrid::build(shapes.iter().map(|s| s.bbox), GRID_CELL);
        Self {
            shapes,
            grid,
            settings: DisplaySettings::default(),
        }
    }

    /// Region indices whose bbox overlaps the viewport
    fn visible(&self, viewport: &Viewport) -> Vec<usize> {
        let (min_lon, min_lat, max_lon, max_lat) = viewport.visible_bounds();
        let mut hits = Vec::new();
        self.grid.query_into(min_lon, min_lat, max_lon, max_lat, &mut hits);
        hits.sort_unstable();
        hits.dedup();
        hits.retain(|&idx| {
            let b = self.shapes[idx].bbox;
            b.2 >= min_lon && b.0 <= max_lon && b.3 >= min_lat && b.1 <= max_lat
        });
        hits
    }

    /// Render territories for a `width` x `height` character canvas.
    ///
    /// `owner_slots[region_idx]` names the roster slot holding each region;
    /// unowned regions are left blank.
    pub fn render(
        &self,
        width: usize,
        height: usize,
        viewport: &Viewport,
        owner_slots: &[Option<u16>],
        hover: Option<usize>,
        anchors: &[LonLat],
    ) -> TerritoryLayers {
        let mut layers = TerritoryLayers {
            fill: BrailleCanvas::new(width, height),
            outlines: BrailleCanvas::new(width, height),
            hover: BrailleCanvas::new(width, height),
            markers: BrailleCanvas::new(width, height),
        };
        let outlines = self.settings.show_outlines && viewport.zoom >= OUTLINE_MIN_ZOOM;

        for idx in self.visible(viewport) {
            let slot = owner_slots.get(idx).copied().flatten();
            let is_hover = hover == Some(idx);

            for polygon in &self.shapes[idx].polygons {
                let rings: Vec<Vec<(i32, i32)>> = polygon
                    .iter()
                    .map(|ring| ring.iter().map(|&(lon, lat)| viewport.project(lon, lat)).collect())
                    .collect();

                if let Some(slot) = slot {
                    fill_projected(&mut layers.fill, &rings, slot);
                }
                if outlines {
                    draw_rings(&mut layers.outlines, &rings, viewport);
                }
                if is_hover {
                    draw_rings(&mut layers.hover, &rings, viewport);
                }
            }
        }

        if self.settings.show_anchors {
            for &(lon, lat) in anchors {
                let (px, py) = viewport.project(lon, lat);
                if viewport.is_visible(px, py) {
                    draw_marker(&mut layers.markers, px, py, 1);
                }
            }
        }

        layers
    }

    /// Index of the region containing a geographic point
    pub fn region_at(&self, lon: f64, lat: f64) -> Option<usize> {
        self.grid.query_point(lon, lat).iter().copied().find(|&idx| {
            let shape = &self.shapes[idx];
            let (min_lon, min_lat, max_lon, max_lat) = shape.bbox;
            lon >= min_lon
                && lon <= max_lon
                && lat >= min_lat
                && lat <= max_lat
                && shape.polygons.iter().any(|rings| point_in_rings((lon, lat), rings))
        })
    }

    pub fn toggle_outlines(&mut self) {
        self.settings.show_outlines = !self.settings.show_outlines;
    }

    pub fn toggle_labels(&mut self) {
        self.settings.show_labels = !self.settings.show_labels;
    }

    pub fn toggle_anchors(&mut self) {
        self.settings.show_anchors = !self.settings.show_anchors;
    }
}

/// Scanline fill; regions thinner than a pixel still get their first vertex
fn fill_projected(canvas: &mut BrailleCanvas, rings: &[Vec<(i32, i32)>], slot: u16) {
    let Some(exterior) = rings.first() else {
        return;
    };
    let Some(&(x0, y0)) = exterior.first() else {
        return;
    };
    let degenerate = exterior.iter().all(|&(_, y)| y == y0) || exterior.iter().all(|&(x, _)| x == x0);
    if degenerate {
        canvas.set_tagged_signed(x0, y0, slot);
    } else {
        fill_rings(canvas, rings, slot);
    }
}

/// Draw projected rings with viewport culling
fn draw_rings(canvas: &mut BrailleCanvas, rings: &[Vec<(i32, i32)>], viewport: &Viewport) {
    for ring in rings {
        for pair in ring.windows(2) {
            let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
            let dist = ((x1 - x0).abs() + (y1 - y0).abs()) as usize;
            // Segments spanning the whole canvas wrap around the antimeridian
            if dist < viewport.width && viewport.line_might_be_visible((x0, y0), (x1, y1)) {
                draw_line(canvas, x0, y0, x1, y1);
            }
        }
    }
}
