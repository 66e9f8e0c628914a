use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::error::EngineError;
use crate::geo::{polygon_moments, polygons_centroid, LonLat};
use crate::territory::{Region, RegionGraph, RegionId};

/// Polygon rings: exterior first, holes after
pub type Polygon = Vec<Vec<LonLat>>;

/// Raw geometry for one region before metrics and adjacency are derived
#[derive(Clone, Debug, PartialEq)]
pub struct RegionFeature {
    pub id: RegionId,
    pub polygons: Vec<Polygon>,
}

/// Outline kept next to the graph for drawing and hit testing
#[derive(Clone, Debug, PartialEq)]
pub struct RegionShape {
    pub id: RegionId,
    pub polygons: Vec<Polygon>,
    /// (min_lon, min_lat, max_lon, max_lat)
    pub bbox: (f64, f64, f64, f64),
}

/// Region graph plus outlines, index-aligned
#[derive(Clone, Debug, Default)]
pub struct RegionMap {
    pub graph: RegionGraph,
    pub shapes: Vec<RegionShape>,
}

impl RegionMap {
    /// Overall (min_lon, min_lat, max_lon, max_lat), if any shape exists
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        self.shapes.iter().map(|s| s.bbox).reduce(|a, b| {
            (a.0.min(b.0), a.1.min(b.1), a.2.max(b.2), a.3.max(b.3))
        })
    }
}

/// Edge endpoints are matched after snapping to 1e-7 degrees
const SNAP: f64 = 1e7;

type VertexKey = (i64, i64);

#[inline(always)]
fn snap(p: LonLat) -> VertexKey {
    ((p.0 * SNAP).round() as i64, (p.1 * SNAP).round() as i64)
}

#[inline(always)]
fn edge_key(a: VertexKey, b: VertexKey) -> (VertexKey, VertexKey) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn bbox_of(polygons: &[Polygon]) -> (f64, f64, f64, f64) {
    let mut bbox = (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
    for &(lon, lat) in polygons.iter().flatten().flatten() {
        bbox.0 = bbox.0.min(lon);
        bbox.1 = bbox.1.min(lat);
        bbox.2 = bbox.2.max(lon);
        bbox.3 = bbox.3.max(lat);
    }
    bbox
}

/// Derive area, centroid and shared-edge adjacency for every feature.
///
/// Two regions are neighbors when they have at least one polygon edge in
/// common; touching at a single vertex does not count.
pub fn build_region_map(features: Vec<RegionFeature>) -> Result<RegionMap, EngineError> {
    let mut edges: HashMap<(VertexKey, VertexKey), Vec<usize>> = HashMap::new();

    for (idx, feature) in features.iter().enumerate() {
        for ring in feature.polygons.iter().flatten() {
            for pair in ring.windows(2) {
                let (a, b) = (snap(pair[0]), snap(pair[1]));
                if a == b {
                    continue;
                }
                let owners = edges.entry(edge_key(a, b)).or_default();
                if owners.last() != Some(&idx) {
                    owners.push(idx);
                }
            }
        }
    }

    let mut adjacent: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); features.len()];
    for owners in edges.values() {
        for (i, &a) in owners.iter().enumerate() {
            for &b in &owners[i + 1..] {
                if a != b {
                    adjacent[a].insert(b);
                    adjacent[b].insert(a);
                }
            }
        }
    }

    let ids: Vec<RegionId> = features.iter().map(|f| f.id).collect();
    let mut regions = Vec::with_capacity(features.len());
    let mut shapes = Vec::with_capacity(features.len());

    for (feature, neighbors) in features.into_iter().zip(&adjacent) {
        let area: f64 = feature.polygons.iter().map(|rings| polygon_moments(rings).0).sum();
        let centroid = polygons_centroid(&feature.polygons).ok_or(EngineError::MalformedRegion {
            region: feature.id,
            reason: "no polygon vertices to take a centroid from",
        })?;
        let neighbor_ids = neighbors.iter().map(|&n| ids[n]).collect();

        regions.push(Region::new(feature.id, area, centroid, neighbor_ids));
        shapes.push(RegionShape {
            id: feature.id,
            bbox: bbox_of(&feature.polygons),
            polygons: feature.polygons,
        });
    }

    debug!(regions = regions.len(), shared_edges = edges.len(), "region graph built");

    let graph = RegionGraph::new(regions)?;
    Ok(RegionMap { graph, shapes })
}
