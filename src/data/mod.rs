mod builder;

pub use builder::{build_region_map, Polygon, RegionFeature, RegionMap, RegionShape};

use anyhow::{Context, Result};
use geojson::{feature::Id, Feature, GeoJson, Geometry, Value};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::error::EngineError;
use crate::geo::LonLat;
use crate::territory::{RegionId, Site};

/// Load county polygons and build the region graph.
///
/// Counties whose state FIPS (`id / 1000`) is in `excluded_state_fips` are
/// dropped before adjacency is computed.
pub fn load_counties(path: &Path, excluded_state_fips: &[u32]) -> Result<RegionMap> {
    let content = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let geojson: GeoJson = content
        .parse()
        .with_context(|| format!("parsing GeoJSON in {}", path.display()))?;

    let features = region_features(&geojson, excluded_state_fips);
    let map = build_region_map(features)?;
    info!(path = %path.display(), regions = map.graph.len(), "counties loaded");
    Ok(map)
}

/// Extract polygonal features, applying the state filter.
///
/// Only ids read from the feature or its properties go through the filter.
/// Features without one are numbered after the largest real id, in file order.
pub fn region_features(geojson: &GeoJson, excluded_state_fips: &[u32]) -> Vec<RegionFeature> {
    let mut kept: Vec<(Option<RegionId>, Vec<Polygon>)> = Vec::new();
    let mut excluded = 0usize;

    let mut push = |index: usize, feature: Option<&Feature>, geometry: &Geometry| {
        let id = feature.and_then(feature_id);
        if let Some(id) = id {
            if excluded_state_fips.contains(&(id / 1000)) {
                excluded += 1;
                return;
            }
        }
        let mut polygons = Vec::new();
        collect_polygons(geometry, &mut polygons);
        if polygons.is_empty() {
            warn!(region = ?id, index, "feature has no polygon geometry; skipped");
            return;
        }
        kept.push((id, polygons));
    };

    match geojson {
        GeoJson::FeatureCollection(fc) => {
            for (index, feature) in fc.features.iter().enumerate() {
                if let Some(ref geometry) = feature.geometry {
                    push(index, Some(feature), geometry);
                }
            }
        }
        GeoJson::Feature(f) => {
            if let Some(ref geometry) = f.geometry {
                push(0, Some(f), geometry);
            }
        }
        GeoJson::Geometry(geometry) => push(0, None, geometry),
    }

    if excluded > 0 {
        info!(excluded, "features dropped by state filter");
    }

    let mut next_id = kept.iter().filter_map(|(id, _)| *id).max().unwrap_or(0);
    let mut unnamed = 0usize;
    let mut features = Vec::with_capacity(kept.len());
    for (id, polygons) in kept {
        let id = match id {
            Some(id) => id,
            None => {
                let Some(id) = next_id.checked_add(1) else {
                    warn!("region id space exhausted; feature without id skipped");
                    continue;
                };
                next_id = id;
                unnamed += 1;
                id
            }
        };
        features.push(RegionFeature { id, polygons });
    }
    if unnamed > 0 {
        warn!(unnamed, last_id = next_id, "features without ids numbered after the largest id");
    }
    features
}

/// Feature id, falling back to the usual county id properties
fn feature_id(feature: &Feature) -> Option<RegionId> {
    let from_id = match &feature.id {
        Some(Id::Number(n)) => n.as_u64().and_then(|v| RegionId::try_from(v).ok()),
        Some(Id::String(s)) => s.trim().parse().ok(),
        None => None,
    };
    from_id.or_else(|| {
        let props = feature.properties.as_ref()?;
        ["id", "GEOID", "fips"].iter().find_map(|key| {
            let value = props.get(*key)?;
            value
                .as_u64()
                .and_then(|v| RegionId::try_from(v).ok())
                .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        })
    })
}

fn to_ring(coords: &[Vec<f64>]) -> Vec<LonLat> {
    coords.iter().filter(|c| c.len() >= 2).map(|c| (c[0], c[1])).collect()
}

fn collect_polygons(geometry: &Geometry, out: &mut Vec<Polygon>) {
    match &geometry.value {
        Value::Polygon(rings) => {
            out.push(rings.iter().map(|r| to_ring(r)).collect());
        }
        Value::MultiPolygon(polygons) => {
            for rings in polygons {
                out.push(rings.iter().map(|r| to_ring(r)).collect());
            }
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                collect_polygons(g, out);
            }
        }
        _ => {}
    }
}

#[derive(Deserialize)]
struct SiteRecord {
    id: String,
    #[serde(default)]
    name: Option<String>,
    lon: f64,
    lat: f64,
    #[serde(default)]
    color: Option<String>,
}

/// Load the site roster from a JSON array of `{ id, name, lon, lat, color }`
pub fn load_sites(path: &Path) -> Result<Vec<Site>> {
    let mut bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let sites = parse_sites(&mut bytes).with_context(|| format!("parsing sites in {}", path.display()))?;
    info!(path = %path.display(), sites = sites.len(), "sites loaded");
    Ok(sites)
}

/// simd-json parses in place, so the buffer is consumed
pub fn parse_sites(bytes: &mut [u8]) -> Result<Vec<Site>> {
    let records: Vec<SiteRecord> = simd_json::serde::from_slice(bytes)?;
    Ok(records
        .into_iter()
        .map(|r| {
            let name = r.name.unwrap_or_else(|| r.id.clone());
            let site = Site::new(r.id, &name, (r.lon, r.lat));
            match r.color {
                Some(color) => site.with_color(&color),
                None => site,
            }
        })
        .collect())
}

const DEMO_COLS: u32 = 28;
const DEMO_ROWS: u32 = 12;
const DEMO_BOUNDS: (f64, f64, f64, f64) = (-124.0, 25.0, -68.0, 49.0);

/// Synthetic grid over the continental US for running without data files
pub fn generate_demo_map() -> Result<RegionMap, EngineError> {
    let (min_lon, min_lat, max_lon, max_lat) = DEMO_BOUNDS;
    let dx = (max_lon - min_lon) / DEMO_COLS as f64;
    let dy = (max_lat - min_lat) / DEMO_ROWS as f64;

    let mut features = Vec::with_capacity((DEMO_COLS * DEMO_ROWS) as usize);
    for row in 0..DEMO_ROWS {
        for col in 0..DEMO_COLS {
            let lon = min_lon + col as f64 * dx;
            let lat = min_lat + row as f64 * dy;
            features.push(RegionFeature {
                id: 1 + row * DEMO_COLS + col,
                polygons: vec![vec![vec![
                    (lon, lat),
                    (lon + dx, lat),
                    (lon + dx, lat + dy),
                    (lon, lat + dy),
                    (lon, lat),
                ]]],
            });
        }
    }
    build_region_map(features)
}

/// A dozen programs spread across the demo grid
pub fn demo_sites() -> Vec<Site> {
    [
        ("alabama", "Alabama", (-87.55, 33.21), "#9E1B32"),
        ("ohio-state", "Ohio State", (-83.02, 40.00), "#BB0000"),
        ("michigan", "Michigan", (-83.75, 42.27), "#FFCB05"),
        ("texas", "Texas", (-97.73, 30.28), "#BF5700"),
        ("usc", "USC", (-118.29, 34.01), "#990000"),
        ("oregon", "Oregon", (-123.07, 44.06), "#154733"),
        ("georgia", "Georgia", (-83.37, 33.95), "#BA0C2F"),
        ("notre-dame", "Notre Dame", (-86.23, 41.70), "#C99700"),
        ("lsu", "LSU", (-91.18, 30.41), "#461D7C"),
        ("penn-state", "Penn State", (-77.86, 40.81), "#1E407C"),
        ("utah", "Utah", (-111.85, 40.76), "#CC0000"),
        ("nebraska", "Nebraska", (-96.70, 40.82), "#E41C38"),
    ]
    .into_iter()
    .map(|(id, name, anchor, color)| Site::new(id, name, anchor).with_color(color))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::territory::validate_sites;

    const COUNTIES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "id": "01001", "properties": {},
             "geometry": {"type": "Polygon", "coordinates": [[[-87,32],[-86,32],[-86,33],[-87,33],[-87,32]]]}},
            {"type": "Feature", "properties": {"GEOID": "01003"},
             "geometry": {"type": "Polygon", "coordinates": [[[-86,32],[-85,32],[-85,33],[-86,33],[-86,32]]]}},
            {"type": "Feature", "id": 2013, "properties": {},
             "geometry": {"type": "Polygon", "coordinates": [[[-160,55],[-159,55],[-159,56],[-160,56],[-160,55]]]}},
            {"type": "Feature", "id": 1005, "properties": {},
             "geometry": {"type": "Point", "coordinates": [-85.5, 31.5]}}
        ]
    }"#;

    #[test]
    fn test_region_features_ids_and_filter() {
        let geojson: GeoJson = COUNTIES.parse().unwrap();
        let features = region_features(&geojson, &[2]);
        let ids: Vec<RegionId> = features.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![1001, 1003]);

        let unfiltered = region_features(&geojson, &[]);
        assert_eq!(unfiltered.len(), 3);
    }

    fn square_feature(id: Option<u32>, lon: f64) -> String {
        let id = id.map(|id| format!(r#""id": {id}, "#)).unwrap_or_default();
        format!(
            r#"{{"type": "Feature", {id}"properties": {{}}, "geometry": {{"type": "Polygon",
              "coordinates": [[[{lon},10],[{},10],[{},11],[{lon},11],[{lon},10]]]}}}}"#,
            lon + 1.0,
            lon + 1.0
        )
    }

    fn collection(features: &[String]) -> GeoJson {
        format!(r#"{{"type": "FeatureCollection", "features": [{}]}}"#, features.join(","))
            .parse()
            .unwrap()
    }

    #[test]
    fn test_features_without_ids_skip_state_filter() {
        let features: Vec<String> = (0..3100).map(|i| square_feature(None, i as f64 * 0.01)).collect();
        let kept = region_features(&collection(&features), &[2]);
        assert_eq!(kept.len(), 3100);
        assert_eq!(kept[0].id, 1);
        assert_eq!(kept[3099].id, 3100);
    }

    #[test]
    fn test_fallback_ids_never_collide_with_real_ids() {
        let geojson = collection(&[
            square_feature(Some(1), 0.0),
            square_feature(None, 1.0),
            square_feature(Some(5), 2.0),
            square_feature(None, 3.0),
        ]);
        let ids: Vec<RegionId> = region_features(&geojson, &[2]).iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![1, 6, 5, 7]);

        let map = build_region_map(region_features(&geojson, &[2])).unwrap();
        assert_eq!(map.graph.len(), 4);
    }

    #[test]
    fn test_counties_become_neighbors() {
        let geojson: GeoJson = COUNTIES.parse().unwrap();
        let map = build_region_map(region_features(&geojson, &[2])).unwrap();
        assert_eq!(map.graph.region(0).neighbors, vec![1003]);
        assert_eq!(map.shapes.len(), 2);
    }

    #[test]
    fn test_parse_sites() {
        let mut json = br##"[
            {"id": "a", "name": "Alpha", "lon": -90.0, "lat": 35.0, "color": "#112233"},
            {"id": "b", "lon": -80.0, "lat": 40.0}
        ]"##
        .to_vec();
        let sites = parse_sites(&mut json).unwrap();
        assert_eq!(sites.len(), 2);
        assert_eq!(sites[0].color.as_deref(), Some("#112233"));
        assert_eq!(sites[1].name, "b");
        assert!(sites.iter().all(|s| s.active));
    }

    #[test]
    fn test_parse_sites_rejects_garbage() {
        let mut json = b"{not json".to_vec();
        assert!(parse_sites(&mut json).is_err());
    }

    #[test]
    fn test_demo_map_is_connected_grid() {
        let map = generate_demo_map().unwrap();
        assert_eq!(map.graph.len(), (DEMO_COLS * DEMO_ROWS) as usize);
        // Interior cell has four neighbors
        let interior = map.graph.index_of(1 + DEMO_COLS + 1).unwrap();
        assert_eq!(map.graph.neighbors(interior).len(), 4);
        assert!(validate_sites(&demo_sites()).is_ok());
    }
}
