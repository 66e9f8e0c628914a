use std::collections::HashMap;

use tracing::warn;

use crate::error::EngineError;
use crate::geo::{is_valid_lonlat, LonLat};

/// Region identifier (a county FIPS code for US data)
pub type RegionId = u32;

/// An atomic geographic unit
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    pub id: RegionId,
    /// Solid angle in steradians
    pub area: f64,
    pub centroid: LonLat,
    /// Ids of regions sharing a border
    pub neighbors: Vec<RegionId>,
}

impl Region {
    pub fn new(id: RegionId, area: f64, centroid: LonLat, neighbors: Vec<RegionId>) -> Self {
        Self {
            id,
            area,
            centroid,
            neighbors,
        }
    }
}

/// Validated, immutable region set with dense index-based adjacency.
///
/// Every engine operation takes a `RegionGraph`, so malformed regions are
/// rejected once here instead of being re-checked by each pass.
#[derive(Clone, Debug, Default)]
pub struct RegionGraph {
    regions: Vec<Region>,
    /// Neighbor indices per region, in the order the ids were listed
    adjacency: Vec<Vec<usize>>,
    index: HashMap<RegionId, usize>,
    total_area: f64,
}

impl RegionGraph {
    /// Build a graph, keeping the input order as the canonical region order.
    ///
    /// # Errors
    ///
    /// [`EngineError::MalformedRegion`] for an unusable centroid or area,
    /// [`EngineError::DuplicateRegion`] when an id repeats. Neighbor ids that
    /// name no region in the set (or the region itself) are dropped.
    pub fn new(regions: Vec<Region>) -> Result<Self, EngineError> {
        let mut index = HashMap::with_capacity(regions.len());
        for (idx, region) in regions.iter().enumerate() {
            let (lon, lat) = region.centroid;
            if !is_valid_lonlat(lon, lat) {
                return Err(EngineError::MalformedRegion {
                    region: region.id,
                    reason: "centroid is not a finite lon/lat pair",
                });
            }
            if !region.area.is_finite() || region.area < 0.0 {
                return Err(EngineError::MalformedRegion {
                    region: region.id,
                    reason: "area must be finite and non-negative",
                });
            }
            if index.insert(region.id, idx).is_some() {
                return Err(EngineError::DuplicateRegion(region.id));
            }
        }

        let mut dropped = 0usize;
        let adjacency = regions
            .iter()
            .enumerate()
            .map(|(idx, region)| {
                let mut out: Vec<usize> = Vec::with_capacity(region.neighbors.len());
                for id in &region.neighbors {
                    match index.get(id) {
                        Some(&n) if n != idx => {
                            if !out.contains(&n) {
                                out.push(n);
                            }
                        }
                        _ => dropped += 1,
                    }
                }
                out
            })
            .collect();

        if dropped > 0 {
            warn!(dropped, "ignored neighbor ids that do not name another region in the set");
        }

        let total_area = regions.iter().map(|r| r.area).sum();

        Ok(Self {
            regions,
            adjacency,
            index,
            total_area,
        })
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    #[inline(always)]
    pub fn region(&self, idx: usize) -> &Region {
        &self.regions[idx]
    }

    pub fn index_of(&self, id: RegionId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    #[inline(always)]
    pub fn neighbors(&self, idx: usize) -> &[usize] {
        &self.adjacency[idx]
    }

    /// Sum of all region areas
    pub fn total_area(&self) -> f64 {
        self.total_area
    }
}
