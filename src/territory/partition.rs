use glam::DVec3;
use rayon::prelude::*;
use tracing::{debug, warn};

use super::assignment::TerritoryAssignment;
use super::region::RegionGraph;
use super::site::Site;
use crate::geo::{lonlat_to_vec3, LonLat};

/// Dense ownership table shared by the partitioner and the rebalancer.
/// `owners[region_idx]` is an index into the site slice the table was built for.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Ownership {
    pub(crate) owners: Vec<usize>,
    pub(crate) areas: Vec<f64>,
}

impl Ownership {
    /// Site index owning a region index
    #[inline(always)]
    pub fn owner(&self, region_idx: usize) -> usize {
        self.owners[region_idx]
    }

    pub fn owners(&self) -> &[usize] {
        &self.owners
    }

    /// Total area per site index
    pub fn areas(&self) -> &[f64] {
        &self.areas
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Public region-id keyed view of this table
    pub fn to_assignment(&self, graph: &RegionGraph, sites: &[Site]) -> TerritoryAssignment {
        if self.owners.len() != graph.len() {
            warn!(
                owners = self.owners.len(),
                regions = graph.len(),
                "ownership table built for a different graph; returning empty assignment"
            );
            return TerritoryAssignment::default();
        }
        TerritoryAssignment::from_owners(graph, sites, &self.owners)
    }
}

#[inline(always)]
fn central_angle(a: DVec3, b: DVec3) -> f64 {
    a.cross(b).length().atan2(a.dot(b))
}

/// Unit vectors for site anchors, in site order
pub(crate) fn anchor_vectors(sites: &[Site]) -> Vec<DVec3> {
    sites.iter().map(|s| lonlat_to_vec3(s.anchor.0, s.anchor.1)).collect()
}

/// Index of the closest anchor; the first one wins on exact ties
#[inline(always)]
pub(crate) fn nearest_anchor(point: DVec3, anchors: &[DVec3]) -> Option<usize> {
    let mut best = None;
    let mut min_distance = f64::INFINITY;
    for (idx, &anchor) in anchors.iter().enumerate() {
        let distance = central_angle(anchor, point);
        if distance < min_distance {
            min_distance = distance;
            best = Some(idx);
        }
    }
    best
}

/// Index of the site whose anchor is nearest to `point` by great-circle distance
pub fn nearest_site(point: LonLat, sites: &[Site]) -> Option<usize> {
    nearest_anchor(lonlat_to_vec3(point.0, point.1), &anchor_vectors(sites))
}

/// Assign every region to its nearest site.
///
/// Empty regions or sites yield an empty table. The scan runs in parallel but
/// owners are collected in region order and areas are summed sequentially, so
/// the result does not depend on thread scheduling.
pub fn partition(graph: &RegionGraph, sites: &[Site]) -> Ownership {
    if graph.is_empty() || sites.is_empty() {
        return Ownership {
            owners: Vec::new(),
            areas: vec![0.0; sites.len()],
        };
    }

    let anchors = anchor_vectors(sites);

    let owners: Vec<usize> = graph
        .regions()
        .par_iter()
        .map(|region| {
            let point = lonlat_to_vec3(region.centroid.0, region.centroid.1);
            // anchors is non-empty and distances are finite for validated input
            nearest_anchor(point, &anchors).unwrap_or(0)
        })
        .collect();

    let mut areas = vec![0.0; sites.len()];
    for (region, &owner) in graph.regions().iter().zip(&owners) {
        areas[owner] += region.area;
    }

    debug!(regions = graph.len(), sites = sites.len(), "proximity partition complete");

    Ownership { owners, areas }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{grid_graph, path_graph, path_sites};
    use super::super::site::SiteId;
    use super::*;

    #[test]
    fn test_path_partition() {
        let graph = path_graph();
        let sites = path_sites();
        let own = partition(&graph, &sites);
        assert_eq!(own.owners(), &[0, 0, 1]);
        assert_eq!(own.areas(), &[2.0, 1.0]);
    }

    #[test]
    fn test_tie_goes_to_first_site() {
        let sites = vec![Site::new("left", "L", (-1.0, 0.0)), Site::new("right", "R", (1.0, 0.0))];
        assert_eq!(nearest_site((0.0, 0.0), &sites), Some(0));

        let swapped = vec![sites[1].clone(), sites[0].clone()];
        assert_eq!(nearest_site((0.0, 0.0), &swapped), Some(0));
    }

    #[test]
    fn test_uses_great_circle_not_planar_distance() {
        // Across the antimeridian 179 -> -179 is 2 degrees, not 358
        let sites = vec![Site::new("west", "W", (-179.0, 0.0)), Site::new("mid", "M", (170.0, 0.0))];
        assert_eq!(nearest_site((179.0, 0.0), &sites), Some(0));
    }

    #[test]
    fn test_empty_inputs() {
        let graph = path_graph();
        let none = partition(&graph, &[]);
        assert!(none.is_empty());
        assert!(none.to_assignment(&graph, &[]).is_empty());

        let empty = RegionGraph::new(Vec::new()).unwrap();
        let own = partition(&empty, &path_sites());
        assert!(own.is_empty());
        assert_eq!(own.areas(), &[0.0, 0.0]);
        assert_eq!(own.to_assignment(&empty, &path_sites()).total_area(), 0.0);
    }

    #[test]
    fn test_table_for_other_graph_gives_empty_assignment() {
        let sites = path_sites();
        let own = partition(&path_graph(), &sites);
        let other = grid_graph(2, 2);
        assert!(own.to_assignment(&other, &sites).is_empty());
    }

    #[test]
    fn test_every_region_assigned_once() {
        let graph = grid_graph(6, 4);
        let sites = vec![Site::new("a", "A", (0.0, 0.0)), Site::new("b", "B", (5.0, 3.0))];
        let assignment = partition(&graph, &sites).to_assignment(&graph, &sites);
        assert_eq!(assignment.len(), graph.len());
        let total: f64 = assignment.site_areas().values().sum();
        assert!((total - graph.total_area()).abs() < 1e-12);
        assert_eq!(assignment.site_of(1), Some(&SiteId::from("a")));
        assert_eq!(assignment.site_of(24), Some(&SiteId::from("b")));
    }
}
