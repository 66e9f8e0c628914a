use std::collections::BTreeMap;

use super::region::{RegionGraph, RegionId};
use super::site::{Site, SiteId};

/// Final region -> site map with per-site aggregates, as consumed by rendering
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TerritoryAssignment {
    region_to_site: BTreeMap<RegionId, SiteId>,
    site_area: BTreeMap<SiteId, f64>,
    site_regions: BTreeMap<SiteId, usize>,
    total_area: f64,
}

impl TerritoryAssignment {
    /// Build from a dense owner table (`owners[region_idx]` indexes `sites`).
    /// Aggregates are summed from scratch in region order.
    pub(crate) fn from_owners(graph: &RegionGraph, sites: &[Site], owners: &[usize]) -> Self {
        if graph.is_empty() || sites.is_empty() {
            return Self::default();
        }

        let mut area = vec![0.0; sites.len()];
        let mut count = vec![0usize; sites.len()];
        let mut region_to_site = BTreeMap::new();

        for (region, &owner) in graph.regions().iter().zip(owners) {
            area[owner] += region.area;
            count[owner] += 1;
            region_to_site.insert(region.id, sites[owner].id.clone());
        }

        let site_area = sites.iter().zip(&area).map(|(s, &a)| (s.id.clone(), a)).collect();
        let site_regions = sites.iter().zip(&count).map(|(s, &c)| (s.id.clone(), c)).collect();

        Self {
            region_to_site,
            site_area,
            site_regions,
            total_area: graph.total_area(),
        }
    }

    /// Site holding a region
    pub fn site_of(&self, region: RegionId) -> Option<&SiteId> {
        self.region_to_site.get(&region)
    }

    pub fn assignments(&self) -> &BTreeMap<RegionId, SiteId> {
        &self.region_to_site
    }

    /// Total area per site; every input site is present, even with zero area
    pub fn site_areas(&self) -> &BTreeMap<SiteId, f64> {
        &self.site_area
    }

    pub fn area_of(&self, site: &SiteId) -> f64 {
        self.site_area.get(site).copied().unwrap_or(0.0)
    }

    pub fn region_count(&self, site: &SiteId) -> usize {
        self.site_regions.get(site).copied().unwrap_or(0)
    }

    /// Sum of all region areas, for percentage display
    pub fn total_area(&self) -> f64 {
        self.total_area
    }

    /// Fraction of the total area held by a site
    pub fn share_of(&self, site: &SiteId) -> f64 {
        if self.total_area > 0.0 {
            self.area_of(site) / self.total_area
        } else {
            0.0
        }
    }

    /// Number of regions assigned
    pub fn len(&self) -> usize {
        self.region_to_site.len()
    }

    pub fn is_empty(&self) -> bool {
        self.region_to_site.is_empty()
    }
}
