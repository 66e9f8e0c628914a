use std::collections::HashMap;

use super::assignment::TerritoryAssignment;
use super::partition::{anchor_vectors, nearest_anchor};
use super::region::RegionGraph;
use super::site::{Site, SiteId};
use crate::geo::{lonlat_to_vec3, weighted_centroid, LonLat};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CenterKind {
    /// Regions the site holds by proximity alone
    Home,
    /// A detached block of conquered regions
    Conquered,
    /// Home and conquered regions touch, labelled as one territory
    Combined,
}

/// Label anchor for a site's territory
#[derive(Clone, Debug, PartialEq)]
pub struct TerritoryCenter {
    pub site: SiteId,
    pub kind: CenterKind,
    pub position: LonLat,
    pub regions: usize,
}

/// Where to label each site's territory.
///
/// `roster` is the full site list, eliminated sites included: a held region
/// counts as home when the holder is its nearest site among the whole roster.
/// Conquered regions bordering home territory share one combined center;
/// detached conquests get their own.
pub fn territory_centers(
    graph: &RegionGraph,
    roster: &[Site],
    assignment: &TerritoryAssignment,
) -> Vec<TerritoryCenter> {
    if graph.is_empty() || roster.is_empty() || assignment.is_empty() {
        return Vec::new();
    }

    let slot: HashMap<&SiteId, usize> = roster.iter().enumerate().map(|(i, s)| (&s.id, i)).collect();
    let anchors = anchor_vectors(roster);

    let holder: Vec<Option<usize>> = graph
        .regions()
        .iter()
        .map(|r| assignment.site_of(r.id).and_then(|s| slot.get(s).copied()))
        .collect();
    let home_of: Vec<usize> = graph
        .regions()
        .iter()
        .map(|r| nearest_anchor(lonlat_to_vec3(r.centroid.0, r.centroid.1), &anchors).unwrap_or(0))
        .collect();

    let mut held: Vec<Vec<usize>> = vec![Vec::new(); roster.len()];
    for (idx, owner) in holder.iter().enumerate() {
        if let Some(owner) = *owner {
            held[owner].push(idx);
        }
    }

    let mut centers = Vec::new();
    for (site_idx, regions) in held.iter().enumerate() {
        if regions.is_empty() {
            continue;
        }
        let site = &roster[site_idx].id;
        let is_home = |i: usize| home_of[i] == site_idx;

        let home: Vec<usize> = regions.iter().copied().filter(|&i| is_home(i)).collect();
        let conquered: Vec<usize> = regions.iter().copied().filter(|&i| !is_home(i)).collect();

        let mut push = |kind: CenterKind, indices: &[usize]| {
            if let Some(position) = center_of(graph, indices) {
                centers.push(TerritoryCenter {
                    site: site.clone(),
                    kind,
                    position,
                    regions: indices.len(),
                });
            }
        };

        if conquered.is_empty() {
            push(CenterKind::Home, &home);
            continue;
        }

        let touches_home = conquered.iter().any(|&i| {
            graph
                .neighbors(i)
                .iter()
                .any(|&n| holder[n] == Some(site_idx) && is_home(n))
        });

        if touches_home {
            push(CenterKind::Combined, regions.as_slice());
        } else {
            if !home.is_empty() {
                push(CenterKind::Home, &home);
            }
            push(CenterKind::Conquered, &conquered);
        }
    }

    centers
}

fn center_of(graph: &RegionGraph, indices: &[usize]) -> Option<LonLat> {
    weighted_centroid(indices.iter().map(|&i| {
        let r = graph.region(i);
        (r.centroid, r.area)
    }))
}
