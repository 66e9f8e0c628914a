use std::collections::HashMap;

use rayon::prelude::*;
use tracing::debug;

use super::assignment::TerritoryAssignment;
use super::ledger::ConquestLedger;
use super::partition::{anchor_vectors, nearest_anchor};
use super::region::RegionGraph;
use super::site::{Site, SiteId};
use crate::geo::lonlat_to_vec3;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Source {
    Ledger,
    /// Ledger names a site that is no longer active
    Stale,
    Proximity,
}

/// Final region -> site map for the current active sites.
///
/// A ledger entry wins when its site is active; otherwise the region falls
/// back to its nearest active site. No rebalancing happens here, and areas are
/// summed from scratch on every call.
pub fn resolve(
    graph: &RegionGraph,
    active_sites: &[Site],
    ledger: Option<&ConquestLedger>,
) -> TerritoryAssignment {
    if graph.is_empty() || active_sites.is_empty() {
        return TerritoryAssignment::default();
    }

    let active: HashMap<&SiteId, usize> = active_sites.iter().enumerate().map(|(i, s)| (&s.id, i)).collect();
    let anchors = anchor_vectors(active_sites);

    let resolved: Vec<(usize, Source)> = graph
        .regions()
        .par_iter()
        .map(|region| {
            let recorded = ledger.and_then(|l| l.owner(region.id));
            if let Some(&idx) = recorded.and_then(|site| active.get(site)) {
                return (idx, Source::Ledger);
            }
            let point = lonlat_to_vec3(region.centroid.0, region.centroid.1);
            let nearest = nearest_anchor(point, &anchors).unwrap_or(0);
            let source = if recorded.is_some() { Source::Stale } else { Source::Proximity };
            (nearest, source)
        })
        .collect();

    let stale = resolved.iter().filter(|(_, s)| *s == Source::Stale).count();
    let proximity = resolved.iter().filter(|(_, s)| *s == Source::Proximity).count();
    debug!(
        regions = graph.len(),
        active_sites = active_sites.len(),
        stale,
        proximity,
        "resolved territory assignment"
    );

    let owners: Vec<usize> = resolved.into_iter().map(|(owner, _)| owner).collect();
    TerritoryAssignment::from_owners(graph, active_sites, &owners)
}
