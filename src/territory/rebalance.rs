use tracing::{debug, info};

use super::contiguity::Reachability;
use super::partition::Ownership;
use super::region::RegionGraph;
use super::site::{Site, SiteId};
use crate::config::EngineConfig;

/// Per-site diagnostics after rebalancing
#[derive(Clone, Debug, PartialEq)]
pub struct SiteBalance {
    pub site: SiteId,
    pub regions: usize,
    pub area: f64,
    /// Area as a fraction of the per-site target
    pub target_ratio: f64,
    pub contiguous: bool,
}

/// Diagnostics only; the ownership table is valid whether or not it converged
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RebalanceReport {
    pub iterations: usize,
    /// Final state has no site outside the tolerance band on both sides
    pub converged: bool,
    pub transfers: usize,
    pub target_area: f64,
    pub sites: Vec<SiteBalance>,
    /// Largest over smallest site area (infinite when a site holds nothing)
    pub area_ratio: f64,
}

struct Candidate {
    region: usize,
    receiver: usize,
    receiver_deficit: f64,
}

/// Shift border regions from over-target to under-target sites, never leaving
/// a donor disconnected.
///
/// Deficit is `target - area`; a site is over when its deficit is below
/// `-tolerance * target` and under when above `tolerance * target`. Each region
/// moves at most once per run, which rules out two sites trading the same
/// region back and forth. Stops when balanced, when an iteration makes no
/// transfer, or at `max_iterations`.
pub fn rebalance(
    graph: &RegionGraph,
    sites: &[Site],
    initial: Ownership,
    config: &EngineConfig,
) -> (Ownership, RebalanceReport) {
    if sites.is_empty() || initial.owners.len() != graph.len() || graph.is_empty() {
        let report = RebalanceReport {
            converged: true,
            ..RebalanceReport::default()
        };
        return (initial, report);
    }

    let Ownership { mut owners, mut areas } = initial;
    let site_count = sites.len();
    let target = graph.total_area() / site_count as f64;
    let threshold = target * config.balance_tolerance;

    // Tie-break rank by site id
    let mut by_id: Vec<usize> = (0..site_count).collect();
    by_id.sort_by(|&a, &b| sites[a].id.cmp(&sites[b].id));
    let mut rank = vec![0usize; site_count];
    for (pos, &site) in by_id.iter().enumerate() {
        rank[site] = pos;
    }

    let mut reach = Reachability::new(graph.len());
    let mut moved = vec![false; graph.len()];
    let mut iterations = 0;
    let mut transfers = 0;

    info!(
        sites = site_count,
        regions = graph.len(),
        target_area = target,
        "rebalancing territories"
    );

    while iterations < config.max_iterations {
        iterations += 1;

        let mut deficit: Vec<f64> = areas.iter().map(|&a| target - a).collect();
        let by_imbalance = |a: &usize, b: &usize, descending: bool| {
            let order = deficit[*a].total_cmp(&deficit[*b]);
            let order = if descending { order.reverse() } else { order };
            order.then(rank[*a].cmp(&rank[*b]))
        };

        let mut over: Vec<usize> = (0..site_count).filter(|&s| deficit[s] < -threshold).collect();
        over.sort_by(|a, b| by_imbalance(a, b, false));
        let mut under: Vec<usize> = (0..site_count).filter(|&s| deficit[s] > threshold).collect();
        under.sort_by(|a, b| by_imbalance(a, b, true));

        if over.is_empty() || under.is_empty() {
            debug!(iteration = iterations, "balanced within tolerance");
            break;
        }
        debug!(
            iteration = iterations,
            over = over.len(),
            under = under.len(),
            most_over = %sites[over[0]].id,
            most_under = %sites[under[0]].id,
            "rebalance pass"
        );

        let mut moved_this_pass = 0;

        for &donor in &over {
            let mut candidates = Vec::new();

            for region in 0..graph.len() {
                if owners[region] != donor || moved[region] {
                    continue;
                }

                let mut best: Option<usize> = None;
                for &n in graph.neighbors(region) {
                    let owner = owners[n];
                    if owner == donor {
                        continue;
                    }
                    best = match best {
                        Some(b)
                            if deficit[owner] < deficit[b]
                                || (deficit[owner] == deficit[b] && rank[owner] >= rank[b]) =>
                        {
                            Some(b)
                        }
                        _ => Some(owner),
                    };
                }

                if let Some(receiver) = best {
                    if deficit[receiver] > threshold {
                        candidates.push(Candidate {
                            region,
                            receiver,
                            receiver_deficit: deficit[receiver],
                        });
                    }
                }
            }

            // Neediest receiver first
            candidates.sort_by(|a, b| {
                b.receiver_deficit
                    .total_cmp(&a.receiver_deficit)
                    .then(graph.region(a.region).id.cmp(&graph.region(b.region).id))
            });

            for candidate in candidates {
                if deficit[donor] >= -threshold {
                    break;
                }
                if deficit[candidate.receiver] <= threshold {
                    continue;
                }
                if !reach.connected_without(graph, &owners, donor, Some(candidate.region)) {
                    continue;
                }

                let area = graph.region(candidate.region).area;
                owners[candidate.region] = candidate.receiver;
                moved[candidate.region] = true;
                areas[donor] -= area;
                areas[candidate.receiver] += area;
                deficit[donor] += area;
                deficit[candidate.receiver] -= area;
                moved_this_pass += 1;

                debug!(
                    iteration = iterations,
                    region = graph.region(candidate.region).id,
                    from = %sites[donor].id,
                    to = %sites[candidate.receiver].id,
                    "transferred region"
                );
            }
        }

        transfers += moved_this_pass;
        if moved_this_pass == 0 {
            debug!(iteration = iterations, "no contiguity-safe transfer left");
            break;
        }
    }

    let ownership = Ownership { owners, areas };
    let report = summarize(graph, sites, &ownership, &mut reach, iterations, transfers, target, threshold);

    info!(
        iterations = report.iterations,
        transfers = report.transfers,
        converged = report.converged,
        area_ratio = report.area_ratio,
        "rebalance finished"
    );

    (ownership, report)
}

#[allow(clippy::too_many_arguments)]
fn summarize(
    graph: &RegionGraph,
    sites: &[Site],
    ownership: &Ownership,
    reach: &mut Reachability,
    iterations: usize,
    transfers: usize,
    target: f64,
    threshold: f64,
) -> RebalanceReport {
    let mut counts = vec![0usize; sites.len()];
    for &owner in &ownership.owners {
        counts[owner] += 1;
    }

    let balances: Vec<SiteBalance> = sites
        .iter()
        .enumerate()
        .map(|(idx, site)| {
            let area = ownership.areas[idx];
            let balance = SiteBalance {
                site: site.id.clone(),
                regions: counts[idx],
                area,
                target_ratio: if target > 0.0 { area / target } else { 0.0 },
                contiguous: reach.connected_without(graph, &ownership.owners, idx, None),
            };
            debug!(
                site = %site.name,
                regions = balance.regions,
                percent_of_target = balance.target_ratio * 100.0,
                contiguous = balance.contiguous,
                "territory"
            );
            balance
        })
        .collect();

    let max = ownership.areas.iter().copied().fold(f64::MIN, f64::max);
    let min = ownership.areas.iter().copied().fold(f64::MAX, f64::min);
    let area_ratio = if min > 0.0 { max / min } else { f64::INFINITY };

    let any_over = ownership.areas.iter().any(|&a| target - a < -threshold);
    let any_under = ownership.areas.iter().any(|&a| target - a > threshold);

    RebalanceReport {
        iterations,
        converged: !(any_over && any_under),
        transfers,
        target_area: target,
        sites: balances,
        area_ratio,
    }
}

#[cfg(test)]
mod tests {
    use super::super::contiguity::is_contiguous;
    use super::super::fixtures::{grid_graph, path_graph, path_sites};
    use super::super::partition::partition;
    use super::super::region::Region;
    use super::*;

    #[test]
    fn test_three_region_path_moves_middle() {
        let graph = path_graph();
        let sites = path_sites();
        let initial = partition(&graph, &sites);
        assert_eq!(initial.owners(), &[0, 0, 1]);

        let (own, report) = rebalance(&graph, &sites, initial, &EngineConfig::default());
        assert_eq!(own.owners(), &[0, 1, 1]);
        assert_eq!(own.areas(), &[1.0, 2.0]);
        assert_eq!(report.transfers, 1);
        // B is now over and A under, but R2 may not move back
        assert!(!report.converged);
        assert_eq!(report.iterations, 2);
    }

    #[test]
    fn test_cut_vertex_is_never_transferred() {
        // R1 - R2 - R3 owned by A, R5 owned by B hangs off R2
        let graph = RegionGraph::new(vec![
            Region::new(1, 1.0, (0.0, 1.0), vec![2]),
            Region::new(2, 1.0, (0.0, 0.0), vec![1, 3, 5]),
            Region::new(3, 1.0, (0.0, -1.0), vec![2]),
            Region::new(5, 1.0, (1.0, 0.0), vec![2]),
        ])
        .unwrap();
        let sites = vec![Site::new("A", "A", (0.0, 0.0)), Site::new("B", "B", (1.0, 0.0))];
        let initial = partition(&graph, &sites);
        assert_eq!(initial.owners(), &[0, 0, 0, 1]);

        let (own, report) = rebalance(&graph, &sites, initial, &EngineConfig::default());
        assert_eq!(own.owners(), &[0, 0, 0, 1]);
        assert_eq!(report.transfers, 0);
        assert!(!report.converged);
        assert!(report.sites.iter().all(|s| s.contiguous));
    }

    fn strip_sites() -> Vec<Site> {
        vec![Site::new("A", "A", (3.2, 0.0)), Site::new("B", "B", (9.0, 0.0))]
    }

    #[test]
    fn test_strip_converges_over_several_passes() {
        let graph = grid_graph(10, 1);
        let sites = strip_sites();
        let initial = partition(&graph, &sites);
        assert_eq!(initial.areas(), &[7.0, 3.0]);

        let (own, report) = rebalance(&graph, &sites, initial, &EngineConfig::default());
        assert_eq!(own.areas(), &[5.0, 5.0]);
        assert!(report.converged);
        assert_eq!(report.transfers, 2);
        assert_eq!(report.iterations, 3);
        assert!((report.area_ratio - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_iteration_cap_stops_early() {
        let graph = grid_graph(10, 1);
        let sites = strip_sites();
        let config = EngineConfig {
            max_iterations: 1,
            ..EngineConfig::default()
        };
        let (own, report) = rebalance(&graph, &sites, partition(&graph, &sites), &config);
        assert_eq!(report.iterations, 1);
        assert_eq!(own.areas(), &[6.0, 4.0]);
        assert!(!report.converged);
    }

    #[test]
    fn test_contiguity_and_area_preserved_on_grid() {
        let graph = grid_graph(12, 8);
        let sites = vec![
            Site::new("nw", "NW", (1.0, 7.0)),
            Site::new("ne", "NE", (10.0, 6.0)),
            Site::new("s", "S", (5.0, 0.0)),
            Site::new("c", "C", (6.0, 4.0)),
        ];
        let initial = partition(&graph, &sites);
        let was_contiguous: Vec<bool> = (0..sites.len())
            .map(|s| is_contiguous(&graph, initial.owners(), s))
            .collect();

        let (own, report) = rebalance(&graph, &sites, initial, &EngineConfig::default());

        for (s, &before) in was_contiguous.iter().enumerate() {
            if before {
                assert!(is_contiguous(&graph, own.owners(), s), "site {s} lost contiguity");
            }
        }
        let total: f64 = own.areas().iter().sum();
        assert!((total - graph.total_area()).abs() < 1e-9);
        assert!(report.iterations <= EngineConfig::default().max_iterations);
        assert_eq!(report.sites.len(), sites.len());
    }

    /// Regions as `(id, area, neighbors)` owned by the given site indices
    fn owned_graph(regions: &[(u32, f64, Vec<u32>)], owners: &[usize], sites: usize) -> (RegionGraph, Ownership) {
        let graph = RegionGraph::new(
            regions
                .iter()
                .map(|(id, area, neighbors)| Region::new(*id, *area, (*id as f64, 0.0), neighbors.clone()))
                .collect(),
        )
        .unwrap();
        let mut areas = vec![0.0; sites];
        for (region, &owner) in owners.iter().enumerate() {
            areas[owner] += graph.region(region).area;
        }
        let ownership = Ownership {
            owners: owners.to_vec(),
            areas,
        };
        (graph, ownership)
    }

    fn owner_ids(own: &Ownership, sites: &[Site]) -> Vec<String> {
        own.owners().iter().map(|&s| sites[s].id.as_str().to_string()).collect()
    }

    #[test]
    fn test_neediest_receiver_served_first() {
        // d holds 1 (hub), 2 (borders x) and 3 (borders y); y is needier
        let (graph, initial) = owned_graph(
            &[
                (1, 2.0, vec![2, 3]),
                (2, 1.0, vec![1, 4]),
                (3, 1.0, vec![1, 5]),
                (4, 2.75, vec![2]),
                (5, 2.25, vec![3]),
            ],
            &[0, 0, 0, 1, 2],
            3,
        );
        let sites = vec![
            Site::new("d", "D", (1.0, 0.0)),
            Site::new("x", "X", (4.0, 0.0)),
            Site::new("y", "Y", (5.0, 0.0)),
        ];

        let (own, report) = rebalance(&graph, &sites, initial, &EngineConfig::default());
        assert_eq!(owner_ids(&own, &sites), vec!["d", "d", "y", "x", "y"]);
        assert_eq!(own.areas(), &[3.0, 2.75, 3.25]);
        assert_eq!(report.transfers, 1);
    }

    #[test]
    fn test_equal_deficits_prefer_lower_site_id() {
        // Region 2 borders both receivers, which are equally short
        let regions: &[(u32, f64, Vec<u32>)] = &[
            (1, 3.0, vec![2]),
            (2, 1.0, vec![1, 3, 4]),
            (3, 2.5, vec![2]),
            (4, 2.5, vec![2]),
        ];
        let d = Site::new("d", "D", (1.0, 0.0));
        let x = Site::new("x", "X", (3.0, 0.0));
        let y = Site::new("y", "Y", (4.0, 0.0));

        let forward = vec![d.clone(), x.clone(), y.clone()];
        let (graph, initial) = owned_graph(regions, &[0, 0, 1, 2], 3);
        let (own, _) = rebalance(&graph, &forward, initial, &EngineConfig::default());
        assert_eq!(owner_ids(&own, &forward), vec!["d", "x", "x", "y"]);

        let reversed = vec![d, y, x];
        let (graph, initial) = owned_graph(regions, &[0, 0, 2, 1], 3);
        let (own, _) = rebalance(&graph, &reversed, initial, &EngineConfig::default());
        assert_eq!(owner_ids(&own, &reversed), vec!["d", "x", "x", "y"]);
    }

    #[test]
    fn test_filled_receiver_is_skipped() {
        // Regions 2 and 3 both border x; once 2 fills x, 3 stays and 4 goes to y
        let (graph, initial) = owned_graph(
            &[
                (1, 1.5, vec![2, 3, 4]),
                (2, 1.0, vec![1, 5]),
                (3, 1.0, vec![1, 5]),
                (4, 1.0, vec![1, 6]),
                (5, 2.0, vec![2, 3]),
                (6, 2.5, vec![4]),
            ],
            &[0, 0, 0, 0, 1, 2],
            3,
        );
        let sites = vec![
            Site::new("d", "D", (1.0, 0.0)),
            Site::new("x", "X", (5.0, 0.0)),
            Site::new("y", "Y", (6.0, 0.0)),
        ];

        let (own, report) = rebalance(&graph, &sites, initial, &EngineConfig::default());
        assert_eq!(owner_ids(&own, &sites), vec!["d", "x", "d", "y", "x", "y"]);
        assert_eq!(own.areas(), &[2.5, 3.0, 3.5]);
        assert_eq!(report.transfers, 2);
    }

    #[test]
    fn test_empty_input_is_noop() {
        let graph = path_graph();
        let (own, report) = rebalance(&graph, &[], partition(&graph, &[]), &EngineConfig::default());
        assert!(own.is_empty());
        assert!(report.converged);
        assert_eq!(report.iterations, 0);
    }
}
