use std::collections::VecDeque;

use super::region::RegionGraph;

/// Reusable breadth-first reachability over the region graph.
/// Visited marks are generation stamps, so repeated checks do not clear a buffer.
pub struct Reachability {
    stamp: Vec<u32>,
    generation: u32,
    queue: VecDeque<usize>,
}

impl Reachability {
    pub fn new(region_count: usize) -> Self {
        Self {
            stamp: vec![0; region_count],
            generation: 0,
            queue: VecDeque::new(),
        }
    }

    fn next_generation(&mut self) -> u32 {
        self.generation = self.generation.wrapping_add(1);
        if self.generation == 0 {
            self.stamp.fill(0);
            self.generation = 1;
        }
        self.generation
    }

    /// True when the regions owned by `site`, minus `removed`, form a single
    /// connected component. An empty or single-region remainder is connected.
    pub fn connected_without(
        &mut self,
        graph: &RegionGraph,
        owners: &[usize],
        site: usize,
        removed: Option<usize>,
    ) -> bool {
        let in_territory = |idx: usize| owners[idx] == site && Some(idx) != removed;

        let mut members = 0usize;
        let mut start = None;
        for idx in 0..owners.len() {
            if in_territory(idx) {
                members += 1;
                start.get_or_insert(idx);
            }
        }
        let Some(start) = start else {
            return true;
        };
        if members == 1 {
            return true;
        }

        if self.stamp.len() < owners.len() {
            self.stamp.resize(owners.len(), 0);
        }
        let generation = self.next_generation();

        self.queue.clear();
        self.queue.push_back(start);
        self.stamp[start] = generation;
        let mut reached = 1usize;

        while let Some(current) = self.queue.pop_front() {
            for &n in graph.neighbors(current) {
                if self.stamp[n] != generation && in_territory(n) {
                    self.stamp[n] = generation;
                    reached += 1;
                    self.queue.push_back(n);
                }
            }
        }

        reached == members
    }
}

/// One-shot check that a site's territory is a single connected component
pub fn is_contiguous(graph: &RegionGraph, owners: &[usize], site: usize) -> bool {
    Reachability::new(graph.len()).connected_without(graph, owners, site, None)
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{grid_graph, path_graph};
    use super::*;

    #[test]
    fn test_path_connectivity() {
        let graph = path_graph();
        assert!(is_contiguous(&graph, &[0, 0, 0], 0));
        assert!(!is_contiguous(&graph, &[0, 1, 0], 0));
        assert!(is_contiguous(&graph, &[0, 1, 0], 1));
    }

    #[test]
    fn test_removing_cut_vertex_disconnects() {
        let graph = path_graph();
        let mut reach = Reachability::new(graph.len());
        assert!(!reach.connected_without(&graph, &[0, 0, 0], 0, Some(1)));
        assert!(reach.connected_without(&graph, &[0, 0, 0], 0, Some(0)));
        assert!(reach.connected_without(&graph, &[0, 0, 0], 0, Some(2)));
    }

    #[test]
    fn test_empty_and_single_are_connected() {
        let graph = path_graph();
        assert!(is_contiguous(&graph, &[0, 0, 0], 5));
        let mut reach = Reachability::new(graph.len());
        assert!(reach.connected_without(&graph, &[1, 0, 0], 1, Some(0)));
        assert!(reach.connected_without(&graph, &[1, 1, 0], 1, Some(0)));
    }

    #[test]
    fn test_ring_survives_single_removal() {
        // 3x3 grid with the center removed from the territory is a ring
        let graph = grid_graph(3, 3);
        let owners = [0, 0, 0, 0, 1, 0, 0, 0, 0];
        let mut reach = Reachability::new(graph.len());
        assert!(reach.connected_without(&graph, &owners, 0, None));
        assert!(reach.connected_without(&graph, &owners, 0, Some(1)));
        // Reusing the scratch state across many checks stays correct
        for _ in 0..10 {
            assert!(reach.connected_without(&graph, &owners, 0, Some(0)));
        }
    }
}
