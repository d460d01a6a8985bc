//! Network Generator
//!
//! Random-walk growth model with tunable clustering. Each new node follows an
//! anchor, closes triads through some of the anchor's followees and fills the
//! remaining slots with uniformly random nodes, which yields a single
//! component with a right-skewed in-degree distribution.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::graph::DirectedGraph;

/// Growth parameters shared by the human and bot subgraphs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkParams {
    /// Probability that each extra edge closes a triad through the anchor
    pub clustering_p: f64,
    /// Outgoing edges per grown node
    pub out_degree_k: usize,
}

impl Default for NetworkParams {
    fn default() -> Self {
        Self {
            clustering_p: 0.5,
            out_degree_k: 3,
        }
    }
}

impl NetworkParams {
    pub fn validate(&self) -> SimResult<()> {
        if !(0.0..=1.0).contains(&self.clustering_p) {
            return Err(SimError::parameter(
                "clustering_p",
                self.clustering_p,
                "must be within [0, 1]",
            ));
        }
        Ok(())
    }
}

/// Grow a directed graph of `size` nodes.
///
/// Graphs with `size <= out_degree_k + 1` are returned complete. Otherwise the
/// graph starts as a complete graph on `out_degree_k` nodes and every grown
/// node receives exactly `out_degree_k` distinct outgoing edges.
pub fn grow<R: Rng + ?Sized>(
    size: usize,
    params: &NetworkParams,
    rng: &mut R,
) -> SimResult<DirectedGraph> {
    params.validate()?;
    let k = params.out_degree_k;

    if size <= k + 1 {
        return Ok(DirectedGraph::complete(size));
    }
    if k == 0 {
        return Err(SimError::InvalidArgument(format!(
            "out_degree_k must be positive to grow a network of {size} nodes"
        )));
    }

    let mut graph = DirectedGraph::complete(k);
    let mut friends: Vec<usize> = Vec::with_capacity(k);

    for _ in k..size {
        let existing = graph.node_count();
        let anchor = rng.gen_range(0..existing);

        let triadic = (0..k - 1)
            .filter(|_| rng.gen_bool(params.clustering_p))
            .count();
        // The anchor may follow fewer nodes than the triadic draw asks for
        let triadic = triadic.min(graph.out_degree(anchor));

        friends.clear();
        friends.push(anchor);
        friends.extend(
            graph
                .successors(anchor)
                .choose_multiple(rng, triadic)
                .copied(),
        );

        // Random fill among existing nodes not already chosen
        while friends.len() < k {
            let candidate = rng.gen_range(0..existing);
            if !friends.contains(&candidate) {
                friends.push(candidate);
            }
        }

        let node = graph.add_node();
        for &friend in &friends {
            graph.add_edge(node, friend);
        }
    }

    tracing::trace!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "grew random-walk network"
    );
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_small_network_is_complete() {
        let mut rng = SmallRng::seed_from_u64(1);
        let graph = grow(4, &NetworkParams::default(), &mut rng).unwrap();
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 12);
    }

    #[test]
    fn test_grown_nodes_have_exact_out_degree() {
        let mut rng = SmallRng::seed_from_u64(2);
        let params = NetworkParams::default();
        let graph = grow(500, &params, &mut rng).unwrap();

        assert_eq!(graph.node_count(), 500);
        for node in params.out_degree_k..500 {
            assert_eq!(graph.out_degree(node), params.out_degree_k);
        }
        for node in 0..params.out_degree_k {
            assert_eq!(graph.out_degree(node), params.out_degree_k - 1);
        }
        assert!(graph.is_weakly_connected());
    }

    #[test]
    fn test_in_degree_is_skewed() {
        let mut rng = SmallRng::seed_from_u64(3);
        let graph = grow(2000, &NetworkParams::default(), &mut rng).unwrap();
        let max_in = graph.nodes().map(|n| graph.in_degree(n)).max().unwrap();
        // Mean in-degree is about 3; hubs should be far above it
        assert!(max_in > 20, "max in-degree {max_in}");
    }

    #[test]
    fn test_no_clustering_and_full_clustering() {
        let mut rng = SmallRng::seed_from_u64(4);
        for p in [0.0, 1.0] {
            let params = NetworkParams {
                clustering_p: p,
                out_degree_k: 4,
            };
            let graph = grow(300, &params, &mut rng).unwrap();
            for node in 4..300 {
                assert_eq!(graph.out_degree(node), 4);
            }
        }
    }

    #[test]
    fn test_invalid_parameters() {
        let mut rng = SmallRng::seed_from_u64(5);
        let zero_k = NetworkParams {
            clustering_p: 0.5,
            out_degree_k: 0,
        };
        assert!(grow(10, &zero_k, &mut rng).is_err());
        assert_eq!(grow(1, &zero_k, &mut rng).unwrap().node_count(), 1);

        let bad_p = NetworkParams {
            clustering_p: 1.5,
            out_degree_k: 3,
        };
        assert!(matches!(
            grow(10, &bad_p, &mut rng),
            Err(SimError::InvalidParameter { name: "clustering_p", .. })
        ));
    }

    #[test]
    fn test_empty_network() {
        let mut rng = SmallRng::seed_from_u64(6);
        let graph = grow(0, &NetworkParams::default(), &mut rng).unwrap();
        assert_eq!(graph.node_count(), 0);
    }
}
