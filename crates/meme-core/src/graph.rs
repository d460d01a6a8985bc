//! Directed Graph
//!
//! Plain adjacency-list digraph used for follow relations.
//! Edge `(u, v)` means "u follows v"; content authored by `v` reaches every
//! predecessor of `v`, so a node's in-degree is its follower count.

/// Directed graph over dense node indices `0..node_count`.
///
/// Only `add_edge` touches the adjacency lists, which keeps successors,
/// predecessors and `edge_count` in agreement. Persist graphs through
/// `meme_io::GraphDocument`, which rebuilds them edge by edge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectedGraph {
    successors: Vec<Vec<usize>>,
    predecessors: Vec<Vec<usize>>,
    edge_count: usize,
}

impl DirectedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Graph with `n` isolated nodes
    pub fn with_nodes(n: usize) -> Self {
        Self {
            successors: vec![Vec::new(); n],
            predecessors: vec![Vec::new(); n],
            edge_count: 0,
        }
    }

    /// Complete directed graph: every ordered pair of distinct nodes is an edge
    pub fn complete(n: usize) -> Self {
        let mut graph = Self::with_nodes(n);
        for u in 0..n {
            for v in 0..n {
                if u != v {
                    graph.add_edge(u, v);
                }
            }
        }
        graph
    }

    /// Append a node and return its index
    pub fn add_node(&mut self) -> usize {
        self.successors.push(Vec::new());
        self.predecessors.push(Vec::new());
        self.successors.len() - 1
    }

    /// Add edge `u -> v`. Returns false for self loops and duplicates.
    ///
    /// Panics if either endpoint is not a node of the graph.
    pub fn add_edge(&mut self, u: usize, v: usize) -> bool {
        assert!(
            u < self.node_count() && v < self.node_count(),
            "edge ({u}, {v}) outside graph of {} nodes",
            self.node_count()
        );
        if u == v || self.has_edge(u, v) {
            return false;
        }
        self.successors[u].push(v);
        self.predecessors[v].push(u);
        self.edge_count += 1;
        true
    }

    pub fn has_edge(&self, u: usize, v: usize) -> bool {
        // Out-degrees are small (k plus bot follows), a scan beats hashing here
        self.successors
            .get(u)
            .map(|out| out.contains(&v))
            .unwrap_or(false)
    }

    pub fn node_count(&self) -> usize {
        self.successors.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Nodes that `u` follows
    pub fn successors(&self, u: usize) -> &[usize] {
        &self.successors[u]
    }

    /// Followers of `v`
    pub fn predecessors(&self, v: usize) -> &[usize] {
        &self.predecessors[v]
    }

    pub fn out_degree(&self, u: usize) -> usize {
        self.successors[u].len()
    }

    pub fn in_degree(&self, v: usize) -> usize {
        self.predecessors[v].len()
    }

    pub fn nodes(&self) -> std::ops::Range<usize> {
        0..self.node_count()
    }

    /// All edges as `(u, v)` pairs, grouped by source
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.successors
            .iter()
            .enumerate()
            .flat_map(|(u, out)| out.iter().map(move |&v| (u, v)))
    }

    /// Disjoint union: nodes of `other` are renumbered to follow ours.
    /// Returns the offset applied to `other`'s indices.
    pub fn absorb(&mut self, other: &DirectedGraph) -> usize {
        let offset = self.node_count();
        for _ in other.nodes() {
            self.add_node();
        }
        for (u, v) in other.edges() {
            self.add_edge(u + offset, v + offset);
        }
        offset
    }

    /// Whether the graph is weakly connected (empty graphs count as connected)
    pub fn is_weakly_connected(&self) -> bool {
        let n = self.node_count();
        if n == 0 {
            return true;
        }
        let mut seen = vec![false; n];
        let mut stack = vec![0];
        seen[0] = true;
        let mut reached = 1;
        while let Some(u) = stack.pop() {
            for &w in self.successors[u].iter().chain(self.predecessors[u].iter()) {
                if !seen[w] {
                    seen[w] = true;
                    reached += 1;
                    stack.push(w);
                }
            }
        }
        reached == n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_graph_edges() {
        let graph = DirectedGraph::complete(4);
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 12);
        for u in graph.nodes() {
            assert_eq!(graph.out_degree(u), 3);
            assert_eq!(graph.in_degree(u), 3);
        }
    }

    #[test]
    fn test_adjacency_lists_agree() {
        let mut graph = DirectedGraph::complete(3);
        let mut other = DirectedGraph::with_nodes(2);
        other.add_edge(0, 1);
        graph.absorb(&other);
        graph.add_edge(4, 0);

        let mut forward = 0;
        for u in graph.nodes() {
            for &v in graph.successors(u) {
                assert!(graph.predecessors(v).contains(&u));
                forward += 1;
            }
        }
        let backward: usize = graph.nodes().map(|v| graph.in_degree(v)).sum();
        assert_eq!(forward, graph.edge_count());
        assert_eq!(backward, graph.edge_count());
        assert_eq!(graph.edge_count(), 8);
    }

    #[test]
    fn test_add_edge_rejects_duplicates_and_loops() {
        let mut graph = DirectedGraph::with_nodes(2);
        assert!(graph.add_edge(0, 1));
        assert!(!graph.add_edge(0, 1));
        assert!(!graph.add_edge(1, 1));
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.predecessors(1), &[0]);
        assert_eq!(graph.successors(0), &[1]);
    }

    #[test]
    fn test_absorb_renumbers() {
        let mut a = DirectedGraph::complete(2);
        let b = DirectedGraph::complete(3);
        let offset = a.absorb(&b);

        assert_eq!(offset, 2);
        assert_eq!(a.node_count(), 5);
        assert_eq!(a.edge_count(), 2 + 6);
        assert!(a.has_edge(2, 4));
        assert!(!a.has_edge(0, 2));
        assert!(!a.is_weakly_connected());
    }

    #[test]
    fn test_edges_iterator_matches_count() {
        let graph = DirectedGraph::complete(5);
        assert_eq!(graph.edges().count(), graph.edge_count());
    }
}
