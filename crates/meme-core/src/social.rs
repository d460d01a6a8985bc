//! Social Graph
//!
//! Follow topology plus one [`Agent`] per node. Topology is frozen once the
//! population has been composed; only feeds change while content spreads.
//!
//! Cloning a `SocialGraph` shares meme handles between the clone and the
//! original. Memes are immutable, so the sharing is never observable except
//! through identity.

use crate::agent::{Agent, Role};
use crate::error::{SimError, SimResult};
use crate::graph::DirectedGraph;

#[derive(Debug, Clone, Default)]
pub struct SocialGraph {
    topology: DirectedGraph,
    agents: Vec<Agent>,
}

impl SocialGraph {
    /// Tag every node of `topology` with a role; feeds start empty
    pub fn from_topology(topology: DirectedGraph, roles: &[Role]) -> SimResult<Self> {
        if roles.len() != topology.node_count() {
            return Err(SimError::InvalidArgument(format!(
                "{} roles supplied for {} nodes",
                roles.len(),
                topology.node_count()
            )));
        }
        let agents = roles
            .iter()
            .enumerate()
            .map(|(id, &role)| Agent::new(id, role))
            .collect();
        Ok(Self { topology, agents })
    }

    /// Build from bot flags and follow edges, as delivered by graph importers
    pub fn from_edges(
        bot_flags: &[bool],
        edges: impl IntoIterator<Item = (usize, usize)>,
    ) -> SimResult<Self> {
        let n = bot_flags.len();
        let mut topology = DirectedGraph::with_nodes(n);
        for (u, v) in edges {
            if u >= n {
                return Err(SimError::UnknownAgent(u));
            }
            if v >= n {
                return Err(SimError::UnknownAgent(v));
            }
            topology.add_edge(u, v);
        }
        let roles: Vec<Role> = bot_flags.iter().map(|&b| Role::from_bot_flag(b)).collect();
        Self::from_topology(topology, &roles)
    }

    pub fn topology(&self) -> &DirectedGraph {
        &self.topology
    }

    /// Wire a follow edge. Only population composition calls this.
    pub(crate) fn add_follow(&mut self, follower: usize, followee: usize) -> bool {
        self.topology.add_edge(follower, followee)
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn agent(&self, id: usize) -> Option<&Agent> {
        self.agents.get(id)
    }

    pub fn agent_mut(&mut self, id: usize) -> Option<&mut Agent> {
        self.agents.get_mut(id)
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn role(&self, id: usize) -> Role {
        self.agents[id].role()
    }

    pub fn humans(&self) -> impl Iterator<Item = &Agent> + '_ {
        self.agents.iter().filter(|a| !a.is_bot())
    }

    pub fn bots(&self) -> impl Iterator<Item = &Agent> + '_ {
        self.agents.iter().filter(|a| a.is_bot())
    }

    pub fn human_ids(&self) -> Vec<usize> {
        self.humans().map(|a| a.id).collect()
    }

    pub fn bot_ids(&self) -> Vec<usize> {
        self.bots().map(|a| a.id).collect()
    }

    pub fn human_count(&self) -> usize {
        self.humans().count()
    }

    pub fn bot_count(&self) -> usize {
        self.bots().count()
    }

    /// Agents following `id`
    pub fn followers(&self, id: usize) -> &[usize] {
        self.topology.predecessors(id)
    }

    /// Agents that `id` follows
    pub fn followees(&self, id: usize) -> &[usize] {
        self.topology.successors(id)
    }

    pub fn follower_count(&self, id: usize) -> usize {
        self.topology.in_degree(id)
    }

    /// Empty every feed, keeping topology and roles
    pub fn clear_feeds(&mut self) {
        for agent in &mut self.agents {
            agent.feed.clear();
        }
    }

    pub fn max_feed_len(&self) -> usize {
        self.agents.iter().map(|a| a.feed.len()).max().unwrap_or(0)
    }

    /// Split borrow used by propagation: feeds of all agents plus the topology
    pub(crate) fn parts_mut(&mut self) -> (&DirectedGraph, &mut [Agent]) {
        (&self.topology, &mut self.agents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_edges_roles_and_followers() {
        let graph = SocialGraph::from_edges(&[false, false, true], vec![(0, 2), (1, 2), (0, 1)])
            .unwrap();

        assert_eq!(graph.agent_count(), 3);
        assert_eq!(graph.human_count(), 2);
        assert_eq!(graph.bot_ids(), vec![2]);
        assert_eq!(graph.follower_count(2), 2);
        assert_eq!(graph.followees(0), &[2, 1]);
        assert!(graph.agents().iter().all(|a| a.feed.is_empty()));
    }

    #[test]
    fn test_from_edges_rejects_unknown_nodes() {
        let err = SocialGraph::from_edges(&[false], vec![(0, 3)]).unwrap_err();
        assert_eq!(err, SimError::UnknownAgent(3));
    }

    #[test]
    fn test_from_topology_role_count_mismatch() {
        let result = SocialGraph::from_topology(DirectedGraph::complete(3), &[Role::Human]);
        assert!(matches!(result, Err(SimError::InvalidArgument(_))));
    }
}
