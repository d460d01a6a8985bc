//! Population Composer
//!
//! Builds the human and bot subgraphs, joins them, and wires infiltration
//! edges: every bot gains a random number of human followers, chosen either
//! uniformly or in proportion to each human's follower count.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::agent::Role;
use crate::error::{SimError, SimResult};
use crate::graph::DirectedGraph;
use crate::network::{grow, NetworkParams};
use crate::sampling::{sample_uniform, sample_weighted_without_replacement};
use crate::social::SocialGraph;

/// How bots pick their human followers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TargetingMode {
    /// Uniform over humans
    #[default]
    Random,
    /// Weighted by human in-degree
    Preferential,
}

impl TargetingMode {
    pub fn label(self) -> &'static str {
        match self {
            TargetingMode::Random => "random",
            TargetingMode::Preferential => "preferential",
        }
    }
}

/// Population composition parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationParams {
    pub n_humans: usize,
    /// Bots per human
    pub beta: f64,
    /// Probability that a given human follows a given bot
    pub gamma: f64,
    pub targeting: TargetingMode,
    pub network: NetworkParams,
}

impl Default for PopulationParams {
    fn default() -> Self {
        Self {
            n_humans: 1000,
            beta: 0.1,
            gamma: 0.1,
            targeting: TargetingMode::Random,
            network: NetworkParams::default(),
        }
    }
}

impl PopulationParams {
    pub fn validate(&self) -> SimResult<()> {
        if self.n_humans == 0 {
            return Err(SimError::EmptyPopulation);
        }
        if !self.beta.is_finite() || self.beta < 0.0 {
            return Err(SimError::parameter(
                "beta",
                self.beta,
                "must be a non-negative number",
            ));
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(SimError::parameter(
                "gamma",
                self.gamma,
                "must be within [0, 1]",
            ));
        }
        self.network.validate()
    }

    /// Number of bots implied by `n_humans * beta`, rounded
    pub fn n_bots(&self) -> usize {
        (self.n_humans as f64 * self.beta).round() as usize
    }

    pub fn with_targeting(mut self, targeting: TargetingMode) -> Self {
        self.targeting = targeting;
        self
    }
}

/// A composed population and a summary of the infiltration step
#[derive(Debug, Clone)]
pub struct ComposedPopulation {
    pub graph: SocialGraph,
    /// Human -> bot edges added
    pub infiltration_edges: usize,
}

/// Compose humans and bots into one graph.
///
/// Humans occupy ids `0..n_humans`, bots follow.
pub fn compose<R: Rng + ?Sized>(
    params: &PopulationParams,
    rng: &mut R,
) -> SimResult<ComposedPopulation> {
    params.validate()?;

    let n_humans = params.n_humans;
    let n_bots = params.n_bots();

    let mut topology = grow(n_humans, &params.network, rng)?;
    let bots = grow(n_bots, &params.network, rng)?;
    let offset = topology.absorb(&bots);

    let mut roles = vec![Role::Human; n_humans];
    roles.extend(std::iter::repeat(Role::Bot).take(n_bots));
    let mut graph = SocialGraph::from_topology(topology, &roles)?;

    let humans: Vec<usize> = (0..n_humans).collect();
    // Bot edges point at bots, so human in-degrees are stable during wiring
    let weights: Vec<f64> = humans
        .iter()
        .map(|&h| graph.follower_count(h) as f64)
        .collect();

    let mut infiltration_edges = 0;
    for bot in offset..offset + n_bots {
        let n_followers = (0..n_humans)
            .filter(|_| rng.gen_bool(params.gamma))
            .count();
        let followers = match params.targeting {
            TargetingMode::Random => sample_uniform(&humans, n_followers, rng),
            TargetingMode::Preferential => {
                sample_weighted_without_replacement(&humans, n_followers, &weights, rng)?
            }
        };
        for follower in followers.into_items() {
            if graph.add_follow(follower, bot) {
                infiltration_edges += 1;
            }
        }
    }

    tracing::debug!(
        n_humans,
        n_bots,
        infiltration_edges,
        targeting = params.targeting.label(),
        "composed population"
    );

    Ok(ComposedPopulation {
        graph,
        infiltration_edges,
    })
}

/// Replace the bots of an existing (e.g. empirical) graph with synthetic ones.
///
/// The original bots are removed, a grown bot network of the same size is
/// added, and each synthetic bot gains `round(n_humans * gamma)` human
/// followers sampled in proportion to how many bots each human followed
/// before the replacement.
pub fn replace_bots<R: Rng + ?Sized>(
    graph: &SocialGraph,
    gamma: f64,
    network: &NetworkParams,
    rng: &mut R,
) -> SimResult<ComposedPopulation> {
    if !(0.0..=1.0).contains(&gamma) {
        return Err(SimError::parameter("gamma", gamma, "must be within [0, 1]"));
    }
    let human_ids = graph.human_ids();
    if human_ids.is_empty() {
        return Err(SimError::EmptyPopulation);
    }
    let n_bots = graph.bot_count();

    // Dense renumbering of humans, keeping human-human edges
    let mut new_index = vec![usize::MAX; graph.agent_count()];
    for (i, &h) in human_ids.iter().enumerate() {
        new_index[h] = i;
    }
    let mut vulnerability = vec![0.0; human_ids.len()];
    let mut topology = DirectedGraph::with_nodes(human_ids.len());
    for (i, &h) in human_ids.iter().enumerate() {
        for &friend in graph.followees(h) {
            if graph.role(friend).is_bot() {
                vulnerability[i] += 1.0;
            } else {
                topology.add_edge(i, new_index[friend]);
            }
        }
    }

    let bots = grow(n_bots, network, rng)?;
    let offset = topology.absorb(&bots);

    let mut roles = vec![Role::Human; human_ids.len()];
    roles.extend(std::iter::repeat(Role::Bot).take(n_bots));
    let mut replaced = SocialGraph::from_topology(topology, &roles)?;

    let humans: Vec<usize> = (0..human_ids.len()).collect();
    let n_followers = (human_ids.len() as f64 * gamma).round() as usize;
    let mut infiltration_edges = 0;
    for bot in offset..offset + n_bots {
        let followers =
            sample_weighted_without_replacement(&humans, n_followers, &vulnerability, rng)?;
        for follower in followers.into_items() {
            if replaced.add_follow(follower, bot) {
                infiltration_edges += 1;
            }
        }
    }

    Ok(ComposedPopulation {
        graph: replaced,
        infiltration_edges,
    })
}
