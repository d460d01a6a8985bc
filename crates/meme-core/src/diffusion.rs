//! Diffusion Engine
//!
//! One step activates one agent: it either reposts a meme from its feed
//! (chosen in proportion to fitness) or authors a new one, then pushes the
//! meme to the front of every follower's feed and trims feeds to `alpha`.

use std::sync::Arc;

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::collectors::{Collector, Collectors};
use crate::error::{SimError, SimResult};
use crate::meme::{MemeFactory, MemeId, MemeRef};
use crate::social::SocialGraph;

/// Per-step parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffusionParams {
    /// Feed depth
    pub alpha: usize,
    /// Probability of posting a new meme rather than reposting
    pub mu: f64,
    /// Bot deception, >= 1
    pub phi: f64,
}

impl Default for DiffusionParams {
    fn default() -> Self {
        Self {
            alpha: 15,
            mu: 0.75,
            phi: 1.0,
        }
    }
}

impl DiffusionParams {
    pub fn validate(&self) -> SimResult<()> {
        if self.alpha == 0 {
            return Err(SimError::parameter("alpha", 0.0, "feed depth must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.mu) {
            return Err(SimError::parameter("mu", self.mu, "must be within [0, 1]"));
        }
        if !self.phi.is_finite() || self.phi < 1.0 {
            return Err(SimError::parameter("phi", self.phi, "must be a finite number >= 1"));
        }
        Ok(())
    }
}

/// What the activated agent did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    Post,
    Repost,
}

/// Summary of one activation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StepOutcome {
    pub agent: usize,
    pub action: StepAction,
    pub meme: MemeId,
    /// Followers whose feeds received the meme
    pub reached: usize,
}

/// Mutable state of one run: graph, meme factory, collectors and the
/// quality measured after each round
#[derive(Debug, Clone)]
pub struct SimulationState {
    pub graph: SocialGraph,
    pub params: DiffusionParams,
    pub factory: MemeFactory,
    pub collectors: Collectors,
    pub quality_series: Vec<f64>,
    pub steps: u64,
}

impl SimulationState {
    pub fn new(graph: SocialGraph, params: DiffusionParams) -> SimResult<Self> {
        params.validate()?;
        if graph.agent_count() == 0 {
            return Err(SimError::InvalidArgument(
                "cannot simulate an empty graph".to_string(),
            ));
        }
        Ok(Self {
            graph,
            params,
            factory: MemeFactory::new(),
            collectors: Collectors::none(),
            quality_series: Vec::new(),
            steps: 0,
        })
    }

    pub fn with_collectors(mut self, collectors: Collectors) -> Self {
        self.collectors = collectors;
        self
    }

    /// Activate a uniformly chosen agent
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> StepOutcome {
        let agent = rng.gen_range(0..self.graph.agent_count());
        self.activate(agent, rng)
    }

    /// Activate a specific agent.
    ///
    /// Panics if `agent` is not in the graph.
    pub fn activate<R: Rng + ?Sized>(&mut self, agent: usize, rng: &mut R) -> StepOutcome {
        self.steps += 1;
        activate(
            &mut self.graph,
            &mut self.factory,
            &self.params,
            &mut self.collectors,
            agent,
            rng,
        )
    }

    /// Empty all feeds and counters so the same topology can run again
    pub fn restart(&mut self) {
        self.graph.clear_feeds();
        self.factory.reset();
        self.collectors.reset();
        self.quality_series.clear();
        self.steps = 0;
    }
}

/// Pick the meme `agent` shares: a fitness-weighted repost or a new meme
fn choose_meme<R: Rng + ?Sized>(
    graph: &SocialGraph,
    factory: &mut MemeFactory,
    params: &DiffusionParams,
    agent: usize,
    rng: &mut R,
) -> (StepAction, MemeRef) {
    let node = &graph.agents()[agent];
    let feed = &node.feed;

    if !feed.is_empty() && rng.gen::<f64>() > params.mu {
        let fitnesses: Vec<f64> = feed.iter().map(|m| m.fitness).collect();
        let index = match WeightedIndex::new(&fitnesses) {
            Ok(dist) => dist.sample(rng),
            // Every fitness rounded to zero
            Err(_) => rng.gen_range(0..feed.len()),
        };
        if let Some(meme) = feed.get(index) {
            return (StepAction::Repost, Arc::clone(meme));
        }
    }

    let meme = factory.create(node.role(), params.phi, rng);
    (StepAction::Post, Arc::new(meme))
}

/// One activation of `agent` with an arbitrary collector
pub fn activate<C, R>(
    graph: &mut SocialGraph,
    factory: &mut MemeFactory,
    params: &DiffusionParams,
    collector: &mut C,
    agent: usize,
    rng: &mut R,
) -> StepOutcome
where
    C: Collector + ?Sized,
    R: Rng + ?Sized,
{
    let role = graph.role(agent);
    let (action, meme) = choose_meme(graph, factory, params, agent, rng);
    collector.on_select(&meme, role);

    let count_forgotten = collector.tracks_forgotten();
    let (topology, agents) = graph.parts_mut();
    let followers = topology.predecessors(agent);
    for &follower in followers {
        let node = &mut agents[follower];
        node.feed.push_front(Arc::clone(&meme));
        if node.feed.len() > params.alpha {
            let zeros = node.feed.truncate(params.alpha);
            if count_forgotten && !node.is_bot() {
                collector.on_forget(topology.in_degree(follower), zeros);
            }
        }
    }

    StepOutcome {
        agent,
        action,
        meme: meme.id,
        reached: followers.len(),
    }
}
