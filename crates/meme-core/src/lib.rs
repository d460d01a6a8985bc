//! Meme diffusion core: bot infiltration of a social network.
//!
//! Humans and bots follow each other on a directed graph. Each agent holds a
//! bounded feed of memes; activated agents repost from their feed or author
//! something new, and the meme lands at the front of every follower's feed.
//! Bots only author zero-quality memes whose fitness is inflated by a
//! deception factor. The main output is the average quality in human feeds
//! at steady state, compared between random and preferential bot targeting.
//!
//! # Pipeline
//!
//! ```text
//! network::grow ─▶ population::compose ─▶ diffusion (steps) ─▶ convergence::run
//!                                               │
//!                                               ▼
//!                                     collectors / analysis
//! ```
//!
//! # Modules
//!
//! - [`graph`]: directed adjacency with successor and predecessor lists
//! - [`sampling`]: uniform and weighted sampling without replacement
//! - [`network`]: random-walk growth of a follow network
//! - [`population`]: human and bot subnetworks joined by infiltration edges
//! - [`meme`]: meme records and the per-run id counter
//! - [`agent`], [`social`]: agents, feeds, and the annotated graph
//! - [`diffusion`]: one activation step
//! - [`convergence`]: rounds until quality stabilizes
//! - [`collectors`]: forgotten-meme and popularity tables
//! - [`analysis`]: metrics computed from a finished run
//! - [`experiment`]: repeated parallel runs, sweeps, and summaries

pub mod agent;
pub mod analysis;
pub mod collectors;
pub mod convergence;
pub mod diffusion;
pub mod error;
pub mod experiment;
pub mod graph;
pub mod meme;
pub mod network;
pub mod population;
pub mod sampling;
pub mod social;

pub use agent::{Agent, Feed, Role};
pub use collectors::{Collector, Collectors, ForgottenMemes, PopularityTracker, SelectionSplit};
pub use convergence::{ConvergenceOutcome, ConvergenceParams};
pub use diffusion::{DiffusionParams, SimulationState, StepAction, StepOutcome};
pub use error::{SimError, SimResult};
pub use experiment::{
    compare_targeting, ExperimentConfig, RunReport, Summary, SweepParameter, SweepPoint,
    TargetingComparison,
};
pub use graph::DirectedGraph;
pub use meme::{Meme, MemeFactory, MemeId, MemeRef};
pub use network::NetworkParams;
pub use population::{ComposedPopulation, PopulationParams, TargetingMode};
pub use social::SocialGraph;
