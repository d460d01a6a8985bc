//! Convergence Controller
//!
//! Drives the diffusion step round by round (one round = one activation per
//! agent on average) until the average quality in human feeds stops moving.
//!
//! The stopping rule is a heuristic relative-change test, not a proof of
//! steady state. Repeated runs with identical parameters can stop after a
//! different number of rounds.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::analysis::average_quality;
use crate::diffusion::SimulationState;
use crate::error::{SimError, SimResult};

/// Sentinels far apart so the first check never passes
const INITIAL_OLD_QUALITY: f64 = 100.0;
const INITIAL_NEW_QUALITY: f64 = 200.0;

/// Stopping-rule parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvergenceParams {
    /// Relative-change threshold
    pub epsilon: f64,
    /// Optional cap on rounds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_rounds: Option<u64>,
    /// Include bot feeds in the quality metric
    pub include_bots: bool,
}

impl Default for ConvergenceParams {
    fn default() -> Self {
        Self {
            epsilon: 0.01,
            max_rounds: None,
            include_bots: false,
        }
    }
}

impl ConvergenceParams {
    pub fn validate(&self) -> SimResult<()> {
        if !(0.0..=1.0).contains(&self.epsilon) {
            return Err(SimError::parameter(
                "epsilon",
                self.epsilon,
                "must be within [0, 1]",
            ));
        }
        if self.max_rounds == Some(0) {
            return Err(SimError::parameter(
                "max_rounds",
                0.0,
                "must allow at least one round",
            ));
        }
        Ok(())
    }
}

/// Result of running to steady state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceOutcome {
    pub final_quality: f64,
    pub rounds: u64,
    /// False when `max_rounds` stopped the loop first
    pub converged: bool,
}

/// Relative-change test. Both values at or below zero count as converged.
pub fn has_converged(old_quality: f64, new_quality: f64, epsilon: f64) -> bool {
    let scale = old_quality.max(new_quality);
    if scale <= 0.0 {
        return true;
    }
    (new_quality - old_quality).abs() / scale <= epsilon
}

/// Run `N` activations, `N` being the number of agents
pub fn run_round<R: Rng + ?Sized>(state: &mut SimulationState, rng: &mut R) {
    for _ in 0..state.graph.agent_count() {
        state.step(rng);
    }
}

/// Run rounds until the quality metric stabilizes or `max_rounds` is hit
pub fn run<R: Rng + ?Sized>(
    state: &mut SimulationState,
    params: &ConvergenceParams,
    rng: &mut R,
) -> SimResult<ConvergenceOutcome> {
    params.validate()?;

    let mut old_quality = INITIAL_OLD_QUALITY;
    let mut new_quality = INITIAL_NEW_QUALITY;
    let mut rounds = 0u64;

    while !has_converged(old_quality, new_quality, params.epsilon) {
        if params.max_rounds.is_some_and(|cap| rounds >= cap) {
            tracing::warn!(rounds, quality = new_quality, "round cap reached before convergence");
            return Ok(ConvergenceOutcome {
                final_quality: new_quality,
                rounds,
                converged: false,
            });
        }

        run_round(state, rng);
        rounds += 1;
        old_quality = new_quality;
        new_quality = average_quality(&state.graph, params.include_bots)?;
        state.quality_series.push(new_quality);

        tracing::debug!(round = rounds, quality = new_quality, "round complete");
    }

    tracing::info!(rounds, quality = new_quality, "reached steady state");
    Ok(ConvergenceOutcome {
        final_quality: new_quality,
        rounds,
        converged: true,
    })
}

/// Run a fixed number of rounds, returning the quality after each one
pub fn timeline<R: Rng + ?Sized>(
    state: &mut SimulationState,
    rounds: u64,
    include_bots: bool,
    rng: &mut R,
) -> SimResult<Vec<f64>> {
    let mut series = Vec::with_capacity(rounds as usize);
    for _ in 0..rounds {
        run_round(state, rng);
        let quality = average_quality(&state.graph, include_bots)?;
        state.quality_series.push(quality);
        series.push(quality);
    }
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diffusion::DiffusionParams;
    use crate::social::SocialGraph;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn ring(n: usize, bots: &[usize]) -> SocialGraph {
        let flags: Vec<bool> = (0..n).map(|i| bots.contains(&i)).collect();
        let edges = (0..n).flat_map(|i| [(i, (i + 1) % n), (i, (i + 2) % n)]);
        SocialGraph::from_edges(&flags, edges).unwrap()
    }

    #[test]
    fn test_has_converged() {
        assert!(!has_converged(100.0, 200.0, 0.01));
        assert!(has_converged(0.3, 0.301, 0.01));
        assert!(!has_converged(0.3, 0.4, 0.01));
        assert!(has_converged(0.0, 0.0, 0.01));
        assert!(has_converged(0.0, 0.0, 0.0));
    }

    #[test]
    fn test_run_converges_on_small_ring() {
        let mut rng = SmallRng::seed_from_u64(1);
        let mut state = SimulationState::new(ring(50, &[]), DiffusionParams::default()).unwrap();
        let outcome = run(&mut state, &ConvergenceParams::default(), &mut rng).unwrap();

        assert!(outcome.converged);
        assert!(outcome.rounds >= 1);
        assert!((0.0..=1.0).contains(&outcome.final_quality));
        assert_eq!(state.quality_series.len() as u64, outcome.rounds);
        assert_eq!(state.quality_series.last(), Some(&outcome.final_quality));
    }

    #[test]
    fn test_all_bot_population_converges_immediately_to_zero() {
        let mut rng = SmallRng::seed_from_u64(2);
        let bots: Vec<usize> = (0..20).collect();
        let mut state = SimulationState::new(ring(20, &bots), DiffusionParams::default()).unwrap();
        let params = ConvergenceParams {
            include_bots: true,
            ..ConvergenceParams::default()
        };
        let outcome = run(&mut state, &params, &mut rng).unwrap();
        assert_eq!(outcome.final_quality, 0.0);
        // First round drops from the 200 sentinel to 0; second check sees 0/0
        assert_eq!(outcome.rounds, 2);
        assert!(outcome.converged);
    }

    #[test]
    fn test_round_cap() {
        let mut rng = SmallRng::seed_from_u64(3);
        let mut state = SimulationState::new(ring(30, &[]), DiffusionParams::default()).unwrap();
        let params = ConvergenceParams {
            epsilon: 0.0,
            max_rounds: Some(3),
            include_bots: false,
        };
        let outcome = run(&mut state, &params, &mut rng).unwrap();
        assert!(!outcome.converged);
        assert_eq!(outcome.rounds, 3);
    }

    #[test]
    fn test_edgeless_graph_is_degenerate() {
        let mut rng = SmallRng::seed_from_u64(4);
        let graph = SocialGraph::from_edges(&[false, false], Vec::new()).unwrap();
        let mut state = SimulationState::new(graph, DiffusionParams::default()).unwrap();
        let result = run(&mut state, &ConvergenceParams::default(), &mut rng);
        assert!(matches!(result, Err(SimError::DegenerateMetric(_))));
    }

    #[test]
    fn test_timeline_length() {
        let mut rng = SmallRng::seed_from_u64(5);
        let mut state = SimulationState::new(ring(40, &[3]), DiffusionParams::default()).unwrap();
        let series = timeline(&mut state, 6, false, &mut rng).unwrap();
        assert_eq!(series.len(), 6);
        assert!(series.iter().all(|q| (0.0..=1.0).contains(q)));
    }

    #[test]
    fn test_invalid_epsilon() {
        let params = ConvergenceParams {
            epsilon: 2.0,
            ..ConvergenceParams::default()
        };
        assert!(params.validate().is_err());
    }
}
