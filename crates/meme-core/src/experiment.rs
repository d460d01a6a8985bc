//! Experiments
//!
//! Repeated independent runs, summarized as mean and standard error. Runs are
//! embarrassingly parallel: each one owns its graph, meme factory, collectors
//! and a `SmallRng` derived from the base seed, so results are reproducible
//! regardless of how rayon schedules them.

use rand::rngs::SmallRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::analysis::{infiltration, MeasuredInfiltration};
use crate::convergence::{self, ConvergenceOutcome, ConvergenceParams};
use crate::diffusion::{DiffusionParams, SimulationState};
use crate::error::{SimError, SimResult};
use crate::population::{compose, PopulationParams, TargetingMode};
use crate::social::SocialGraph;

/// Everything needed to repeat a synthetic experiment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub population: PopulationParams,
    pub diffusion: DiffusionParams,
    pub convergence: ConvergenceParams,
    /// Independent runs per targeting mode
    pub n_runs: usize,
    pub seed: u64,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            population: PopulationParams::default(),
            diffusion: DiffusionParams::default(),
            convergence: ConvergenceParams::default(),
            n_runs: 20,
            seed: 42,
        }
    }
}

impl ExperimentConfig {
    pub fn validate(&self) -> SimResult<()> {
        if self.n_runs == 0 {
            return Err(SimError::parameter("n_runs", 0.0, "at least one run is required"));
        }
        self.population.validate()?;
        self.diffusion.validate()?;
        self.convergence.validate()
    }
}

/// Stream used to rewire bots into a supplied network
pub const REPLACEMENT_STREAM: u64 = 2;

/// Seed for run `run` of stream `stream` (one stream per targeting mode).
///
/// Each coordinate passes through a splitmix64 finalizer, so nearby base
/// seeds do not share runs and streams never alias each other's runs.
pub fn run_seed(base: u64, run: u64, stream: u64) -> u64 {
    splitmix64(splitmix64(splitmix64(base) ^ run) ^ stream)
}

fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn stream_of(targeting: TargetingMode) -> u64 {
    match targeting {
        TargetingMode::Random => 0,
        TargetingMode::Preferential => 1,
    }
}

/// Outcome of one synthetic run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub seed: u64,
    pub targeting: TargetingMode,
    pub infiltration_edges: usize,
    pub outcome: ConvergenceOutcome,
}

/// Compose a fresh population and run it to steady state
pub fn run_once(
    config: &ExperimentConfig,
    targeting: TargetingMode,
    seed: u64,
) -> SimResult<RunReport> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let population = config.population.with_targeting(targeting);
    let composed = compose(&population, &mut rng)?;
    let mut state = SimulationState::new(composed.graph, config.diffusion)?;
    let outcome = convergence::run(&mut state, &config.convergence, &mut rng)?;

    tracing::info!(
        seed,
        targeting = targeting.label(),
        rounds = outcome.rounds,
        quality = outcome.final_quality,
        "run finished"
    );
    Ok(RunReport {
        seed,
        targeting,
        infiltration_edges: composed.infiltration_edges,
        outcome,
    })
}

/// Mean and standard error of a sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub mean: f64,
    /// Sample standard deviation over sqrt(n); 0 for a single value
    pub stderr: f64,
    pub n: usize,
}

impl Summary {
    /// Summarize `values`. An empty sample yields NaN statistics.
    pub fn of(values: &[f64]) -> Self {
        let n = values.len();
        if n == 0 {
            return Self {
                mean: f64::NAN,
                stderr: f64::NAN,
                n,
            };
        }
        let mean = values.iter().sum::<f64>() / n as f64;
        let stderr = if n < 2 {
            0.0
        } else {
            let variance =
                values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
            variance.sqrt() / (n as f64).sqrt()
        };
        Self { mean, stderr, n }
    }
}

/// Random vs preferential targeting under the same parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetingComparison {
    pub random: Summary,
    pub preferential: Summary,
    /// Per-run preferential / random quality ratio
    pub ratio: Summary,
}

/// Run `n_runs` runs per targeting mode in parallel and summarize them
pub fn compare_targeting(config: &ExperimentConfig) -> SimResult<TargetingComparison> {
    config.validate()?;

    let pairs: Vec<(f64, f64)> = (0..config.n_runs as u64)
        .into_par_iter()
        .map(|run| -> SimResult<(f64, f64)> {
            let random = run_once(
                config,
                TargetingMode::Random,
                run_seed(config.seed, run, stream_of(TargetingMode::Random)),
            )?;
            let preferential = run_once(
                config,
                TargetingMode::Preferential,
                run_seed(config.seed, run, stream_of(TargetingMode::Preferential)),
            )?;
            Ok((random.outcome.final_quality, preferential.outcome.final_quality))
        })
        .collect::<SimResult<Vec<_>>>()?;

    let random: Vec<f64> = pairs.iter().map(|p| p.0).collect();
    let preferential: Vec<f64> = pairs.iter().map(|p| p.1).collect();
    let ratios: Vec<f64> = pairs
        .iter()
        .filter(|(r, _)| *r > 0.0)
        .map(|(r, p)| p / r)
        .collect();
    if ratios.len() < pairs.len() {
        tracing::warn!(
            skipped = pairs.len() - ratios.len(),
            "runs with zero random-targeting quality left out of the ratio"
        );
    }

    Ok(TargetingComparison {
        random: Summary::of(&random),
        preferential: Summary::of(&preferential),
        ratio: Summary::of(&ratios),
    })
}

/// Parameter varied by a sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepParameter {
    Gamma,
    Beta,
    Phi,
    Mu,
    Alpha,
}

impl SweepParameter {
    pub fn name(self) -> &'static str {
        match self {
            SweepParameter::Gamma => "gamma",
            SweepParameter::Beta => "beta",
            SweepParameter::Phi => "phi",
            SweepParameter::Mu => "mu",
            SweepParameter::Alpha => "alpha",
        }
    }

    /// Return a copy of `config` with this parameter set to `value`
    pub fn apply(self, config: &ExperimentConfig, value: f64) -> SimResult<ExperimentConfig> {
        let mut config = *config;
        match self {
            SweepParameter::Gamma => config.population.gamma = value,
            SweepParameter::Beta => config.population.beta = value,
            SweepParameter::Phi => config.diffusion.phi = value,
            SweepParameter::Mu => config.diffusion.mu = value,
            SweepParameter::Alpha => {
                if value < 1.0 || value.fract() != 0.0 {
                    return Err(SimError::parameter(
                        "alpha",
                        value,
                        "feed depth must be a positive integer",
                    ));
                }
                config.diffusion.alpha = value as usize;
            }
        }
        config.validate()?;
        Ok(config)
    }
}

impl std::str::FromStr for SweepParameter {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gamma" => Ok(SweepParameter::Gamma),
            "beta" => Ok(SweepParameter::Beta),
            "phi" => Ok(SweepParameter::Phi),
            "mu" => Ok(SweepParameter::Mu),
            "alpha" => Ok(SweepParameter::Alpha),
            other => Err(SimError::InvalidArgument(format!(
                "unknown sweep parameter `{other}`"
            ))),
        }
    }
}

/// One sweep value and its comparison
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub value: f64,
    pub comparison: TargetingComparison,
}

/// Compare targeting modes for each value of `parameter`.
///
/// Points are handed to `on_point` as they complete so callers can persist
/// partial results; an error from `on_point` stops the sweep.
pub fn sweep<F, E>(
    config: &ExperimentConfig,
    parameter: SweepParameter,
    values: &[f64],
    mut on_point: F,
) -> Result<Vec<SweepPoint>, E>
where
    F: FnMut(&SweepPoint) -> Result<(), E>,
    E: From<SimError>,
{
    let mut points = Vec::with_capacity(values.len());
    for &value in values {
        let point_config = parameter.apply(config, value)?;
        let _span = tracing::info_span!("sweep", parameter = parameter.name(), value).entered();
        let comparison = compare_targeting(&point_config)?;
        let point = SweepPoint { value, comparison };
        on_point(&point)?;
        points.push(point);
    }
    Ok(points)
}

/// Quality after each of `rounds` rounds, averaged over `n_runs` runs
pub fn average_timeline(
    config: &ExperimentConfig,
    targeting: TargetingMode,
    rounds: u64,
) -> SimResult<Vec<f64>> {
    config.validate()?;
    let stream = stream_of(targeting);
    let series: Vec<Vec<f64>> = (0..config.n_runs as u64)
        .into_par_iter()
        .map(|run| -> SimResult<Vec<f64>> {
            let mut rng = SmallRng::seed_from_u64(run_seed(config.seed, run, stream));
            let composed = compose(&config.population.with_targeting(targeting), &mut rng)?;
            let mut state = SimulationState::new(composed.graph, config.diffusion)?;
            convergence::timeline(&mut state, rounds, config.convergence.include_bots, &mut rng)
        })
        .collect::<SimResult<Vec<_>>>()?;

    Ok((0..rounds as usize)
        .map(|round| {
            let values: Vec<f64> = series.iter().map(|s| s[round]).collect();
            Summary::of(&values).mean
        })
        .collect())
}

/// Result of simulating a supplied (e.g. empirical) network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmpiricalReport {
    pub infiltration: MeasuredInfiltration,
    pub outcome: ConvergenceOutcome,
}

/// Run a supplied network to steady state; beta and gamma are measured
pub fn run_network(
    mut graph: SocialGraph,
    diffusion: DiffusionParams,
    params: &ConvergenceParams,
    seed: u64,
) -> SimResult<(EmpiricalReport, SimulationState)> {
    let measured = infiltration(&graph)?;
    graph.clear_feeds();
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut state = SimulationState::new(graph, diffusion)?;
    let outcome = convergence::run(&mut state, params, &mut rng)?;
    Ok((
        EmpiricalReport {
            infiltration: measured,
            outcome,
        },
        state,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> ExperimentConfig {
        ExperimentConfig {
            population: PopulationParams {
                n_humans: 100,
                ..PopulationParams::default()
            },
            convergence: ConvergenceParams {
                max_rounds: Some(200),
                ..ConvergenceParams::default()
            },
            n_runs: 3,
            seed: 7,
            ..ExperimentConfig::default()
        }
    }

    #[test]
    fn test_summary() {
        let summary = Summary::of(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(summary.mean, 2.5);
        let expected = (5.0f64 / 3.0).sqrt() / 2.0;
        assert!((summary.stderr - expected).abs() < 1e-12);
        assert_eq!(Summary::of(&[3.0]).stderr, 0.0);
        assert!(Summary::of(&[]).mean.is_nan());
    }

    #[test]
    fn test_run_seeds_do_not_overlap_across_bases_or_streams() {
        let mut seen = std::collections::HashSet::new();
        for base in [42u64, 43, 44, 46] {
            for run in 0..50 {
                for stream in [0, 1, REPLACEMENT_STREAM] {
                    assert!(
                        seen.insert(run_seed(base, run, stream)),
                        "seed reused at base {base} run {run} stream {stream}"
                    );
                }
            }
        }
        assert_eq!(run_seed(42, 3, 1), run_seed(42, 3, 1));
    }

    #[test]
    fn test_nearby_base_seeds_give_independent_runs() {
        let config = small_config();
        let quality = |base: u64| -> Vec<f64> {
            (0..3)
                .map(|run| {
                    run_once(&config, TargetingMode::Random, run_seed(base, run, 0))
                        .unwrap()
                        .outcome
                        .final_quality
                })
                .collect()
        };
        let a = quality(42);
        let b = quality(44);
        assert_ne!(a[1], b[0]);
        assert_ne!(a[2], b[1]);
    }

    #[test]
    fn test_run_once_is_reproducible() {
        let config = small_config();
        let a = run_once(&config, TargetingMode::Random, 99).unwrap();
        let b = run_once(&config, TargetingMode::Random, 99).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_compare_targeting_summaries() {
        let comparison = compare_targeting(&small_config()).unwrap();
        assert_eq!(comparison.random.n, 3);
        assert_eq!(comparison.preferential.n, 3);
        assert!((0.0..=1.0).contains(&comparison.random.mean));
        assert!((0.0..=1.0).contains(&comparison.preferential.mean));
        assert!(comparison.ratio.mean > 0.0);
    }

    #[test]
    fn test_compare_is_deterministic_under_parallelism() {
        let config = small_config();
        assert_eq!(
            compare_targeting(&config).unwrap(),
            compare_targeting(&config).unwrap()
        );
    }

    #[test]
    fn test_sweep_parameter_apply() {
        let config = small_config();
        let swept = SweepParameter::Gamma.apply(&config, 0.5).unwrap();
        assert_eq!(swept.population.gamma, 0.5);
        assert!(SweepParameter::Gamma.apply(&config, 1.5).is_err());
        assert!(SweepParameter::Alpha.apply(&config, 2.5).is_err());
        assert_eq!(SweepParameter::Alpha.apply(&config, 5.0).unwrap().diffusion.alpha, 5);
        assert_eq!("phi".parse::<SweepParameter>().unwrap(), SweepParameter::Phi);
        assert!("theta".parse::<SweepParameter>().is_err());
    }

    #[test]
    fn test_sweep_reports_each_point() {
        let mut config = small_config();
        config.n_runs = 2;
        let mut seen = Vec::new();
        let points = sweep(&config, SweepParameter::Gamma, &[0.01, 0.1], |p| {
            seen.push(p.value);
            Ok::<(), SimError>(())
        })
        .unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(seen, vec![0.01, 0.1]);
    }

    #[test]
    fn test_average_timeline() {
        let config = small_config();
        let series = average_timeline(&config, TargetingMode::Preferential, 4).unwrap();
        assert_eq!(series.len(), 4);
        assert!(series.iter().all(|q| (0.0..=1.0).contains(q)));
    }

    #[test]
    fn test_run_network_measures_infiltration() {
        let mut rng = SmallRng::seed_from_u64(3);
        let composed = compose(&small_config().population, &mut rng).unwrap();
        let (report, state) = run_network(
            composed.graph,
            DiffusionParams::default(),
            &ConvergenceParams::default(),
            5,
        )
        .unwrap();
        assert_eq!(report.infiltration.n_humans, 100);
        assert_eq!(report.infiltration.n_bots, 10);
        assert!((report.infiltration.beta - 0.1).abs() < 1e-12);
        assert!(report.outcome.converged);
        assert!(state.graph.max_feed_len() <= DiffusionParams::default().alpha);
    }

    #[test]
    fn test_invalid_config() {
        let mut config = small_config();
        config.n_runs = 0;
        assert!(compare_targeting(&config).is_err());
    }
}
