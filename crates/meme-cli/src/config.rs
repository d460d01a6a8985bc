//! Configuration loading for `memesim`.
//!
//! Every run parameter can come from a TOML file (`memesim.toml` by default).
//! Missing sections and keys fall back to the defaults below; command-line
//! flags override whatever the file says.

use std::path::{Path, PathBuf};

use meme_core::{
    ConvergenceParams, DiffusionParams, ExperimentConfig, NetworkParams, PopulationParams,
    TargetingMode,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Config file picked up when `--config` is not given
pub const DEFAULT_CONFIG_PATH: &str = "memesim.toml";

/// Complete simulator configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub population: PopulationConfig,
    #[serde(default)]
    pub network: NetworkParams,
    #[serde(default)]
    pub diffusion: DiffusionParams,
    #[serde(default)]
    pub convergence: ConvergenceParams,
    #[serde(default)]
    pub experiment: ExperimentSettings,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Population size and bot infiltration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    pub n_humans: usize,
    /// Bots per human
    pub beta: f64,
    /// Probability that a human follows a given bot
    pub gamma: f64,
    pub targeting: TargetingMode,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        let defaults = PopulationParams::default();
        Self {
            n_humans: defaults.n_humans,
            beta: defaults.beta,
            gamma: defaults.gamma,
            targeting: defaults.targeting,
        }
    }
}

/// Repetition and seeding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentSettings {
    /// Independent runs per targeting mode
    pub n_runs: usize,
    pub seed: u64,
}

impl Default for ExperimentSettings {
    fn default() -> Self {
        let defaults = ExperimentConfig::default();
        Self {
            n_runs: defaults.n_runs,
            seed: defaults.seed,
        }
    }
}

/// Where results land.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for results tables
    pub results_dir: PathBuf,
    /// Directory for graph and timeline JSON
    pub export_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from("results"),
            export_dir: PathBuf::from("exports"),
        }
    }
}

impl SimConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load `path` if given, else the default file if present, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn population_params(&self) -> PopulationParams {
        PopulationParams {
            n_humans: self.population.n_humans,
            beta: self.population.beta,
            gamma: self.population.gamma,
            targeting: self.population.targeting,
            network: self.network,
        }
    }

    pub fn experiment_config(&self) -> ExperimentConfig {
        ExperimentConfig {
            population: self.population_params(),
            diffusion: self.diffusion,
            convergence: self.convergence,
            n_runs: self.experiment.n_runs,
            seed: self.experiment.seed,
        }
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Generates a default configuration file content.
pub fn default_config_toml() -> String {
    r#"# memesim configuration

[population]
n_humans = 1000
beta = 0.1
gamma = 0.1
targeting = "random"

[network]
clustering_p = 0.5
out_degree_k = 3

[diffusion]
alpha = 15
mu = 0.75
phi = 1.0

[convergence]
epsilon = 0.01
# max_rounds = 5000
include_bots = false

[experiment]
n_runs = 20
seed = 42

[output]
results_dir = "results"
export_dir = "exports"
"#
    .to_string()
}
