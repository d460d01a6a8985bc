//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use meme_core::{SweepParameter, TargetingMode};

use crate::config::SimConfig;

#[derive(Parser, Debug)]
#[command(name = "memesim")]
#[command(version)]
#[command(about = "Bot infiltration and low-quality meme diffusion on social networks", long_about = None)]
pub struct Cli {
    /// TOML configuration file (default: ./memesim.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one synthetic population to steady state
    Run {
        #[command(flatten)]
        overrides: Overrides,

        /// Attach forgotten-meme and popularity collectors
        #[arg(long)]
        collect: bool,

        /// Write a JSON run report
        #[arg(long)]
        report: Option<PathBuf>,

        /// Write the final graph with per-agent average quality
        #[arg(long)]
        export_graph: Option<PathBuf>,
    },

    /// Compare random and preferential targeting over repeated runs
    Compare {
        #[command(flatten)]
        overrides: Overrides,

        /// Append the comparison to this results table
        #[arg(long)]
        results: Option<PathBuf>,
    },

    /// Compare targeting modes across values of one parameter
    Sweep {
        /// Parameter to vary (gamma, beta, phi, mu, alpha)
        #[arg(long)]
        parameter: SweepParameter,

        /// Comma-separated values
        #[arg(long, value_delimiter = ',', required = true)]
        values: Vec<f64>,

        #[command(flatten)]
        overrides: Overrides,

        /// Results table (default: <results_dir>/<parameter>.csv)
        #[arg(long)]
        results: Option<PathBuf>,
    },

    /// Average quality after each round for a fixed number of rounds
    Timeline {
        #[arg(long, default_value_t = 100)]
        rounds: u64,

        #[command(flatten)]
        overrides: Overrides,

        /// Write the series as JSON instead of printing it
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Run a supplied network (JSON graph document) to steady state
    Empirical {
        /// Graph document with a bot flag per node
        #[arg(long)]
        graph: PathBuf,

        /// Replace the network's bots with a synthetic bot network
        #[arg(long)]
        replace_bots: bool,

        #[command(flatten)]
        overrides: Overrides,

        /// Append measured beta, gamma and quality to this results table
        #[arg(long)]
        results: Option<PathBuf>,

        /// Write the final graph with per-agent average quality
        #[arg(long)]
        export_graph: Option<PathBuf>,
    },

    /// Write a synthetic network as a JSON graph document
    Export {
        #[command(flatten)]
        overrides: Overrides,

        /// Run diffusion to steady state first and annotate average quality
        #[arg(long)]
        steady_state: bool,

        /// Output path (default: <export_dir>/network.json)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Write a default configuration file
    InitConfig {
        #[arg(long, default_value = crate::config::DEFAULT_CONFIG_PATH)]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Targeting {
    Random,
    Preferential,
}

impl From<Targeting> for TargetingMode {
    fn from(targeting: Targeting) -> Self {
        match targeting {
            Targeting::Random => TargetingMode::Random,
            Targeting::Preferential => TargetingMode::Preferential,
        }
    }
}

/// Flags that override configuration values
#[derive(Args, Debug, Clone, Default)]
pub struct Overrides {
    #[arg(long)]
    pub n_humans: Option<usize>,
    /// Bots per human
    #[arg(long)]
    pub beta: Option<f64>,
    /// Probability that a human follows a given bot
    #[arg(long)]
    pub gamma: Option<f64>,
    #[arg(long, value_enum)]
    pub targeting: Option<Targeting>,
    /// Network clustering probability
    #[arg(long)]
    pub p: Option<f64>,
    /// Out-degree of grown nodes
    #[arg(long)]
    pub k: Option<usize>,
    /// Feed depth
    #[arg(long)]
    pub alpha: Option<usize>,
    /// Probability of posting a new meme
    #[arg(long)]
    pub mu: Option<f64>,
    /// Bot deception
    #[arg(long)]
    pub phi: Option<f64>,
    /// Convergence threshold
    #[arg(long)]
    pub epsilon: Option<f64>,
    #[arg(long)]
    pub max_rounds: Option<u64>,
    #[arg(long)]
    pub n_runs: Option<usize>,
    #[arg(long)]
    pub seed: Option<u64>,
}

impl Overrides {
    pub fn apply(&self, config: &mut SimConfig) {
        if let Some(n) = self.n_humans {
            config.population.n_humans = n;
        }
        if let Some(beta) = self.beta {
            config.population.beta = beta;
        }
        if let Some(gamma) = self.gamma {
            config.population.gamma = gamma;
        }
        if let Some(targeting) = self.targeting {
            config.population.targeting = targeting.into();
        }
        if let Some(p) = self.p {
            config.network.clustering_p = p;
        }
        if let Some(k) = self.k {
            config.network.out_degree_k = k;
        }
        if let Some(alpha) = self.alpha {
            config.diffusion.alpha = alpha;
        }
        if let Some(mu) = self.mu {
            config.diffusion.mu = mu;
        }
        if let Some(phi) = self.phi {
            config.diffusion.phi = phi;
        }
        if let Some(epsilon) = self.epsilon {
            config.convergence.epsilon = epsilon;
        }
        if self.max_rounds.is_some() {
            config.convergence.max_rounds = self.max_rounds;
        }
        if let Some(n_runs) = self.n_runs {
            config.experiment.n_runs = n_runs;
        }
        if let Some(seed) = self.seed {
            config.experiment.seed = seed;
        }
    }
}
