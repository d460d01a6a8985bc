//! memesim
//!
//! Simulates how bots infiltrating a social network degrade the quality of
//! the content humans see, and compares random with preferential targeting.
//!
//! # Commands
//!
//! - `run` - One population to steady state, with metrics
//! - `compare` - Random vs preferential targeting over repeated runs
//! - `sweep` - The comparison across values of one parameter
//! - `timeline` - Quality after each round, averaged over runs
//! - `empirical` - Run a supplied network
//! - `export` - Write a synthetic network as JSON
//! - `init-config` - Write a default `memesim.toml`

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;

use cli::{Cli, Command};
use config::SimConfig;

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli, overrides: &cli::Overrides) -> Result<SimConfig> {
    let mut config = SimConfig::load(cli.config.as_deref()).context("loading configuration")?;
    overrides.apply(&mut config);
    config
        .experiment_config()
        .validate()
        .context("invalid run parameters")?;
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Command::Run {
            overrides,
            collect,
            report,
            export_graph,
        } => {
            let config = load_config(&cli, overrides)?;
            commands::run(&config, *collect, report.as_deref(), export_graph.as_deref())
        }
        Command::Compare { overrides, results } => {
            let config = load_config(&cli, overrides)?;
            commands::compare(&config, results.as_deref())
        }
        Command::Sweep {
            parameter,
            values,
            overrides,
            results,
        } => {
            let config = load_config(&cli, overrides)?;
            commands::sweep(&config, *parameter, values, results.as_deref())
        }
        Command::Timeline {
            rounds,
            overrides,
            out,
        } => {
            let config = load_config(&cli, overrides)?;
            commands::timeline(&config, *rounds, out.as_deref())
        }
        Command::Empirical {
            graph,
            replace_bots,
            overrides,
            results,
            export_graph,
        } => {
            let config = load_config(&cli, overrides)?;
            commands::empirical(
                &config,
                graph,
                *replace_bots,
                results.as_deref(),
                export_graph.as_deref(),
            )
        }
        Command::Export {
            overrides,
            steady_state,
            out,
        } => {
            let config = load_config(&cli, overrides)?;
            commands::export(&config, *steady_state, out.as_deref())
        }
        Command::InitConfig { path, force } => commands::init_config(path, *force),
    }
}
