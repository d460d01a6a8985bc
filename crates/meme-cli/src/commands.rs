//! Subcommand handlers.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use meme_core::analysis::{
    average_zero_fraction, gini_zero_concentration, humans_following_bots, infiltration,
    influence_vulnerability, log_binned, meme_diversity, pearson, quality_vs_degree,
    DegreeQuality, LogBin,
};
use meme_core::convergence::{self, ConvergenceOutcome};
use meme_core::experiment::{self, average_timeline, compare_targeting, run_network};
use meme_core::population::{compose, replace_bots};
use meme_core::{
    Collectors, SimError, SimulationState, SweepParameter, TargetingComparison, TargetingMode,
};
use meme_io::{read_graph, write_graph, EmpiricalRow, GraphDocument, ResultRow, ResultsTable};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::config::{default_config_toml, SimConfig};

/// Metrics printed and reported after a single run
#[derive(Debug, Serialize)]
struct RunSummary {
    seed: u64,
    targeting: TargetingMode,
    n_humans: usize,
    n_bots: usize,
    infiltration_edges: usize,
    humans_following_bots: usize,
    outcome: ConvergenceOutcome,
    zero_fraction: f64,
    /// None when human feeds hold no zero-quality memes
    zero_concentration_gini: Option<f64>,
    meme_diversity_bits: f64,
    influence_vulnerability_r: Option<f64>,
    quality_by_degree: BTreeMap<usize, DegreeQuality>,
    #[serde(skip_serializing_if = "Option::is_none")]
    collectors: Option<CollectorSummary>,
}

#[derive(Debug, Serialize)]
struct CollectorSummary {
    forgotten_zero_quality: u64,
    distinct_memes: usize,
    low_quality_by_humans: u64,
    low_quality_by_bots: u64,
    popularity: Vec<LogBin>,
    low_quality_popularity: Vec<LogBin>,
}

fn summarize_state(state: &SimulationState) -> Result<(f64, Option<f64>, f64, Option<f64>)> {
    let graph = &state.graph;
    let pairs: Vec<(f64, f64)> = influence_vulnerability(graph)
        .into_iter()
        .map(|(influence, vulnerability)| (influence as f64, vulnerability as f64))
        .collect();
    let gini = match gini_zero_concentration(graph) {
        Ok(gini) => Some(gini),
        Err(SimError::DegenerateMetric(_)) => None,
        Err(e) => return Err(e.into()),
    };
    Ok((
        average_zero_fraction(graph)?,
        gini,
        meme_diversity(graph)?,
        pearson(&pairs),
    ))
}

fn collector_summary(collectors: &Collectors) -> Option<CollectorSummary> {
    let forgotten = collectors.forgotten.as_ref()?;
    let popularity = collectors.popularity.as_ref()?;
    let low_quality = popularity.low_quality_totals();
    Some(CollectorSummary {
        forgotten_zero_quality: forgotten.total(),
        distinct_memes: popularity.distinct_memes(),
        low_quality_by_humans: low_quality.by_humans,
        low_quality_by_bots: low_quality.by_bots,
        popularity: log_binned(&popularity.popularity_histogram(), 2.0),
        low_quality_popularity: log_binned(&popularity.low_quality_histogram(), 2.0),
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn print_comparison(comparison: &TargetingComparison) {
    println!(
        "random:       {:.4} ± {:.4} (n={})",
        comparison.random.mean, comparison.random.stderr, comparison.random.n
    );
    println!(
        "preferential: {:.4} ± {:.4} (n={})",
        comparison.preferential.mean, comparison.preferential.stderr, comparison.preferential.n
    );
    println!(
        "ratio:        {:.4} ± {:.4}",
        comparison.ratio.mean, comparison.ratio.stderr
    );
}

pub fn run(
    config: &SimConfig,
    collect: bool,
    report: Option<&Path>,
    export_graph: Option<&Path>,
) -> Result<()> {
    let params = config.population_params();
    let seed = config.experiment.seed;
    let mut rng = SmallRng::seed_from_u64(seed);

    let composed = compose(&params, &mut rng)?;
    let humans_on_bots = humans_following_bots(&composed.graph);
    let mut state = SimulationState::new(composed.graph, config.diffusion)?;
    if collect {
        state = state.with_collectors(Collectors::none().with_forgotten().with_popularity());
    }
    let outcome = convergence::run(&mut state, &config.convergence, &mut rng)?;
    let (zero_fraction, gini, diversity, correlation) = summarize_state(&state)?;

    let summary = RunSummary {
        seed,
        targeting: params.targeting,
        n_humans: params.n_humans,
        n_bots: params.n_bots(),
        infiltration_edges: composed.infiltration_edges,
        humans_following_bots: humans_on_bots,
        outcome,
        zero_fraction,
        zero_concentration_gini: gini,
        meme_diversity_bits: diversity,
        influence_vulnerability_r: correlation,
        quality_by_degree: quality_vs_degree(&state.graph),
        collectors: collector_summary(&state.collectors),
    };

    println!(
        "{} targeting: {} humans, {} bots, {} infiltration edges",
        summary.targeting.label(),
        summary.n_humans,
        summary.n_bots,
        summary.infiltration_edges
    );
    println!(
        "average quality {:.4} after {} rounds{}",
        summary.outcome.final_quality,
        summary.outcome.rounds,
        if summary.outcome.converged { "" } else { " (round cap reached)" }
    );
    println!(
        "zero fraction {:.4}, diversity {:.2} bits",
        summary.zero_fraction, summary.meme_diversity_bits
    );
    if let Some(gini) = summary.zero_concentration_gini {
        println!("zero-quality concentration gini {gini:.4}");
    }
    if let Some(collectors) = &summary.collectors {
        println!(
            "forgotten zero-quality memes {}, low-quality selections by humans {} / bots {}",
            collectors.forgotten_zero_quality,
            collectors.low_quality_by_humans,
            collectors.low_quality_by_bots
        );
    }

    if let Some(path) = report {
        write_json(path, &summary)?;
        tracing::info!(path = %path.display(), "wrote run report");
    }
    if let Some(path) = export_graph {
        write_graph(path, &GraphDocument::with_average_quality(&state.graph))?;
        tracing::info!(path = %path.display(), "wrote quality graph");
    }
    Ok(())
}

pub fn compare(config: &SimConfig, results: Option<&Path>) -> Result<()> {
    let settings = config.experiment_config();
    let comparison = compare_targeting(&settings)?;
    print_comparison(&comparison);

    if let Some(path) = results {
        let point = experiment::SweepPoint {
            value: config.population.gamma,
            comparison,
        };
        ResultsTable::<ResultRow>::new(path).append(&ResultRow::from(&point))?;
    }
    Ok(())
}

pub fn sweep(
    config: &SimConfig,
    parameter: SweepParameter,
    values: &[f64],
    results: Option<&Path>,
) -> Result<()> {
    let path = results
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.output.results_dir.join(format!("{}.csv", parameter.name())));
    let table = ResultsTable::<ResultRow>::new(&path);

    experiment::sweep(&config.experiment_config(), parameter, values, |point| {
        println!("{} = {}", parameter.name(), point.value);
        print_comparison(&point.comparison);
        table.append(&ResultRow::from(point))?;
        Ok::<(), anyhow::Error>(())
    })?;

    tracing::info!(path = %path.display(), points = values.len(), "sweep finished");
    Ok(())
}

#[derive(Debug, Serialize)]
struct Timeline {
    targeting: TargetingMode,
    n_runs: usize,
    quality: Vec<f64>,
}

pub fn timeline(config: &SimConfig, rounds: u64, out: Option<&Path>) -> Result<()> {
    let settings = config.experiment_config();
    let targeting = settings.population.targeting;
    let quality = average_timeline(&settings, targeting, rounds)?;

    match out {
        Some(path) => {
            let series = Timeline {
                targeting,
                n_runs: settings.n_runs,
                quality,
            };
            write_json(path, &series)?;
            tracing::info!(path = %path.display(), rounds, "wrote timeline");
        }
        None => {
            for (round, q) in quality.iter().enumerate() {
                println!("{}\t{:.5}", round + 1, q);
            }
        }
    }
    Ok(())
}

pub fn empirical(
    config: &SimConfig,
    graph_path: &Path,
    replace: bool,
    results: Option<&Path>,
    export_graph: Option<&Path>,
) -> Result<()> {
    let document = read_graph(graph_path)
        .with_context(|| format!("reading graph {}", graph_path.display()))?;
    let mut graph = document.to_social_graph()?;
    let seed = config.experiment.seed;

    let measured = infiltration(&graph)?;
    println!(
        "network: {} humans, {} bots, beta {:.4}, gamma {:.4}",
        measured.n_humans, measured.n_bots, measured.beta, measured.gamma
    );

    if replace {
        let replacement_seed = experiment::run_seed(seed, 0, experiment::REPLACEMENT_STREAM);
        let mut rng = SmallRng::seed_from_u64(replacement_seed);
        graph = replace_bots(&graph, config.population.gamma, &config.network, &mut rng)?.graph;
        tracing::info!(
            gamma = config.population.gamma,
            "replaced bots with a synthetic bot network"
        );
    }

    let (report, state) = run_network(graph, config.diffusion, &config.convergence, seed)?;
    println!(
        "average quality {:.4} after {} rounds (measured gamma {:.4})",
        report.outcome.final_quality, report.outcome.rounds, report.infiltration.gamma
    );

    if let Some(path) = results {
        let row = EmpiricalRow::new(&report.infiltration, report.outcome.final_quality);
        ResultsTable::<EmpiricalRow>::new(path).append(&row)?;
    }
    if let Some(path) = export_graph {
        write_graph(path, &GraphDocument::with_average_quality(&state.graph))?;
    }
    Ok(())
}

pub fn export(config: &SimConfig, steady_state: bool, out: Option<&Path>) -> Result<()> {
    let path = out
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.output.export_dir.join("network.json"));
    let mut rng = SmallRng::seed_from_u64(config.experiment.seed);
    let composed = compose(&config.population_params(), &mut rng)?;

    let document = if steady_state {
        let mut state = SimulationState::new(composed.graph, config.diffusion)?;
        convergence::run(&mut state, &config.convergence, &mut rng)?;
        GraphDocument::with_average_quality(&state.graph)
    } else {
        GraphDocument::from_graph(&composed.graph)
    };

    write_graph(&path, &document)?;
    println!(
        "wrote {} nodes and {} edges to {}",
        document.nodes.len(),
        document.edges.len(),
        path.display()
    );
    Ok(())
}

pub fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    fs::write(path, default_config_toml())
        .with_context(|| format!("writing {}", path.display()))?;
    println!("wrote {}", path.display());
    Ok(())
}
