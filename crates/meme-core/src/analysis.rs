//! Analyses
//!
//! Read-only measurements over a social graph: the steady-state quality
//! metric, concentration of low-quality memes around hubs, and the measured
//! infiltration of empirical networks. None of these run inside the step loop
//! except [`average_quality`], which the convergence controller calls once per
//! round.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::meme::MemeId;
use crate::social::SocialGraph;

/// Mean quality over every meme in human feeds (and bot feeds if asked)
pub fn average_quality(graph: &SocialGraph, include_bots: bool) -> SimResult<f64> {
    let mut total = 0.0;
    let mut count = 0usize;
    for agent in graph.agents() {
        if include_bots || !agent.is_bot() {
            let (sum, n) = agent.feed.quality_totals();
            total += sum;
            count += n;
        }
    }
    if count == 0 {
        return Err(SimError::DegenerateMetric("measured feeds hold no memes"));
    }
    Ok(total / count as f64)
}

/// Fraction of memes in human feeds that have zero quality
pub fn average_zero_fraction(graph: &SocialGraph) -> SimResult<f64> {
    let mut zeros = 0usize;
    let mut count = 0usize;
    for agent in graph.humans() {
        zeros += agent.feed.zero_quality_count();
        count += agent.feed.len();
    }
    if count == 0 {
        return Err(SimError::DegenerateMetric("human feeds hold no memes"));
    }
    Ok(zeros as f64 / count as f64)
}

/// Gini coefficient of zero-quality memes across humans ranked by follower
/// count. Values near 1 mean low-quality content sits with a few hubs.
pub fn gini_zero_concentration(graph: &SocialGraph) -> SimResult<f64> {
    let mut humans: Vec<(usize, usize)> = graph
        .humans()
        .map(|a| (graph.follower_count(a.id), a.feed.zero_quality_count()))
        .collect();
    if humans.is_empty() {
        return Err(SimError::EmptyPopulation);
    }
    let total: usize = humans.iter().map(|&(_, zeros)| zeros).sum();
    if total == 0 {
        return Err(SimError::DegenerateMetric("no zero-quality memes in human feeds"));
    }
    humans.sort_by_key(|&(degree, _)| degree);

    let n = humans.len() as f64;
    let coefficient: f64 = humans
        .iter()
        .enumerate()
        .map(|(i, &(_, zeros))| (2.0 * (i as f64 + 1.0) - n - 1.0) * zeros as f64)
        .sum();
    Ok(coefficient / (n * total as f64))
}

/// Quality statistics for the humans sharing one follower count
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DegreeQuality {
    pub mean_quality: f64,
    pub mean_zero_count: f64,
    pub humans: usize,
}

/// Mean feed quality and mean zero-quality count per follower count.
/// Humans with empty feeds are skipped.
pub fn quality_vs_degree(graph: &SocialGraph) -> BTreeMap<usize, DegreeQuality> {
    let mut buckets: BTreeMap<usize, (f64, f64, usize)> = BTreeMap::new();
    for agent in graph.humans() {
        if let Some(quality) = agent.feed.average_quality() {
            let entry = buckets
                .entry(graph.follower_count(agent.id))
                .or_insert((0.0, 0.0, 0));
            entry.0 += quality;
            entry.1 += agent.feed.zero_quality_count() as f64;
            entry.2 += 1;
        }
    }
    buckets
        .into_iter()
        .map(|(degree, (quality, zeros, humans))| {
            (
                degree,
                DegreeQuality {
                    mean_quality: quality / humans as f64,
                    mean_zero_count: zeros / humans as f64,
                    humans,
                },
            )
        })
        .collect()
}

/// Number of bots a human follows
pub fn bot_followees(graph: &SocialGraph, human: usize) -> usize {
    graph
        .followees(human)
        .iter()
        .filter(|&&f| graph.role(f).is_bot())
        .count()
}

/// Humans that follow at least one bot
pub fn humans_following_bots(graph: &SocialGraph) -> usize {
    graph
        .humans()
        .filter(|a| bot_followees(graph, a.id) > 0)
        .count()
}

/// Bot ratio and infiltration measured on an existing graph
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeasuredInfiltration {
    pub n_bots: usize,
    pub n_humans: usize,
    /// Bots per human
    pub beta: f64,
    /// Mean fraction of bots that a human follows
    pub gamma: f64,
}

/// Measure beta and gamma. A graph without bots has gamma 0.
pub fn infiltration(graph: &SocialGraph) -> SimResult<MeasuredInfiltration> {
    let n_bots = graph.bot_count();
    let n_humans = graph.human_count();
    if n_humans == 0 {
        return Err(SimError::EmptyPopulation);
    }
    let gamma = if n_bots == 0 {
        0.0
    } else {
        let sum: f64 = graph
            .humans()
            .map(|a| bot_followees(graph, a.id) as f64 / n_bots as f64)
            .sum();
        sum / n_humans as f64
    };
    Ok(MeasuredInfiltration {
        n_bots,
        n_humans,
        beta: n_bots as f64 / n_humans as f64,
        gamma,
    })
}

/// `(followers, bot followees)` for every human: influence vs vulnerability
pub fn influence_vulnerability(graph: &SocialGraph) -> Vec<(usize, usize)> {
    graph
        .humans()
        .map(|a| (graph.follower_count(a.id), bot_followees(graph, a.id)))
        .collect()
}

/// Pearson correlation; `None` for fewer than two points or zero variance
pub fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for &(x, y) in pairs {
        cov += (x - mean_x) * (y - mean_y);
        var_x += (x - mean_x).powi(2);
        var_y += (y - mean_y).powi(2);
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

/// Mean feed quality for every agent, `None` where the feed is empty
pub fn per_agent_average_quality(graph: &SocialGraph) -> Vec<Option<f64>> {
    graph
        .agents()
        .iter()
        .map(|a| a.feed.average_quality())
        .collect()
}

/// Shannon entropy (bits) of meme identities across human feeds
pub fn meme_diversity(graph: &SocialGraph) -> SimResult<f64> {
    let mut counts: HashMap<MemeId, usize> = HashMap::new();
    let mut total = 0usize;
    for agent in graph.humans() {
        for meme in agent.feed.iter() {
            *counts.entry(meme.id).or_insert(0) += 1;
            total += 1;
        }
    }
    if total == 0 {
        return Err(SimError::DegenerateMetric("human feeds hold no memes"));
    }
    let total = total as f64;
    Ok(counts
        .values()
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.log2()
        })
        .sum())
}

/// One bin of a log-binned distribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogBin {
    pub midpoint: f64,
    pub density: f64,
}

/// Log-bin a histogram `value -> count` with bins `[base^i, base^(i+1))`.
/// Values of zero are ignored.
pub fn log_binned(histogram: &BTreeMap<u64, u64>, base: f64) -> Vec<LogBin> {
    let mut bins: BTreeMap<i64, u64> = BTreeMap::new();
    let mut total = 0u64;
    for (&value, &count) in histogram {
        if value == 0 {
            continue;
        }
        total += count;
        let bin = ((value as f64).ln() / base.ln()).floor() as i64;
        *bins.entry(bin).or_insert(0) += count;
    }
    bins.into_iter()
        .map(|(i, count)| {
            let start = base.powi(i as i32);
            let width = base.powi(i as i32 + 1) - start;
            LogBin {
                midpoint: start + width / 2.0,
                density: count as f64 / (total as f64 * width),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meme::Meme;
    use std::sync::Arc;

    fn push(graph: &mut SocialGraph, agent: usize, id: u64, quality: f64) {
        graph.agent_mut(agent).unwrap().feed.push_front(Arc::new(Meme {
            id: MemeId(id),
            quality,
            fitness: quality.max(0.5),
        }));
    }

    /// 0 and 1 follow 2; 0 follows bot 3; 1 follows 0
    fn sample_graph() -> SocialGraph {
        SocialGraph::from_edges(
            &[false, false, false, true],
            vec![(0, 2), (1, 2), (0, 3), (1, 0)],
        )
        .unwrap()
    }

    #[test]
    fn test_average_quality_excludes_bots_by_default() {
        let mut graph = sample_graph();
        push(&mut graph, 0, 0, 0.4);
        push(&mut graph, 1, 1, 0.0);
        push(&mut graph, 3, 2, 0.9);

        assert!((average_quality(&graph, false).unwrap() - 0.2).abs() < 1e-12);
        let with_bots = average_quality(&graph, true).unwrap();
        assert!((with_bots - 1.3 / 3.0).abs() < 1e-12);
        assert!((average_zero_fraction(&graph).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_empty_feeds_are_degenerate() {
        let graph = sample_graph();
        assert!(matches!(
            average_quality(&graph, false),
            Err(SimError::DegenerateMetric(_))
        ));
        assert!(average_zero_fraction(&graph).is_err());
        assert!(meme_diversity(&graph).is_err());
    }

    #[test]
    fn test_gini_concentrated_on_hub() {
        let mut graph = sample_graph();
        // Human 2 has the most followers and holds all zero-quality memes
        push(&mut graph, 2, 0, 0.0);
        push(&mut graph, 2, 1, 0.0);
        let gini = gini_zero_concentration(&graph).unwrap();
        // n = 3, hub ranked last: (2*3 - 3 - 1) * 2 / (3 * 2)
        assert!((gini - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_gini_without_zeros_is_degenerate() {
        let mut graph = sample_graph();
        push(&mut graph, 0, 0, 0.5);
        assert!(gini_zero_concentration(&graph).is_err());
    }

    #[test]
    fn test_quality_vs_degree_buckets() {
        let mut graph = sample_graph();
        push(&mut graph, 0, 0, 0.4); // 1 follower
        push(&mut graph, 1, 1, 0.0); // 0 followers
        push(&mut graph, 1, 2, 0.6);
        let buckets = quality_vs_degree(&graph);

        assert_eq!(buckets.len(), 2);
        assert!((buckets[&1].mean_quality - 0.4).abs() < 1e-12);
        assert!((buckets[&0].mean_quality - 0.3).abs() < 1e-12);
        assert_eq!(buckets[&0].mean_zero_count, 1.0);
    }

    #[test]
    fn test_infiltration_measures() {
        let graph = sample_graph();
        assert_eq!(humans_following_bots(&graph), 1);
        let measured = infiltration(&graph).unwrap();
        assert_eq!(measured.n_bots, 1);
        assert_eq!(measured.n_humans, 3);
        assert!((measured.beta - 1.0 / 3.0).abs() < 1e-12);
        assert!((measured.gamma - 1.0 / 3.0).abs() < 1e-12);

        let pairs = influence_vulnerability(&graph);
        assert_eq!(pairs, vec![(1, 1), (0, 0), (2, 0)]);
    }

    #[test]
    fn test_pearson() {
        let perfect: Vec<(f64, f64)> = (0..10).map(|i| (i as f64, 2.0 * i as f64 + 1.0)).collect();
        assert!((pearson(&perfect).unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(pearson(&[(1.0, 1.0)]), None);
        assert_eq!(pearson(&[(1.0, 1.0), (1.0, 2.0)]), None);
    }

    #[test]
    fn test_diversity_bits() {
        let mut graph = sample_graph();
        push(&mut graph, 0, 0, 0.4);
        push(&mut graph, 1, 0, 0.4);
        push(&mut graph, 1, 1, 0.2);
        push(&mut graph, 2, 1, 0.2);
        // Two memes, equally frequent
        assert!((meme_diversity(&graph).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_log_binned_densities_integrate_to_one() {
        let mut histogram = BTreeMap::new();
        histogram.insert(1, 50);
        histogram.insert(2, 20);
        histogram.insert(5, 5);
        histogram.insert(30, 1);
        let bins = log_binned(&histogram, 1.5);
        let mass: f64 = bins
            .iter()
            .map(|b| {
                // midpoint = start * (1 + base) / 2, width = start * (base - 1)
                let start = b.midpoint * 2.0 / 2.5;
                b.density * start * 0.5
            })
            .sum();
        assert!((mass - 1.0).abs() < 1e-9);
    }
}
