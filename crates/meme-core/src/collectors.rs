//! Metrics Collectors
//!
//! Observers invoked by the diffusion step. They accumulate side tables and
//! never touch the graph. Every run owns its own collectors; build a fresh
//! [`Collectors`] (or call [`Collectors::reset`]) before an independent run.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::agent::Role;
use crate::meme::{Meme, MemeId};

/// Hooks called by the diffusion step
pub trait Collector {
    /// A meme was posted or reposted by an agent with `activator` role
    fn on_select(&mut self, _meme: &Meme, _activator: Role) {}

    /// A human follower with `follower_count` followers evicted
    /// `zero_quality` zero-quality memes from its feed
    fn on_forget(&mut self, _follower_count: usize, _zero_quality: usize) {}

    /// Whether eviction counts should be computed at all
    fn tracks_forgotten(&self) -> bool {
        false
    }
}

/// No-op collector
impl Collector for () {}

/// Zero-quality memes forgotten, bucketed by the follower count of the human
/// whose feed dropped them
#[derive(Debug, Clone, Default, Serialize)]
pub struct ForgottenMemes {
    pub by_follower_count: BTreeMap<usize, u64>,
}

impl ForgottenMemes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, follower_count: usize, zero_quality: usize) {
        *self.by_follower_count.entry(follower_count).or_insert(0) += zero_quality as u64;
    }

    pub fn total(&self) -> u64 {
        self.by_follower_count.values().sum()
    }

    pub fn get(&self, follower_count: usize) -> u64 {
        self.by_follower_count
            .get(&follower_count)
            .copied()
            .unwrap_or(0)
    }
}

impl Collector for ForgottenMemes {
    fn on_forget(&mut self, follower_count: usize, zero_quality: usize) {
        self.record(follower_count, zero_quality);
    }

    fn tracks_forgotten(&self) -> bool {
        true
    }
}

/// Selections of a zero-quality meme split by activator role
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SelectionSplit {
    pub by_humans: u64,
    pub by_bots: u64,
}

impl SelectionSplit {
    pub fn total(&self) -> u64 {
        self.by_humans + self.by_bots
    }
}

/// How often each meme was posted or reposted
#[derive(Debug, Clone, Default)]
pub struct PopularityTracker {
    popularity: HashMap<MemeId, u64>,
    low_quality: HashMap<MemeId, SelectionSplit>,
}

impl PopularityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, meme: &Meme, activator: Role) {
        *self.popularity.entry(meme.id).or_insert(0) += 1;
        if meme.is_zero_quality() {
            let split = self.low_quality.entry(meme.id).or_default();
            match activator {
                Role::Human => split.by_humans += 1,
                Role::Bot => split.by_bots += 1,
            }
        }
    }

    /// Selections of one meme
    pub fn selections(&self, id: MemeId) -> u64 {
        self.popularity.get(&id).copied().unwrap_or(0)
    }

    /// Human/bot split for a zero-quality meme
    pub fn low_quality_split(&self, id: MemeId) -> Option<SelectionSplit> {
        self.low_quality.get(&id).copied()
    }

    /// Number of distinct memes seen
    pub fn distinct_memes(&self) -> usize {
        self.popularity.len()
    }

    /// Histogram: selection count -> number of memes with that count
    pub fn popularity_histogram(&self) -> BTreeMap<u64, u64> {
        let mut histogram = BTreeMap::new();
        for &count in self.popularity.values() {
            *histogram.entry(count).or_insert(0) += 1;
        }
        histogram
    }

    /// Same histogram restricted to zero-quality memes
    pub fn low_quality_histogram(&self) -> BTreeMap<u64, u64> {
        let mut histogram = BTreeMap::new();
        for split in self.low_quality.values() {
            *histogram.entry(split.total()).or_insert(0) += 1;
        }
        histogram
    }

    /// Summed human/bot selections over every zero-quality meme
    pub fn low_quality_totals(&self) -> SelectionSplit {
        self.low_quality
            .values()
            .fold(SelectionSplit::default(), |acc, s| SelectionSplit {
                by_humans: acc.by_humans + s.by_humans,
                by_bots: acc.by_bots + s.by_bots,
            })
    }
}

impl Collector for PopularityTracker {
    fn on_select(&mut self, meme: &Meme, activator: Role) {
        self.record(meme, activator);
    }
}

/// The optional collectors attached to one run
#[derive(Debug, Clone, Default)]
pub struct Collectors {
    pub forgotten: Option<ForgottenMemes>,
    pub popularity: Option<PopularityTracker>,
}

impl Collectors {
    /// No collectors attached
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_forgotten(mut self) -> Self {
        self.forgotten = Some(ForgottenMemes::new());
        self
    }

    pub fn with_popularity(mut self) -> Self {
        self.popularity = Some(PopularityTracker::new());
        self
    }

    /// Clear accumulated tables, keeping the same collectors attached
    pub fn reset(&mut self) {
        if let Some(forgotten) = self.forgotten.as_mut() {
            *forgotten = ForgottenMemes::new();
        }
        if let Some(popularity) = self.popularity.as_mut() {
            *popularity = PopularityTracker::new();
        }
    }
}

impl Collector for Collectors {
    fn on_select(&mut self, meme: &Meme, activator: Role) {
        if let Some(popularity) = self.popularity.as_mut() {
            popularity.record(meme, activator);
        }
    }

    fn on_forget(&mut self, follower_count: usize, zero_quality: usize) {
        if let Some(forgotten) = self.forgotten.as_mut() {
            forgotten.record(follower_count, zero_quality);
        }
    }

    fn tracks_forgotten(&self) -> bool {
        self.forgotten.is_some()
    }
}
