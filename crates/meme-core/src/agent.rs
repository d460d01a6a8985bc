//! Agents
//!
//! An agent is one account in the social graph: a role fixed at creation and
//! a bounded, recency-ordered feed of shared memes.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::meme::{Meme, MemeRef};

/// Account kind, immutable after creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Human,
    Bot,
}

impl Role {
    pub fn is_bot(self) -> bool {
        matches!(self, Role::Bot)
    }

    pub fn from_bot_flag(bot: bool) -> Self {
        if bot {
            Role::Bot
        } else {
            Role::Human
        }
    }
}

/// Recency-ordered memes visible to one agent, most recent first
#[derive(Debug, Clone, Default)]
pub struct Feed {
    memes: VecDeque<MemeRef>,
}

impl Feed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert at the front (newest position)
    pub fn push_front(&mut self, meme: MemeRef) {
        self.memes.push_front(meme);
    }

    /// Drop everything beyond `depth`, oldest first.
    ///
    /// Returns the number of zero-quality memes that were dropped.
    pub fn truncate(&mut self, depth: usize) -> usize {
        if self.memes.len() <= depth {
            return 0;
        }
        let forgotten_zeros = self
            .memes
            .range(depth..)
            .filter(|m| m.is_zero_quality())
            .count();
        self.memes.truncate(depth);
        forgotten_zeros
    }

    pub fn len(&self) -> usize {
        self.memes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Meme> + '_ {
        self.memes.iter().map(|m| m.as_ref())
    }

    /// Shared handle at `index` (0 = most recent)
    pub fn get(&self, index: usize) -> Option<&MemeRef> {
        self.memes.get(index)
    }

    pub fn clear(&mut self) {
        self.memes.clear();
    }

    /// Sum of qualities and meme count
    pub fn quality_totals(&self) -> (f64, usize) {
        (self.iter().map(|m| m.quality).sum(), self.len())
    }

    pub fn zero_quality_count(&self) -> usize {
        self.iter().filter(|m| m.is_zero_quality()).count()
    }

    /// Mean quality, `None` for an empty feed
    pub fn average_quality(&self) -> Option<f64> {
        let (total, count) = self.quality_totals();
        (count > 0).then(|| total / count as f64)
    }
}

/// One node of the social graph
#[derive(Debug, Clone)]
pub struct Agent {
    pub id: usize,
    role: Role,
    pub feed: Feed,
}

impl Agent {
    pub fn new(id: usize, role: Role) -> Self {
        Self {
            id,
            role,
            feed: Feed::new(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_bot(&self) -> bool {
        self.role.is_bot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meme::MemeId;
    use std::sync::Arc;

    fn meme(id: u64, quality: f64, fitness: f64) -> MemeRef {
        Arc::new(Meme {
            id: MemeId(id),
            quality,
            fitness,
        })
    }

    #[test]
    fn test_feed_is_most_recent_first() {
        let mut feed = Feed::new();
        feed.push_front(meme(0, 0.2, 0.2));
        feed.push_front(meme(1, 0.4, 0.4));
        let ids: Vec<u64> = feed.iter().map(|m| m.id.0).collect();
        assert_eq!(ids, vec![1, 0]);
    }

    #[test]
    fn test_truncate_drops_oldest_and_counts_zeros() {
        let mut feed = Feed::new();
        feed.push_front(meme(0, 0.0, 0.9));
        feed.push_front(meme(1, 0.0, 0.5));
        feed.push_front(meme(2, 0.7, 0.7));
        feed.push_front(meme(3, 0.1, 0.1));

        let zeros = feed.truncate(2);
        assert_eq!(zeros, 2);
        assert_eq!(feed.len(), 2);
        let ids: Vec<u64> = feed.iter().map(|m| m.id.0).collect();
        assert_eq!(ids, vec![3, 2]);

        assert_eq!(feed.truncate(5), 0);
        assert_eq!(feed.len(), 2);
    }

    #[test]
    fn test_average_quality() {
        let mut feed = Feed::new();
        assert_eq!(feed.average_quality(), None);
        feed.push_front(meme(0, 0.2, 0.2));
        feed.push_front(meme(1, 0.0, 0.6));
        assert!((feed.average_quality().unwrap() - 0.1).abs() < 1e-12);
        assert_eq!(feed.zero_quality_count(), 1);
    }

    #[test]
    fn test_role_flag() {
        assert_eq!(Role::from_bot_flag(true), Role::Bot);
        assert!(!Role::from_bot_flag(false).is_bot());
        assert_eq!(serde_json::to_string(&Role::Bot).unwrap(), r#""bot""#);
    }
}
