//! Memes and the Meme Factory
//!
//! A meme carries a quality (truthfulness proxy) and a fitness (virality
//! proxy). Fitness is drawn by inverse transform sampling from a density that
//! grows with fitness; the exponent depends on the author's role and on the
//! deception parameter `phi`.

use std::sync::Arc;

use rand::distributions::Open01;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::agent::Role;

/// Creation-order identifier, unique within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MemeId(pub u64);

/// Immutable unit of content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meme {
    pub id: MemeId,
    /// 0.0 for bot memes, equal to fitness for human memes
    pub quality: f64,
    /// In (0, 1)
    pub fitness: f64,
}

impl Meme {
    /// Whether this meme carries no quality at all
    pub fn is_zero_quality(&self) -> bool {
        self.quality == 0.0
    }
}

/// Shared handle stored in feeds. Many feeds hold the same meme.
pub type MemeRef = Arc<Meme>;

/// Inverse-CDF fitness draw for the given role.
///
/// `u` must lie in (0, 1). Humans use exponent `1 + phi`, bots `1 + 1/phi`.
pub fn fitness_from_uniform(u: f64, role: Role, phi: f64) -> f64 {
    let exponent = match role {
        Role::Human => 1.0 + phi,
        Role::Bot => 1.0 + 1.0 / phi,
    };
    1.0 - (1.0 - u).powf(1.0 / exponent)
}

/// Creates memes and hands out creation-order identifiers.
///
/// Each run owns its own factory, so identifiers never leak across runs.
#[derive(Debug, Clone, Default)]
pub struct MemeFactory {
    next_id: u64,
}

impl MemeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw a new meme for an author with the given role.
    ///
    /// `phi` must be finite and at least 1, as `DiffusionParams::validate`
    /// enforces; below that the bot exponent blows up and fitness leaves (0, 1).
    pub fn create<R: Rng + ?Sized>(&mut self, role: Role, phi: f64, rng: &mut R) -> Meme {
        debug_assert!(
            phi.is_finite() && phi >= 1.0,
            "deception phi must be finite and >= 1, got {phi}"
        );
        let u: f64 = rng.sample(Open01);
        let fitness = fitness_from_uniform(u, role, phi);
        let quality = match role {
            Role::Human => fitness,
            Role::Bot => 0.0,
        };
        let id = MemeId(self.next_id);
        self.next_id += 1;
        Meme { id, quality, fitness }
    }

    /// Number of memes created since the last reset
    pub fn created(&self) -> u64 {
        self.next_id
    }

    pub fn reset(&mut self) {
        self.next_id = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_bot_meme_has_zero_quality() {
        let mut rng = SmallRng::seed_from_u64(7);
        let mut factory = MemeFactory::new();
        for _ in 0..1000 {
            let meme = factory.create(Role::Bot, 1.0, &mut rng);
            assert_eq!(meme.quality, 0.0);
            assert!(meme.fitness > 0.0 && meme.fitness < 1.0);
        }
    }

    #[test]
    fn test_human_meme_quality_equals_fitness() {
        let mut rng = SmallRng::seed_from_u64(8);
        let mut factory = MemeFactory::new();
        for _ in 0..1000 {
            let meme = factory.create(Role::Human, 3.0, &mut rng);
            assert_eq!(meme.quality, meme.fitness);
        }
    }

    #[test]
    fn test_ids_increase_and_reset() {
        let mut rng = SmallRng::seed_from_u64(9);
        let mut factory = MemeFactory::new();
        let a = factory.create(Role::Human, 1.0, &mut rng);
        let b = factory.create(Role::Bot, 1.0, &mut rng);
        assert!(b.id > a.id);
        assert_eq!(factory.created(), 2);

        factory.reset();
        let c = factory.create(Role::Human, 1.0, &mut rng);
        assert_eq!(c.id, MemeId(0));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "deception phi must be finite and >= 1")]
    fn test_create_rejects_phi_below_one() {
        let mut rng = SmallRng::seed_from_u64(10);
        MemeFactory::new().create(Role::Bot, 0.0, &mut rng);
    }

    #[test]
    fn test_fitness_transform() {
        // phi = 1: both roles use exponent 2
        let f = fitness_from_uniform(0.75, Role::Bot, 1.0);
        assert!((f - 0.5).abs() < 1e-12);
        let g = fitness_from_uniform(0.75, Role::Human, 1.0);
        assert!((f - g).abs() < 1e-12);

        // Larger phi pushes bot fitness up and human fitness down
        let bot = fitness_from_uniform(0.5, Role::Bot, 4.0);
        let human = fitness_from_uniform(0.5, Role::Human, 4.0);
        assert!(bot > human);
    }

    #[test]
    fn test_bot_fitness_matches_analytic_cdf() {
        // With phi = 1, P(fitness <= x) = 1 - (1 - x)^2
        let mut rng = SmallRng::seed_from_u64(1234);
        let mut factory = MemeFactory::new();
        let n = 20_000;
        let samples: Vec<f64> = (0..n)
            .map(|_| factory.create(Role::Bot, 1.0, &mut rng).fitness)
            .collect();

        for &x in &[0.1, 0.25, 0.5, 0.75, 0.9] {
            let empirical = samples.iter().filter(|&&f| f <= x).count() as f64 / n as f64;
            let analytic = 1.0 - (1.0 - x) * (1.0 - x);
            assert!(
                (empirical - analytic).abs() < 0.02,
                "cdf mismatch at {x}: empirical {empirical}, analytic {analytic}"
            );
        }
    }
}
