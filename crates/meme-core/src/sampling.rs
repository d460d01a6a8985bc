//! Sampling Without Replacement
//!
//! Uniform and weighted draws of distinct elements. The weighted variant
//! accepts zero weights: positive-weight candidates are drawn first, and
//! zero-weight candidates only fill a shortfall, uniformly.

use rand::distributions::Open01;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{SimError, SimResult};

/// Result of a sampling request
#[derive(Debug, Clone, PartialEq)]
pub struct SampleOutcome<T> {
    pub items: Vec<T>,
    /// Number of elements the caller asked for
    pub requested: usize,
}

impl<T> SampleOutcome<T> {
    /// True when the request exceeded the population and was cut down
    pub fn was_clamped(&self) -> bool {
        self.items.len() < self.requested
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

fn clamp_request(requested: usize, available: usize) -> usize {
    if requested > available {
        tracing::warn!(
            requested,
            available,
            "sample request exceeds population; clamping"
        );
        available
    } else {
        requested
    }
}

/// Uniform sample of distinct elements
pub fn sample_uniform<T, R>(elements: &[T], sample_size: usize, rng: &mut R) -> SampleOutcome<T>
where
    T: Clone,
    R: Rng + ?Sized,
{
    let take = clamp_request(sample_size, elements.len());
    SampleOutcome {
        items: elements.choose_multiple(rng, take).cloned().collect(),
        requested: sample_size,
    }
}

/// Weighted sample of distinct elements; weights may be zero.
///
/// When `sample_size` does not exceed the number of positive-weight elements,
/// only those are drawn (successive weighted draws, implemented with
/// Efraimidis–Spirakis keys). Otherwise every positive-weight element is taken
/// and the remainder is a uniform sample of the zero-weight elements.
pub fn sample_weighted_without_replacement<T, R>(
    elements: &[T],
    sample_size: usize,
    weights: &[f64],
    rng: &mut R,
) -> SimResult<SampleOutcome<T>>
where
    T: Clone,
    R: Rng + ?Sized,
{
    if elements.len() != weights.len() {
        return Err(SimError::InvalidArgument(format!(
            "{} elements but {} weights",
            elements.len(),
            weights.len()
        )));
    }
    if let Some(bad) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
        return Err(SimError::InvalidArgument(format!(
            "sampling weight {bad} is negative or not finite"
        )));
    }

    let mut positive: Vec<(&T, f64)> = Vec::new();
    let mut zeros: Vec<T> = Vec::new();
    for (element, &weight) in elements.iter().zip(weights) {
        if weight > 0.0 {
            positive.push((element, weight));
        } else {
            zeros.push(element.clone());
        }
    }

    let take = clamp_request(sample_size, elements.len());

    if take <= positive.len() {
        // Largest ln(u)/w keys are a weighted sample without replacement
        let mut keyed: Vec<(f64, &T)> = positive
            .into_iter()
            .map(|(element, weight)| {
                let u: f64 = rng.sample(Open01);
                (u.ln() / weight, element)
            })
            .collect();
        keyed.sort_by(|a, b| b.0.total_cmp(&a.0));
        let items = keyed
            .into_iter()
            .take(take)
            .map(|(_, element)| element.clone())
            .collect();
        return Ok(SampleOutcome {
            items,
            requested: sample_size,
        });
    }

    let shortfall = take - positive.len();
    let mut items: Vec<T> = positive.into_iter().map(|(e, _)| e.clone()).collect();
    items.extend(zeros.choose_multiple(rng, shortfall).cloned());
    Ok(SampleOutcome {
        items,
        requested: sample_size,
    })
}
