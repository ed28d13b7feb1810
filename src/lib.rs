use rand::Rng;
use std::cmp::Ordering;

mod error;

pub mod encoding;

pub use encoding::{BinaryEncoding, Bit, Encoding, EvolvingHotspotEncoding};
pub use error::GaError;

/// A chromosome as the operators see it: genetic data behind an [`Encoding`].
///
/// Selection, crossover and mutation only ever touch the encoding. Any other
/// state a variant carries is copied across by [`Chromosome::with_encoding`].
pub trait Chromosome: Clone {
    type Gene: Clone;

    fn encoding(&self) -> &Encoding<Self::Gene>;
    fn encoding_mut(&mut self) -> &mut Encoding<Self::Gene>;

    /// Builds a sibling that keeps this chromosome's extra state around a new genome.
    fn with_encoding(&self, encoding: Encoding<Self::Gene>) -> Self;
}

/// The problem-specific quality score of a chromosome.
///
/// Nothing is cached: every call re-evaluates. Selection functions take one
/// snapshot per call, so a population is ranked consistently within a call.
pub trait Fitness<C: ?Sized> {
    fn fitness(&self, chromosome: &C) -> f64;

    /// Orders two chromosomes by fitness. NaN compares below everything.
    fn compare(&self, a: &C, b: &C) -> Ordering {
        cmp_f64_nan_last(self.fitness(a), self.fitness(b))
    }
}

impl<C: ?Sized, F> Fitness<C> for F
where
    F: Fn(&C) -> f64,
{
    fn fitness(&self, chromosome: &C) -> f64 {
        self(chromosome)
    }
}

/// The master engine trait.
pub trait Evolver<C: Chromosome> {
    /// Advances the population by one generation.
    fn step<F: Fitness<C>>(&mut self, fitness: &F) -> Result<(), GaError>;
    fn population(&self) -> &[C];
}

/// Compare two f64 values, treating NaN as less than all other values.
/// This ensures NaN fitness individuals sort to the end (lowest priority).
pub(crate) fn cmp_f64_nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Draws two distinct values uniformly from `range`.
pub(crate) fn distinct_pair<R: Rng + ?Sized>(
    rng: &mut R,
    range: std::ops::Range<usize>,
) -> (usize, usize) {
    let a = rng.random_range(range.clone());
    let mut b = rng.random_range(range.start..range.end - 1);
    if b >= a {
        b += 1;
    }
    (a.min(b), a.max(b))
}

pub mod operators {
    pub mod crossover;
    pub mod mutation;
    pub mod selection;
}

pub mod algorithms {
    pub mod generational;
}
