//! Parent selection strategies.
//!
//! Each strategy turns a population and a [`Fitness`] into mating pressure.
//! Pairing strategies return `size / 2` pairs of references into the
//! population (`size` defaults to the population length); [`elitism`]
//! returns a flat list of survivors instead.
//!
//! Fitness is evaluated once per call, in population order, and that
//! snapshot drives every draw of the call.
//!
//! | Strategy | Weight of individual `i` | Sampling |
//! |----------|--------------------------|----------|
//! | [`roulette_wheel`] | `f_i` | independent draws |
//! | [`stochastic_universal`] | `f_i` | evenly spaced pointers, one sweep |
//! | [`sigma_scaling`] | `1 + (f_i - mean) / 2σ`, floored at `0.07` | independent draws |
//! | [`rank`] | linear in rank, `max` down to `2 - max` | evenly spaced pointers |
//! | [`tournament`] | binary tournament won by the fitter with `selection_bias` | independent |
//! | [`boltzmann`] | `exp(f_i / T(t))` | independent draws |

use crate::error::check_probability;
use crate::{Fitness, GaError, cmp_f64_nan_last};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::instrument;

/// Weight given to individuals whose sigma-scaled weight is not positive.
pub const SIGMA_FLOOR: f64 = 0.07;

/// A borrowed pair of parents.
pub type Pair<'a, C> = (&'a C, &'a C);

/// Resolves `size` and takes the fitness snapshot.
fn prepare<C, F>(
    population: &[C],
    fitness: &F,
    size: Option<usize>,
) -> Result<(usize, Vec<f64>), GaError>
where
    F: Fitness<C> + ?Sized,
{
    let size = size.unwrap_or(population.len());
    if size > 0 && population.is_empty() {
        return Err(GaError::InvalidConfiguration(format!(
            "cannot select {size} individuals from an empty population"
        )));
    }
    let scores = population.iter().map(|c| fitness.fitness(c)).collect();
    Ok((size, scores))
}

/// Returns the total of `weights` after checking they are usable as probabilities.
fn validate_weights(weights: &[f64]) -> Result<f64, GaError> {
    let mut total = 0.0;
    for (index, &weight) in weights.iter().enumerate() {
        if weight.is_nan() || weight < 0.0 {
            return Err(GaError::InvalidWeight(format!(
                "weight {weight} at index {index} must be a non-negative number"
            )));
        }
        if weight.is_infinite() {
            return Err(GaError::NumericOverflow(format!(
                "weight at index {index} is infinite"
            )));
        }
        total += weight;
    }
    if total.is_infinite() {
        return Err(GaError::NumericOverflow(
            "sum of selection weights overflowed".to_string(),
        ));
    }
    if total <= 0.0 {
        return Err(GaError::InvalidWeight(
            "selection weights sum to zero".to_string(),
        ));
    }
    Ok(total)
}

/// Cumulative weights over which points in `[0, total)` are located.
struct Wheel {
    cumulative: Vec<f64>,
    total: f64,
    /// Last slot with a positive weight; rounding never lands past it.
    last_positive: usize,
}

impl Wheel {
    fn new(weights: &[f64]) -> Result<Self, GaError> {
        let total = validate_weights(weights)?;
        let cumulative: Vec<f64> = weights
            .iter()
            .scan(0.0, |acc, &w| {
                *acc += w;
                Some(*acc)
            })
            .collect();
        let last_positive = weights.iter().rposition(|&w| w > 0.0).unwrap_or(0);
        Ok(Self {
            cumulative,
            total,
            last_positive,
        })
    }

    fn locate(&self, point: f64) -> usize {
        self.cumulative
            .partition_point(|&c| c <= point)
            .min(self.last_positive)
    }

    fn spin<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        self.locate(rng.random::<f64>() * self.total)
    }
}

/// Draws `pairs` parent pairs with replacement, each parent weighted by `weights`.
fn weighted_pairs<'a, C, R>(
    population: &'a [C],
    weights: &[f64],
    pairs: usize,
    rng: &mut R,
) -> Result<Vec<Pair<'a, C>>, GaError>
where
    R: Rng + ?Sized,
{
    let wheel = Wheel::new(weights)?;
    Ok((0..pairs)
        .map(|_| {
            let a = wheel.spin(rng);
            let b = wheel.spin(rng);
            (&population[a], &population[b])
        })
        .collect())
}

/// Stochastic universal sampling over arbitrary weights.
///
/// The population is shuffled once, `size` pointers spaced `total / size`
/// apart are laid from a random offset, and a single sweep collects the
/// individual under each pointer. Consecutive hits form a pair.
fn universal_pairs<'a, C, R>(
    population: &'a [C],
    weights: &[f64],
    size: usize,
    rng: &mut R,
) -> Result<Vec<Pair<'a, C>>, GaError>
where
    R: Rng + ?Sized,
{
    validate_weights(weights)?;
    if size == 0 {
        return Ok(Vec::new());
    }

    let mut shuffled: Vec<usize> = (0..population.len()).collect();
    shuffled.shuffle(rng);
    let shuffled_weights: Vec<f64> = shuffled.iter().map(|&i| weights[i]).collect();
    let wheel = Wheel::new(&shuffled_weights)?;

    let step = wheel.total / size as f64;
    let start = rng.random::<f64>() * step;

    let mut hits = Vec::with_capacity(size);
    let mut slot = 0;
    for k in 0..size {
        let pointer = start + k as f64 * step;
        while slot < wheel.last_positive && wheel.cumulative[slot] <= pointer {
            slot += 1;
        }
        hits.push(shuffled[slot]);
    }

    Ok(hits
        .chunks_exact(2)
        .map(|pair| (&population[pair[0]], &population[pair[1]]))
        .collect())
}

/// Fitness-proportionate selection with replacement.
///
/// Fitness values are used as weights directly, so they must be
/// non-negative and not all zero.
#[instrument(level = "debug", skip(population, fitness, rng), fields(population_size = population.len()))]
pub fn roulette_wheel<'a, C, F, R>(
    population: &'a [C],
    fitness: &F,
    size: Option<usize>,
    rng: &mut R,
) -> Result<Vec<Pair<'a, C>>, GaError>
where
    F: Fitness<C> + ?Sized,
    R: Rng + ?Sized,
{
    let (size, scores) = prepare(population, fitness, size)?;
    if population.is_empty() {
        return Ok(Vec::new());
    }
    weighted_pairs(population, &scores, size / 2, rng)
}

/// Stochastic universal sampling (Baker, 1987).
///
/// Every individual's expected number of hits is proportional to its
/// fitness, like [`roulette_wheel`], but with minimal spread around that
/// expectation.
#[instrument(level = "debug", skip(population, fitness, rng), fields(population_size = population.len()))]
pub fn stochastic_universal<'a, C, F, R>(
    population: &'a [C],
    fitness: &F,
    size: Option<usize>,
    rng: &mut R,
) -> Result<Vec<Pair<'a, C>>, GaError>
where
    F: Fitness<C> + ?Sized,
    R: Rng + ?Sized,
{
    let (size, scores) = prepare(population, fitness, size)?;
    if population.is_empty() {
        return Ok(Vec::new());
    }
    universal_pairs(population, &scores, size, rng)
}

/// Sigma-scaled weights: `1 + (f - mean) / (2σ)`.
///
/// All weights are 1 when σ is zero. Non-positive weights are raised to
/// [`SIGMA_FLOOR`]. NaN fitness is an invalid weight, as for the wheel.
pub fn sigma_weights(scores: &[f64]) -> Result<Vec<f64>, GaError> {
    if scores.is_empty() {
        return Ok(Vec::new());
    }
    if let Some(index) = scores.iter().position(|f| f.is_nan()) {
        return Err(GaError::InvalidWeight(format!(
            "fitness at index {index} is NaN"
        )));
    }
    let n = scores.len() as f64;
    let mean = scores.iter().sum::<f64>() / n;
    let sigma = (scores.iter().map(|f| (f - mean).powi(2)).sum::<f64>() / n).sqrt();
    if !mean.is_finite() || !sigma.is_finite() {
        return Err(GaError::NumericOverflow(format!(
            "fitness statistics are not finite (mean={mean}, sigma={sigma})"
        )));
    }

    Ok(scores
        .iter()
        .map(|&f| {
            if sigma == 0.0 {
                return 1.0;
            }
            let weight = 1.0 + (f - mean) / (2.0 * sigma);
            if weight > 0.0 { weight } else { SIGMA_FLOOR }
        })
        .collect())
}

/// Roulette selection on sigma-scaled weights.
///
/// Keeps selection pressure steady as the population's spread shrinks.
#[instrument(level = "debug", skip(population, fitness, rng), fields(population_size = population.len()))]
pub fn sigma_scaling<'a, C, F, R>(
    population: &'a [C],
    fitness: &F,
    size: Option<usize>,
    rng: &mut R,
) -> Result<Vec<Pair<'a, C>>, GaError>
where
    F: Fitness<C> + ?Sized,
    R: Rng + ?Sized,
{
    let (size, scores) = prepare(population, fitness, size)?;
    if population.is_empty() {
        return Ok(Vec::new());
    }
    let weights = sigma_weights(&scores)?;
    weighted_pairs(population, &weights, size / 2, rng)
}

fn check_max_expected_offspring(max: f64) -> Result<f64, GaError> {
    if (1.0..=2.0).contains(&max) {
        Ok(max)
    } else {
        Err(GaError::InvalidConfiguration(format!(
            "max_expected_offspring must be between 1.0 and 2.0, got {max}"
        )))
    }
}

/// Indices sorted by descending fitness; ties keep population order.
fn ranked_indices(scores: &[f64]) -> Vec<usize> {
    let mut ranked: Vec<usize> = (0..scores.len()).collect();
    ranked.sort_by(|&a, &b| cmp_f64_nan_last(scores[b], scores[a]));
    ranked
}

/// Linear rank weights in population order.
///
/// The best individual gets `max_expected_offspring`, the worst
/// `2 - max_expected_offspring`, and the rest are spaced evenly between.
pub fn rank_weights(scores: &[f64], max_expected_offspring: f64) -> Result<Vec<f64>, GaError> {
    let max = check_max_expected_offspring(max_expected_offspring)?;
    let min = 2.0 - max;
    let n = scores.len();

    let mut weights = vec![0.0; n];
    for (rank, index) in ranked_indices(scores).into_iter().enumerate() {
        weights[index] = if n == 1 {
            max
        } else {
            max - (max - min) * rank as f64 / (n - 1) as f64
        };
    }
    Ok(weights)
}

/// Linear rank selection, paired by stochastic universal sampling.
///
/// Only the fitness order matters, so the scale of fitness values has no
/// effect on selection pressure.
#[instrument(level = "debug", skip(population, fitness, rng), fields(population_size = population.len(), max_expected_offspring = max_expected_offspring))]
pub fn rank<'a, C, F, R>(
    population: &'a [C],
    fitness: &F,
    max_expected_offspring: f64,
    size: Option<usize>,
    rng: &mut R,
) -> Result<Vec<Pair<'a, C>>, GaError>
where
    F: Fitness<C> + ?Sized,
    R: Rng + ?Sized,
{
    check_max_expected_offspring(max_expected_offspring)?;
    let (size, scores) = prepare(population, fitness, size)?;
    if population.is_empty() {
        return Ok(Vec::new());
    }
    let weights = rank_weights(&scores, max_expected_offspring)?;
    universal_pairs(population, &weights, size, rng)
}

/// One binary tournament: two uniform draws, the fitter wins with `selection_bias`.
fn binary_tournament<R: Rng + ?Sized>(scores: &[f64], selection_bias: f64, rng: &mut R) -> usize {
    let i = rng.random_range(0..scores.len());
    let j = rng.random_range(0..scores.len());
    let (better, worse) = match cmp_f64_nan_last(scores[i], scores[j]) {
        Ordering::Less => (j, i),
        _ => (i, j),
    };
    if rng.random_bool(selection_bias) {
        better
    } else {
        worse
    }
}

/// Binary tournament selection.
///
/// `selection_bias` in `(0.5, 1]` favours the fitter contestant; `0.5`
/// removes pressure and lower values favour the weaker one.
#[instrument(level = "debug", skip(population, fitness, rng), fields(population_size = population.len(), selection_bias = selection_bias))]
pub fn tournament<'a, C, F, R>(
    population: &'a [C],
    fitness: &F,
    selection_bias: f64,
    size: Option<usize>,
    rng: &mut R,
) -> Result<Vec<Pair<'a, C>>, GaError>
where
    F: Fitness<C> + ?Sized,
    R: Rng + ?Sized,
{
    let selection_bias = check_probability("selection_bias", selection_bias)?;
    let (size, scores) = prepare(population, fitness, size)?;
    if population.is_empty() {
        return Ok(Vec::new());
    }
    Ok((0..size / 2)
        .map(|_| {
            let a = binary_tournament(&scores, selection_bias, rng);
            let b = binary_tournament(&scores, selection_bias, rng);
            (&population[a], &population[b])
        })
        .collect())
}

/// Maps a generation index to a Boltzmann temperature.
///
/// Implemented by any `Fn(usize) -> f64` and by [`Temperature`].
pub trait Schedule {
    fn temperature(&self, generation: usize) -> f64;
}

impl<M> Schedule for M
where
    M: Fn(usize) -> f64,
{
    fn temperature(&self, generation: usize) -> f64 {
        self(generation)
    }
}

/// Ready-made cooling schedules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Temperature {
    Constant(f64),
    /// `max(initial * decay^t, floor)`
    Exponential { initial: f64, decay: f64, floor: f64 },
    /// `max(initial - slope * t, floor)`
    Linear { initial: f64, slope: f64, floor: f64 },
}

impl Schedule for Temperature {
    fn temperature(&self, generation: usize) -> f64 {
        match *self {
            Temperature::Constant(t) => t,
            Temperature::Exponential {
                initial,
                decay,
                floor,
            } => {
                let exponent = i32::try_from(generation).unwrap_or(i32::MAX);
                (initial * decay.powi(exponent)).max(floor)
            }
            Temperature::Linear {
                initial,
                slope,
                floor,
            } => (initial - slope * generation as f64).max(floor),
        }
    }
}

/// Boltzmann weights `exp(f / T)` for the temperature at `generation`.
pub fn boltzmann_weights<M>(
    scores: &[f64],
    generation: usize,
    mapping: &M,
) -> Result<Vec<f64>, GaError>
where
    M: Schedule + ?Sized,
{
    let temperature = mapping.temperature(generation);
    if !(temperature.is_finite() && temperature > 0.0) {
        return Err(GaError::InvalidConfiguration(format!(
            "temperature at generation {generation} must be finite and positive, got {temperature}"
        )));
    }
    scores
        .iter()
        .enumerate()
        .map(|(index, &f)| {
            let weight = (f / temperature).exp();
            if weight.is_finite() {
                Ok(weight)
            } else {
                Err(GaError::NumericOverflow(format!(
                    "exp({f} / {temperature}) at index {index} is not finite"
                )))
            }
        })
        .collect()
}

/// Boltzmann selection at generation `generation`.
///
/// High temperatures flatten the weights; as the schedule cools, selection
/// concentrates on the fittest.
#[instrument(level = "debug", skip(population, fitness, mapping, rng), fields(population_size = population.len(), generation = generation))]
pub fn boltzmann<'a, C, F, M, R>(
    population: &'a [C],
    fitness: &F,
    generation: usize,
    mapping: &M,
    size: Option<usize>,
    rng: &mut R,
) -> Result<Vec<Pair<'a, C>>, GaError>
where
    F: Fitness<C> + ?Sized,
    M: Schedule + ?Sized,
    R: Rng + ?Sized,
{
    let (size, scores) = prepare(population, fitness, size)?;
    let weights = boltzmann_weights(&scores, generation, mapping)?;
    if population.is_empty() {
        return Ok(Vec::new());
    }
    weighted_pairs(population, &weights, size / 2, rng)
}

/// The `size` fittest individuals, best first. Ties keep population order.
#[instrument(level = "debug", skip(population, fitness), fields(population_size = population.len(), size = size))]
pub fn elitism<'a, C, F>(population: &'a [C], fitness: &F, size: usize) -> Result<Vec<&'a C>, GaError>
where
    F: Fitness<C> + ?Sized,
{
    if size > population.len() {
        return Err(GaError::InvalidConfiguration(format!(
            "elitism size {size} exceeds population size {}",
            population.len()
        )));
    }
    let scores: Vec<f64> = population.iter().map(|c| fitness.fitness(c)).collect();
    Ok(ranked_indices(&scores)
        .into_iter()
        .take(size)
        .map(|i| &population[i])
        .collect())
}

/// A pairing strategy the generational engine can drive.
///
/// `generation` is the index of the generation being bred; strategies that
/// do not depend on time ignore it.
pub trait ParentSelection<C> {
    fn select_pairs<'a, F, R>(
        &self,
        population: &'a [C],
        fitness: &F,
        generation: usize,
        size: usize,
        rng: &mut R,
    ) -> Result<Vec<Pair<'a, C>>, GaError>
    where
        F: Fitness<C> + ?Sized,
        R: Rng + ?Sized;
}

/// Time-independent pairing strategies.
///
/// ```rust
/// use holland_ga::operators::selection::Selection;
///
/// let tournament = Selection::tournament(0.75)?;
/// let rank = Selection::rank(1.5)?;
/// assert!(Selection::rank(2.5).is_err());
/// # Ok::<(), holland_ga::GaError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Selection {
    RouletteWheel,
    StochasticUniversal,
    SigmaScaling,
    Rank { max_expected_offspring: f64 },
    Tournament { selection_bias: f64 },
}

impl Selection {
    pub fn rank(max_expected_offspring: f64) -> Result<Self, GaError> {
        check_max_expected_offspring(max_expected_offspring)?;
        Ok(Selection::Rank {
            max_expected_offspring,
        })
    }

    pub fn tournament(selection_bias: f64) -> Result<Self, GaError> {
        check_probability("selection_bias", selection_bias)?;
        Ok(Selection::Tournament { selection_bias })
    }

    /// Re-checks parameters, e.g. after deserialization.
    pub fn validate(&self) -> Result<(), GaError> {
        match *self {
            Selection::Rank {
                max_expected_offspring,
            } => check_max_expected_offspring(max_expected_offspring).map(|_| ()),
            Selection::Tournament { selection_bias } => {
                check_probability("selection_bias", selection_bias).map(|_| ())
            }
            _ => Ok(()),
        }
    }
}

impl<C> ParentSelection<C> for Selection {
    fn select_pairs<'a, F, R>(
        &self,
        population: &'a [C],
        fitness: &F,
        _generation: usize,
        size: usize,
        rng: &mut R,
    ) -> Result<Vec<Pair<'a, C>>, GaError>
    where
        F: Fitness<C> + ?Sized,
        R: Rng + ?Sized,
    {
        let size = Some(size);
        match *self {
            Selection::RouletteWheel => roulette_wheel(population, fitness, size, rng),
            Selection::StochasticUniversal => stochastic_universal(population, fitness, size, rng),
            Selection::SigmaScaling => sigma_scaling(population, fitness, size, rng),
            Selection::Rank {
                max_expected_offspring,
            } => rank(population, fitness, max_expected_offspring, size, rng),
            Selection::Tournament { selection_bias } => {
                tournament(population, fitness, selection_bias, size, rng)
            }
        }
    }
}

/// Boltzmann selection driven by a temperature schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Boltzmann<M> {
    pub mapping: M,
}

impl<M: Schedule> Boltzmann<M> {
    pub fn new(mapping: M) -> Self {
        Self { mapping }
    }
}

impl<C, M: Schedule> ParentSelection<C> for Boltzmann<M> {
    fn select_pairs<'a, F, R>(
        &self,
        population: &'a [C],
        fitness: &F,
        generation: usize,
        size: usize,
        rng: &mut R,
    ) -> Result<Vec<Pair<'a, C>>, GaError>
    where
        F: Fitness<C> + ?Sized,
        R: Rng + ?Sized,
    {
        boltzmann(population, fitness, generation, &self.mapping, Some(size), rng)
    }
}
