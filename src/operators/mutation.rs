//! Mutation operators. Both work in place on a single offspring.

use crate::error::check_probability;
use crate::{Chromosome, GaError, distinct_pair};
use rand::Rng;
use tracing::instrument;

/// Flips each gene independently with probability `pm`.
///
/// One trial is drawn per position, in position order. With `inversion`,
/// position `p` addresses the expressed pair `ivalue[p]`, so the same
/// trials land on the genes as the inverted chromosome lays them out.
/// Indices are never touched. Returns the number of flipped genes.
#[instrument(level = "debug", skip(offspring, rng), fields(genome_length = offspring.encoding().len()))]
pub fn random_bit<C, R>(
    offspring: &mut C,
    pm: f64,
    inversion: bool,
    rng: &mut R,
) -> Result<usize, GaError>
where
    C: Chromosome<Gene = bool>,
    R: Rng + ?Sized,
{
    let pm = check_probability("pm", pm)?;
    let encoding = offspring.encoding_mut();
    let len = encoding.len();
    let mut flips = 0;
    for position in 0..len {
        if !rng.random_bool(pm) {
            continue;
        }
        let index = if inversion {
            encoding.order()[position]
        } else {
            position
        };
        let gene = &mut encoding.values_mut()[index];
        *gene = !*gene;
        flips += 1;
    }
    Ok(flips)
}

/// With probability `pi`, reverses the expressed segment between two distinct random positions.
///
/// The reversed bounds are returned when the inversion fired. Encodings
/// shorter than two genes are left alone.
#[instrument(level = "debug", skip(offspring, rng), fields(genome_length = offspring.encoding().len()))]
pub fn inversion<C, R>(
    offspring: &mut C,
    pi: f64,
    rng: &mut R,
) -> Result<Option<(usize, usize)>, GaError>
where
    C: Chromosome,
    R: Rng + ?Sized,
{
    let pi = check_probability("pi", pi)?;
    let len = offspring.encoding().len();
    if !rng.random_bool(pi) || len < 2 {
        return Ok(None);
    }
    let (a, b) = distinct_pair(rng, 0..len);
    invert_segment(offspring, a, b)?;
    Ok(Some((a, b)))
}

/// Reverses `ivalue[a..=b]` in place.
///
/// Only the expressed order changes; the set of `(index, gene)` pairs and
/// `values` stay the same. Applying it twice with the same bounds is a no-op.
pub fn invert_segment<C: Chromosome>(offspring: &mut C, a: usize, b: usize) -> Result<(), GaError> {
    let len = offspring.encoding().len();
    if a >= b || b >= len {
        return Err(GaError::InvalidConfiguration(format!(
            "inversion bounds {a} and {b} must satisfy a < b < {len}"
        )));
    }
    offspring.encoding_mut().order_mut()[a..=b].reverse();
    Ok(())
}
