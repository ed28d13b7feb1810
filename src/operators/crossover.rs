//! Crossover operators.
//!
//! Every operator takes two owned parents and returns exactly two offspring.
//! A single Bernoulli(`pc`) roll decides whether crossover happens at all;
//! when it does not, the parents are handed back untouched.
//!
//! Plain operators splice the genes in original order and give the
//! offspring identity order. [`single_point`] with `inversion` set splices
//! the expressed `(index, gene)` pairs instead, after aligning the second
//! parent to the first parent's order, so inversion state is inherited.

use crate::error::check_probability;
use crate::{Chromosome, Encoding, EvolvingHotspotEncoding, GaError, distinct_pair};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Genome length shared by both parents.
fn shared_length<C: Chromosome>(a: &C, b: &C) -> Result<usize, GaError> {
    let (la, lb) = (a.encoding().len(), b.encoding().len());
    if la != lb {
        return Err(GaError::InconsistentEncoding(format!(
            "cannot cross encodings of length {la} and {lb}"
        )));
    }
    Ok(la)
}

fn splice<T: Clone>(head: &[T], tail: &[T], point: usize) -> Vec<T> {
    let mut child = Vec::with_capacity(head.len());
    child.extend_from_slice(&head[..point]);
    child.extend_from_slice(&tail[point..]);
    child
}

/// Single-point crossover at a random point in `[1, len)`.
///
/// Encodings shorter than two genes have no cut point and pass through.
#[instrument(level = "debug", skip(parents, rng), fields(genome_length = parents.0.encoding().len()))]
pub fn single_point<C, R>(
    parents: (C, C),
    pc: f64,
    inversion: bool,
    rng: &mut R,
) -> Result<(C, C), GaError>
where
    C: Chromosome,
    R: Rng + ?Sized,
{
    let pc = check_probability("pc", pc)?;
    let len = shared_length(&parents.0, &parents.1)?;
    if !rng.random_bool(pc) || len < 2 {
        return Ok(parents);
    }
    let point = rng.random_range(1..len);
    single_point_at(parents, point, inversion)
}

/// Single-point crossover at a fixed `point`.
///
/// Offspring 1 takes parent 1's genes before `point` and parent 2's from
/// `point` on; offspring 2 is the complement. With `inversion`, positions
/// refer to parent 1's expressed order and both offspring inherit it.
///
/// ```rust
/// use holland_ga::BinaryEncoding;
/// use holland_ga::operators::crossover::single_point_at;
///
/// let parents = (
///     BinaryEncoding::from_bits([1, 1, 1, 1]),
///     BinaryEncoding::from_bits([0, 0, 0, 0]),
/// );
/// let (a, b) = single_point_at(parents, 2, false)?;
/// assert_eq!(a.to_string(), "1100");
/// assert_eq!(b.to_string(), "0011");
/// # Ok::<(), holland_ga::GaError>(())
/// ```
pub fn single_point_at<C: Chromosome>(
    parents: (C, C),
    point: usize,
    inversion: bool,
) -> Result<(C, C), GaError> {
    let len = shared_length(&parents.0, &parents.1)?;
    if point == 0 || point >= len {
        return Err(GaError::InvalidConfiguration(format!(
            "crossover point {point} must be in [1, {len})"
        )));
    }
    let (first, second) = parents;

    let (a, b) = if inversion {
        let master = first.encoding();
        let aligned = second.encoding().aligned_to(master)?;
        let head = master.ivalue();
        let tail = aligned.ivalue();
        (
            Encoding::from_ivalue(splice(&head, &tail, point))?,
            Encoding::from_ivalue(splice(&tail, &head, point))?,
        )
    } else {
        let head = first.encoding().values();
        let tail = second.encoding().values();
        (
            Encoding::new(splice(head, tail, point)),
            Encoding::new(splice(tail, head, point)),
        )
    };

    Ok((first.with_encoding(a), second.with_encoding(b)))
}

/// Two-point crossover: the segment between two distinct random points is swapped.
///
/// Encodings shorter than three genes cannot hold two distinct interior
/// points and pass through.
#[instrument(level = "debug", skip(parents, rng), fields(genome_length = parents.0.encoding().len()))]
pub fn two_point<C, R>(parents: (C, C), pc: f64, rng: &mut R) -> Result<(C, C), GaError>
where
    C: Chromosome,
    R: Rng + ?Sized,
{
    let pc = check_probability("pc", pc)?;
    let len = shared_length(&parents.0, &parents.1)?;
    if !rng.random_bool(pc) || len < 3 {
        return Ok(parents);
    }
    let (lo, hi) = distinct_pair(rng, 1..len);
    two_point_at(parents, lo, hi)
}

/// Swaps genes `[lo, hi)` between the parents.
pub fn two_point_at<C: Chromosome>(
    parents: (C, C),
    lo: usize,
    hi: usize,
) -> Result<(C, C), GaError> {
    let len = shared_length(&parents.0, &parents.1)?;
    if lo == 0 || lo >= hi || hi >= len {
        return Err(GaError::InvalidConfiguration(format!(
            "crossover points {lo} and {hi} must satisfy 1 <= lo < hi < {len}"
        )));
    }
    let (first, second) = parents;
    let mut a = first.encoding().values().to_vec();
    let mut b = second.encoding().values().to_vec();
    a[lo..hi].swap_with_slice(&mut b[lo..hi]);

    Ok((
        first.with_encoding(Encoding::new(a)),
        second.with_encoding(Encoding::new(b)),
    ))
}

/// Uniform crossover: each position is kept with probability `p_heads` and swapped otherwise.
#[instrument(level = "debug", skip(parents, rng), fields(genome_length = parents.0.encoding().len()))]
pub fn uniform<C, R>(
    parents: (C, C),
    p_heads: f64,
    pc: f64,
    rng: &mut R,
) -> Result<(C, C), GaError>
where
    C: Chromosome,
    R: Rng + ?Sized,
{
    let p_heads = check_probability("p_heads", p_heads)?;
    let pc = check_probability("pc", pc)?;
    shared_length(&parents.0, &parents.1)?;
    if !rng.random_bool(pc) {
        return Ok(parents);
    }

    let (first, second) = parents;
    let mut a = first.encoding().values().to_vec();
    let mut b = second.encoding().values().to_vec();
    for (x, y) in a.iter_mut().zip(b.iter_mut()) {
        if !rng.random_bool(p_heads) {
            std::mem::swap(x, y);
        }
    }

    Ok((
        first.with_encoding(Encoding::new(a)),
        second.with_encoding(Encoding::new(b)),
    ))
}

/// Walks both genomes, switching provenance at each of `first`'s hotspots.
fn exchange_at_hotspots<G: Clone>(
    first: &EvolvingHotspotEncoding<G>,
    second: &EvolvingHotspotEncoding<G>,
) -> Result<(EvolvingHotspotEncoding<G>, EvolvingHotspotEncoding<G>), GaError> {
    let len = first.len();
    let (v1, v2) = (first.genes().values(), second.genes().values());
    let (t1, t2) = (first.crossover_template(), second.crossover_template());

    let mut genes = (Vec::with_capacity(len), Vec::with_capacity(len));
    let mut templates = (Vec::with_capacity(len), Vec::with_capacity(len));
    let mut crossing = false;
    for i in 0..len {
        if t1[i] {
            crossing = !crossing;
        }
        let (from_a, from_b) = if crossing { (1, 0) } else { (0, 1) };
        let pick = |source: usize| {
            if source == 0 {
                (v1[i].clone(), t1[i])
            } else {
                (v2[i].clone(), t2[i])
            }
        };
        let (gene_a, hot_a) = pick(from_a);
        let (gene_b, hot_b) = pick(from_b);
        genes.0.push(gene_a);
        templates.0.push(hot_a);
        genes.1.push(gene_b);
        templates.1.push(hot_b);
    }

    Ok((
        EvolvingHotspotEncoding::from_values(genes.0, templates.0)?,
        EvolvingHotspotEncoding::from_values(genes.1, templates.1)?,
    ))
}

/// Multi-point crossover driven by the parents' own hotspot templates.
///
/// Every hotspot in parent 1's template toggles whether the offspring copy
/// straight or crossed. Template bits travel with their genes, so the
/// crossover points are inherited too. The two offspring are exact
/// complements: wherever one took parent 1's gene the other took parent 2's.
#[instrument(level = "debug", skip(parents, rng), fields(genome_length = parents.0.len()))]
pub fn multi_point<G, R>(
    parents: (EvolvingHotspotEncoding<G>, EvolvingHotspotEncoding<G>),
    pc: f64,
    rng: &mut R,
) -> Result<(EvolvingHotspotEncoding<G>, EvolvingHotspotEncoding<G>), GaError>
where
    G: Clone,
    R: Rng + ?Sized,
{
    let pc = check_probability("pc", pc)?;
    shared_length(&parents.0, &parents.1)?;
    if !rng.random_bool(pc) {
        return Ok(parents);
    }
    let offspring = exchange_at_hotspots(&parents.0, &parents.1)?;
    tracing::trace!(hotspots = parents.0.hotspot_count(), "crossed at hotspots");
    Ok(offspring)
}

/// A crossover operator the generational engine can drive.
pub trait Recombine<C: Chromosome> {
    fn recombine<R: Rng + ?Sized>(
        &self,
        parents: (C, C),
        pc: f64,
        inversion: bool,
        rng: &mut R,
    ) -> Result<(C, C), GaError>;
}

/// Crossover operators that work on any chromosome.
///
/// Only [`Crossover::SinglePoint`] is inversion aware; the others splice
/// genes in original order and ignore the flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum Crossover {
    #[default]
    SinglePoint,
    TwoPoint,
    Uniform {
        p_heads: f64,
    },
}

impl Crossover {
    pub fn uniform(p_heads: f64) -> Result<Self, GaError> {
        check_probability("p_heads", p_heads)?;
        Ok(Crossover::Uniform { p_heads })
    }
}

impl<C: Chromosome> Recombine<C> for Crossover {
    fn recombine<R: Rng + ?Sized>(
        &self,
        parents: (C, C),
        pc: f64,
        inversion: bool,
        rng: &mut R,
    ) -> Result<(C, C), GaError> {
        match *self {
            Crossover::SinglePoint => single_point(parents, pc, inversion, rng),
            Crossover::TwoPoint => two_point(parents, pc, rng),
            Crossover::Uniform { p_heads } => uniform(parents, p_heads, pc, rng),
        }
    }
}

/// [`multi_point`] as an engine operator for hotspot encodings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiPoint;

impl<G: Clone> Recombine<EvolvingHotspotEncoding<G>> for MultiPoint {
    fn recombine<R: Rng + ?Sized>(
        &self,
        parents: (EvolvingHotspotEncoding<G>, EvolvingHotspotEncoding<G>),
        pc: f64,
        _inversion: bool,
        rng: &mut R,
    ) -> Result<(EvolvingHotspotEncoding<G>, EvolvingHotspotEncoding<G>), GaError> {
        multi_point(parents, pc, rng)
    }
}
