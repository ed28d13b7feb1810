//! Chromosome encodings.
//!
//! An [`Encoding`] keeps two views of the same genes:
//!
//! - `values`: the genes in their original index order, which is what a
//!   fitness function reads.
//! - `ivalue`: `(original_index, gene)` pairs in *expressed* order. Inversion
//!   permutes this view to move genes next to each other without changing
//!   what they mean.
//!
//! Only the permutation is stored; `ivalue[p]` is `(order[p],
//! values[order[p]])`. Sorting `ivalue` by index therefore always gives
//! back `values`, and no operator can lose or duplicate a pair.
//!
//! Two update paths exist and they are not interchangeable:
//! [`Encoding::set_values`] swaps genes under the current permutation,
//! [`Encoding::set_ivalue`] replaces genes and permutation together.

use crate::{Chromosome, GaError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Genes plus the permutation that orders their expression.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "EncodingData<G>")]
pub struct Encoding<G> {
    values: Vec<G>,
    order: Vec<usize>,
}

#[derive(Deserialize)]
struct EncodingData<G> {
    values: Vec<G>,
    order: Vec<usize>,
}

impl<G> TryFrom<EncodingData<G>> for Encoding<G> {
    type Error = GaError;

    fn try_from(data: EncodingData<G>) -> Result<Self, Self::Error> {
        Self::from_parts(data.values, data.order)
    }
}

/// Checks that `order` holds every index in `0..order.len()` exactly once.
fn check_permutation(order: &[usize]) -> Result<(), GaError> {
    let mut seen = vec![false; order.len()];
    for &index in order {
        match seen.get_mut(index) {
            Some(slot) if !*slot => *slot = true,
            Some(_) => {
                return Err(GaError::InconsistentEncoding(format!(
                    "original index {index} appears more than once"
                )));
            }
            None => {
                return Err(GaError::InconsistentEncoding(format!(
                    "original index {index} out of range for length {}",
                    order.len()
                )));
            }
        }
    }
    Ok(())
}

impl<G> Encoding<G> {
    /// Builds an encoding in identity order, so `ivalue` is `enumerate(values)`.
    pub fn new(values: Vec<G>) -> Self {
        let order = (0..values.len()).collect();
        Self { values, order }
    }

    /// Builds an encoding from genes in original order and an explicit permutation.
    pub fn from_parts(values: Vec<G>, order: Vec<usize>) -> Result<Self, GaError> {
        if values.len() != order.len() {
            return Err(GaError::InconsistentEncoding(format!(
                "values has {} genes but order has {} indices",
                values.len(),
                order.len()
            )));
        }
        check_permutation(&order)?;
        Ok(Self { values, order })
    }

    /// Builds an encoding from `(original_index, gene)` pairs in expressed order.
    ///
    /// `values` is rebuilt by sorting the pairs on their index, so the
    /// permutation carried by `pairs` survives untouched.
    pub fn from_ivalue(pairs: Vec<(usize, G)>) -> Result<Self, GaError> {
        let order: Vec<usize> = pairs.iter().map(|(index, _)| *index).collect();
        check_permutation(&order)?;

        let mut sorted = pairs;
        sorted.sort_by_key(|(index, _)| *index);
        let values = sorted.into_iter().map(|(_, gene)| gene).collect();
        Ok(Self { values, order })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Genes in original index order.
    pub fn values(&self) -> &[G] {
        &self.values
    }

    /// Original indices in expressed order.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Iterates `(original_index, gene)` in expressed order without allocating.
    pub fn expressed(&self) -> impl Iterator<Item = (usize, &G)> + '_ {
        self.order.iter().map(|&index| (index, &self.values[index]))
    }

    /// The gene expressed at `position`.
    pub fn gene_at(&self, position: usize) -> Option<&G> {
        self.order.get(position).map(|&index| &self.values[index])
    }

    /// Replaces the genes, keeping the current permutation.
    ///
    /// `values` is read in original index order. Use [`Encoding::set_ivalue`]
    /// to replace the permutation as well.
    pub fn set_values(&mut self, values: Vec<G>) -> Result<(), GaError> {
        if values.len() != self.len() {
            return Err(GaError::InconsistentEncoding(format!(
                "cannot replace {} genes with {}",
                self.len(),
                values.len()
            )));
        }
        self.values = values;
        Ok(())
    }

    /// Replaces genes and permutation from `(original_index, gene)` pairs.
    pub fn set_ivalue(&mut self, pairs: Vec<(usize, G)>) -> Result<(), GaError> {
        if pairs.len() != self.len() {
            return Err(GaError::InconsistentEncoding(format!(
                "cannot replace {} pairs with {}",
                self.len(),
                pairs.len()
            )));
        }
        *self = Self::from_ivalue(pairs)?;
        Ok(())
    }

    /// Whether the expressed order differs from the original order.
    pub fn is_inverted(&self) -> bool {
        self.order
            .iter()
            .enumerate()
            .any(|(position, &index)| position != index)
    }

    pub fn reset_order(&mut self) {
        for (position, index) in self.order.iter_mut().enumerate() {
            *index = position;
        }
    }

    /// Number of positions (in original order) where the genes differ.
    ///
    /// Length differences count as mismatches.
    pub fn hamming_distance<H>(&self, other: &Encoding<H>) -> usize
    where
        G: PartialEq<H>,
    {
        let differing = self
            .values
            .iter()
            .zip(&other.values)
            .filter(|(a, b)| *a != *b)
            .count();
        differing + self.len().abs_diff(other.len())
    }

    pub(crate) fn values_mut(&mut self) -> &mut [G] {
        &mut self.values
    }

    pub(crate) fn order_mut(&mut self) -> &mut [usize] {
        &mut self.order
    }
}

impl<G: Clone> Encoding<G> {
    /// `(original_index, gene)` pairs in expressed order.
    pub fn ivalue(&self) -> Vec<(usize, G)> {
        self.expressed()
            .map(|(index, gene)| (index, gene.clone()))
            .collect()
    }

    /// A copy whose `ivalue` follows `master`'s index order.
    ///
    /// Gene meaning is unchanged; only the expressed order is rearranged so
    /// that position `p` of both encodings refers to the same original index.
    pub fn aligned_to<H>(&self, master: &Encoding<H>) -> Result<Self, GaError> {
        if master.len() != self.len() {
            return Err(GaError::InconsistentEncoding(format!(
                "cannot align {} genes to a master of {}",
                self.len(),
                master.len()
            )));
        }
        Ok(Self {
            values: self.values.clone(),
            order: master.order.clone(),
        })
    }
}

impl<G: Clone> Chromosome for Encoding<G> {
    type Gene = G;

    fn encoding(&self) -> &Encoding<G> {
        self
    }

    fn encoding_mut(&mut self) -> &mut Encoding<G> {
        self
    }

    fn with_encoding(&self, encoding: Encoding<G>) -> Self {
        encoding
    }
}

/// A fixed-length bitstring.
pub type BinaryEncoding = Encoding<bool>;

/// Anything that can stand in for a single bit; non-zero is `true`.
pub trait Bit {
    fn is_set(&self) -> bool;
}

impl Bit for bool {
    fn is_set(&self) -> bool {
        *self
    }
}

impl<T: Bit + ?Sized> Bit for &T {
    fn is_set(&self) -> bool {
        (**self).is_set()
    }
}

macro_rules! impl_bit_for_int {
    ($($t:ty),*) => {
        $(
            impl Bit for $t {
                fn is_set(&self) -> bool {
                    *self != 0
                }
            }
        )*
    };
}

impl_bit_for_int!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

impl Encoding<bool> {
    /// Coerces a sequence of bit-like items into a bitstring.
    ///
    /// ```rust
    /// use holland_ga::BinaryEncoding;
    ///
    /// let enc = BinaryEncoding::from_bits([1, 0, 1, 1]);
    /// assert_eq!(enc.values(), &[true, false, true, true]);
    /// ```
    pub fn from_bits<I>(bits: I) -> Self
    where
        I: IntoIterator,
        I::Item: Bit,
    {
        Self::new(bits.into_iter().map(|b| b.is_set()).collect())
    }

    /// A uniformly random bitstring of `len` genes.
    pub fn random<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Self {
        Self::new((0..len).map(|_| rng.random_bool(0.5)).collect())
    }

    pub fn count_ones(&self) -> usize {
        self.values.iter().filter(|&&bit| bit).count()
    }
}

impl fmt::Display for Encoding<bool> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &bit in &self.values {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

/// An encoding that carries its own crossover points.
///
/// `crossover_template[i] == true` marks a hotspot between gene `i - 1`
/// and gene `i`. The template is inherited and recombined along with the
/// genes, so the crossover structure evolves with the solution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "HotspotData<G>")]
pub struct EvolvingHotspotEncoding<G> {
    genes: Encoding<G>,
    crossover_template: Vec<bool>,
}

#[derive(Deserialize)]
struct HotspotData<G> {
    genes: Encoding<G>,
    crossover_template: Vec<bool>,
}

impl<G> TryFrom<HotspotData<G>> for EvolvingHotspotEncoding<G> {
    type Error = GaError;

    fn try_from(data: HotspotData<G>) -> Result<Self, Self::Error> {
        Self::new(data.genes, data.crossover_template)
    }
}

impl<G> EvolvingHotspotEncoding<G> {
    pub fn new(genes: Encoding<G>, crossover_template: Vec<bool>) -> Result<Self, GaError> {
        if genes.len() != crossover_template.len() {
            return Err(GaError::InconsistentEncoding(format!(
                "crossover template has {} positions for {} genes",
                crossover_template.len(),
                genes.len()
            )));
        }
        Ok(Self {
            genes,
            crossover_template,
        })
    }

    pub fn from_values(values: Vec<G>, crossover_template: Vec<bool>) -> Result<Self, GaError> {
        Self::new(Encoding::new(values), crossover_template)
    }

    pub fn genes(&self) -> &Encoding<G> {
        &self.genes
    }

    pub fn crossover_template(&self) -> &[bool] {
        &self.crossover_template
    }

    pub fn hotspot_count(&self) -> usize {
        self.crossover_template.iter().filter(|&&h| h).count()
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }
}

impl EvolvingHotspotEncoding<bool> {
    /// Random bits with each position marked as a hotspot with `hotspot_rate`.
    ///
    /// Position 0 never starts as a hotspot since there is no gene before it.
    pub fn random<R: Rng + ?Sized>(
        len: usize,
        hotspot_rate: f64,
        rng: &mut R,
    ) -> Result<Self, GaError> {
        let hotspot_rate = crate::error::check_probability("hotspot_rate", hotspot_rate)?;
        let genes = Encoding::random(len, rng);
        let template = (0..len)
            .map(|i| i > 0 && rng.random_bool(hotspot_rate))
            .collect();
        Self::new(genes, template)
    }
}

impl<G: Clone> Chromosome for EvolvingHotspotEncoding<G> {
    type Gene = G;

    fn encoding(&self) -> &Encoding<G> {
        &self.genes
    }

    fn encoding_mut(&mut self) -> &mut Encoding<G> {
        &mut self.genes
    }

    /// Keeps this template; it is padded with `false` or cut to fit a new length.
    fn with_encoding(&self, encoding: Encoding<G>) -> Self {
        let mut crossover_template = self.crossover_template.clone();
        crossover_template.resize(encoding.len(), false);
        Self {
            genes: encoding,
            crossover_template,
        }
    }
}
