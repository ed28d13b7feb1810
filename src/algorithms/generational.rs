use crate::error::check_probability;
use crate::operators::crossover::Recombine;
use crate::operators::mutation;
use crate::operators::selection::{self, ParentSelection};
use crate::{Chromosome, Evolver, Fitness, GaError, cmp_f64_nan_last};
use rand::prelude::SeedableRng;
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

/// Hyperparameters of a generational run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GaConfigData")]
pub struct GaConfig {
    /// Number of generations; the run never stops early.
    pub generations: usize,
    /// Crossover probability per parent pair.
    pub pc: f64,
    /// Bit-flip probability per gene.
    pub pm: f64,
    /// Inversion probability per offspring. `None` disables inversion and
    /// inversion-aware crossover and mutation.
    pub pi: Option<f64>,
    /// Number of fittest individuals copied verbatim into the next generation.
    pub elitism: usize,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            generations: 50,
            pc: 0.7,
            pm: 0.001,
            pi: None,
            elitism: 0,
        }
    }
}

#[derive(Deserialize)]
struct GaConfigData {
    generations: usize,
    pc: f64,
    pm: f64,
    pi: Option<f64>,
    elitism: usize,
}

impl TryFrom<GaConfigData> for GaConfig {
    type Error = GaError;

    fn try_from(data: GaConfigData) -> Result<Self, Self::Error> {
        let config = GaConfig {
            generations: data.generations,
            pc: data.pc,
            pm: data.pm,
            pi: data.pi,
            elitism: data.elitism,
        };
        config.validate()?;
        Ok(config)
    }
}

impl GaConfig {
    pub fn validate(&self) -> Result<(), GaError> {
        check_probability("pc", self.pc)?;
        check_probability("pm", self.pm)?;
        if let Some(pi) = self.pi {
            check_probability("pi", pi)?;
        }
        Ok(())
    }
}

/// Holland-style generational GA over bitstring chromosomes.
///
/// Each generation: elites are kept, parent pairs are drawn by the
/// selection strategy, each pair is recombined with `pc`, and every
/// offspring is bit-mutated with `pm` and, when `pi` is set, inverted.
/// The offspring replace the population.
#[derive(Serialize, Deserialize)]
#[serde(bound(
    serialize = "C: Serialize, S: Serialize, X: Serialize",
    deserialize = "C: Deserialize<'de>, S: Deserialize<'de>, X: Deserialize<'de>"
))]
pub struct GenerationalGa<C, S, X> {
    population: Vec<C>,
    config: GaConfig,
    selection: S,
    crossover: X,
    generation: usize,
    rng: Pcg64,
}

impl<C, S, X> GenerationalGa<C, S, X>
where
    C: Chromosome<Gene = bool>,
    S: ParentSelection<C>,
    X: Recombine<C>,
{
    pub fn new(
        initial_pop: Vec<C>,
        config: GaConfig,
        selection: S,
        crossover: X,
        seed: u64,
    ) -> Result<Self, GaError> {
        config.validate()?;
        if config.elitism > initial_pop.len() {
            return Err(GaError::InvalidConfiguration(format!(
                "elitism {} exceeds population size {}",
                config.elitism,
                initial_pop.len()
            )));
        }
        Ok(Self {
            population: initial_pop,
            config,
            selection,
            crossover,
            generation: 0,
            rng: Pcg64::seed_from_u64(seed),
        })
    }

    pub fn config(&self) -> &GaConfig {
        &self.config
    }

    /// Index of the next generation to be bred.
    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn into_population(self) -> Vec<C> {
        self.population
    }

    /// The fittest individual of the current population.
    pub fn best<F: Fitness<C>>(&self, fitness: &F) -> Option<&C> {
        self.population
            .iter()
            .map(|c| (c, fitness.fitness(c)))
            .max_by(|a, b| cmp_f64_nan_last(a.1, b.1))
            .map(|(c, _)| c)
    }

    /// Runs `config.generations` generations and returns the final population.
    pub fn run<F: Fitness<C>>(&mut self, fitness: &F) -> Result<&[C], GaError> {
        for _ in 0..self.config.generations {
            self.step(fitness)?;
        }
        tracing::info!(
            generations = self.config.generations,
            population_size = self.population.len(),
            "Evolution run complete"
        );
        Ok(&self.population)
    }
}

impl<C, S, X> Evolver<C> for GenerationalGa<C, S, X>
where
    C: Chromosome<Gene = bool>,
    S: ParentSelection<C>,
    X: Recombine<C>,
{
    fn step<F: Fitness<C>>(&mut self, fitness: &F) -> Result<(), GaError> {
        if self.population.is_empty() {
            return Ok(());
        }

        let pop_size = self.population.len();
        let GaConfig {
            pc, pm, pi, elitism, ..
        } = self.config;
        let inversion = pi.is_some();

        if elitism > pop_size {
            return Err(GaError::InvalidConfiguration(format!(
                "elitism {elitism} exceeds population size {pop_size}"
            )));
        }
        let mut next_gen: Vec<C> = selection::elitism(&self.population, fitness, elitism)?
            .into_iter()
            .cloned()
            .collect();

        // Odd shortfalls breed one spare offspring, dropped below
        let shortfall = pop_size - next_gen.len();
        let pairs = if shortfall == 0 {
            Vec::new()
        } else {
            self.selection.select_pairs(
                &self.population,
                fitness,
                self.generation,
                shortfall.div_ceil(2) * 2,
                &mut self.rng,
            )?
        };

        let mut flips = 0;
        let mut inversions = 0;
        for (a, b) in pairs {
            let (mut x, mut y) =
                self.crossover
                    .recombine((a.clone(), b.clone()), pc, inversion, &mut self.rng)?;
            for child in [&mut x, &mut y] {
                flips += mutation::random_bit(child, pm, inversion, &mut self.rng)?;
                if let Some(pi) = pi {
                    if mutation::inversion(child, pi, &mut self.rng)?.is_some() {
                        inversions += 1;
                    }
                }
            }
            next_gen.push(x);
            next_gen.push(y);
        }
        next_gen.truncate(pop_size);

        tracing::debug!(
            generation = self.generation,
            elites = elitism,
            flips,
            inversions,
            "Generation bred"
        );
        self.population = next_gen;
        self.generation += 1;
        Ok(())
    }

    fn population(&self) -> &[C] {
        &self.population
    }
}

/// Evolves `population` for `config.generations` generations.
///
/// ```rust
/// use holland_ga::BinaryEncoding;
/// use holland_ga::algorithms::generational::{GaConfig, run};
/// use holland_ga::operators::{crossover::Crossover, selection::Selection};
///
/// let population: Vec<BinaryEncoding> = (0..8)
///     .map(|i| BinaryEncoding::from_bits((0..6).map(|j| (i + j) % 3 == 0)))
///     .collect();
/// let ones = |c: &BinaryEncoding| c.count_ones() as f64 + 1.0;
///
/// let config = GaConfig { generations: 5, ..GaConfig::default() };
/// let last = run(population, &ones, Selection::RouletteWheel, Crossover::SinglePoint, config, 42)?;
/// assert_eq!(last.len(), 8);
/// # Ok::<(), holland_ga::GaError>(())
/// ```
pub fn run<C, F, S, X>(
    population: Vec<C>,
    fitness: &F,
    selection: S,
    crossover: X,
    config: GaConfig,
    seed: u64,
) -> Result<Vec<C>, GaError>
where
    C: Chromosome<Gene = bool>,
    F: Fitness<C>,
    S: ParentSelection<C>,
    X: Recombine<C>,
{
    let mut ga = GenerationalGa::new(population, config, selection, crossover, seed)?;
    ga.run(fitness)?;
    Ok(ga.into_population())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BinaryEncoding;
    use crate::operators::crossover::Crossover;
    use crate::operators::selection::Selection;

    fn ones(c: &BinaryEncoding) -> f64 {
        c.count_ones() as f64
    }

    fn zeros(n: usize, len: usize) -> Vec<BinaryEncoding> {
        (0..n).map(|_| BinaryEncoding::new(vec![false; len])).collect()
    }

    #[test]
    fn config_rejects_bad_probabilities() {
        let bad_pc = GaConfig {
            pc: 1.5,
            ..GaConfig::default()
        };
        assert!(bad_pc.validate().is_err());
        let bad_pi = GaConfig {
            pi: Some(-0.1),
            ..GaConfig::default()
        };
        assert!(bad_pi.validate().is_err());
        assert!(GaConfig::default().validate().is_ok());
    }

    #[test]
    fn new_rejects_elitism_above_population() {
        let config = GaConfig {
            elitism: 5,
            ..GaConfig::default()
        };
        let result = GenerationalGa::new(
            zeros(4, 3),
            config,
            Selection::StochasticUniversal,
            Crossover::SinglePoint,
            1,
        );
        assert!(matches!(result, Err(GaError::InvalidConfiguration(_))));
    }

    #[test]
    fn step_keeps_population_size_for_odd_populations() {
        let config = GaConfig {
            pm: 0.2,
            elitism: 2,
            ..GaConfig::default()
        };
        let mut ga = GenerationalGa::new(
            zeros(7, 5),
            config,
            Selection::tournament(0.8).unwrap(),
            Crossover::TwoPoint,
            3,
        )
        .unwrap();
        for _ in 0..10 {
            ga.step(&ones).unwrap();
            assert_eq!(ga.population().len(), 7);
        }
        assert_eq!(ga.generation(), 10);
    }

    #[test]
    fn elitism_never_loses_the_best() {
        let mut pop = zeros(10, 8);
        pop[3] = BinaryEncoding::new(vec![true; 8]);
        let config = GaConfig {
            pm: 0.5,
            elitism: 1,
            ..GaConfig::default()
        };
        let mut ga =
            GenerationalGa::new(pop, config, Selection::SigmaScaling, Crossover::SinglePoint, 9)
                .unwrap();
        for _ in 0..20 {
            ga.step(&ones).unwrap();
            let best = ga.best(&ones).unwrap();
            assert_eq!(best.count_ones(), 8);
        }
    }

    #[test]
    fn runs_are_reproducible_for_a_seed() {
        let config = GaConfig {
            generations: 15,
            pm: 0.05,
            pi: Some(0.3),
            ..GaConfig::default()
        };
        let go = |seed| {
            run(
                zeros(12, 10),
                &|c: &BinaryEncoding| ones(c) + 1.0,
                Selection::rank(1.8).unwrap(),
                Crossover::SinglePoint,
                config,
                seed,
            )
            .unwrap()
        };
        assert_eq!(go(77), go(77));
    }

    #[test]
    fn errors_abort_the_run() {
        // All-zero fitness cannot drive a roulette wheel.
        let result = run(
            zeros(4, 4),
            &ones,
            Selection::RouletteWheel,
            Crossover::SinglePoint,
            GaConfig::default(),
            5,
        );
        assert!(matches!(result, Err(GaError::InvalidWeight(_))));
    }

    #[test]
    fn engine_state_round_trips_through_json() {
        let ga = GenerationalGa::new(
            zeros(4, 4),
            GaConfig::default(),
            Selection::StochasticUniversal,
            Crossover::uniform(0.6).unwrap(),
            8,
        )
        .unwrap();
        let json = serde_json::to_string(&ga).unwrap();
        let back: GenerationalGa<BinaryEncoding, Selection, Crossover> =
            serde_json::from_str(&json).unwrap();
        assert_eq!(back.population(), ga.population());
        assert_eq!(back.config(), ga.config());
    }

    #[test]
    fn deserialized_config_is_validated() {
        let json = r#"{"generations":5,"pc":7.0,"pm":0.001,"pi":null,"elitism":0}"#;
        let err = serde_json::from_str::<GaConfig>(json).unwrap_err();
        assert!(err.to_string().contains("InvalidConfiguration"));

        let json = r#"{"generations":5,"pc":0.7,"pm":0.001,"pi":0.1,"elitism":1}"#;
        let config: GaConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.pi, Some(0.1));
    }

    #[test]
    fn deserialized_engine_rejects_out_of_range_config() {
        let ga = GenerationalGa::new(
            zeros(4, 4),
            GaConfig::default(),
            Selection::StochasticUniversal,
            Crossover::SinglePoint,
            8,
        )
        .unwrap();
        let json = serde_json::to_string(&ga).unwrap();
        assert!(json.contains(r#""pc":0.7"#) && json.contains(r#""elitism":0"#));

        let broken = json
            .replace(r#""pc":0.7"#, r#""pc":7.0"#)
            .replace(r#""elitism":0"#, r#""elitism":4"#);
        assert!(
            serde_json::from_str::<GenerationalGa<BinaryEncoding, Selection, Crossover>>(&broken)
                .is_err()
        );

        // A valid config can still name more elites than the stored population holds.
        let oversized = json.replace(r#""elitism":0"#, r#""elitism":10"#);
        let mut back: GenerationalGa<BinaryEncoding, Selection, Crossover> =
            serde_json::from_str(&oversized).unwrap();
        let err = back.step(&ones).unwrap_err();
        assert!(matches!(err, GaError::InvalidConfiguration(_)));
        assert_eq!(back.generation(), 0);
    }
}
