use holland_ga::algorithms::generational::{GaConfig, GenerationalGa};
use holland_ga::operators::crossover::Crossover;
use holland_ga::operators::selection::Selection;
use holland_ga::{BinaryEncoding, Evolver, Fitness, GaError};
use rand::Rng;
use tracing_subscriber::EnvFilter;

const BIT_COUNT: usize = 128;

/// Counts positions matching a hidden target, read in original gene order.
struct PatternMatch {
    target: Vec<bool>,
}

impl Fitness<BinaryEncoding> for PatternMatch {
    fn fitness(&self, chromosome: &BinaryEncoding) -> f64 {
        let matches = chromosome
            .values()
            .iter()
            .zip(&self.target)
            .filter(|(a, b)| a == b)
            .count() as f64;
        matches / BIT_COUNT as f64 // Normalized 0.0 to 1.0
    }
}

fn main() -> Result<(), GaError> {
    // RUST_LOG=holland_ga=debug shows one line per generation
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut rng = rand::rng();

    // Generate a random target pattern to match
    let target: Vec<bool> = (0..BIT_COUNT).map(|_| rng.random_bool(0.5)).collect();
    let initial_pop: Vec<BinaryEncoding> = (0..100)
        .map(|_| BinaryEncoding::random(BIT_COUNT, &mut rng))
        .collect();

    let config = GaConfig {
        pc: 0.8,
        pm: 0.005,
        pi: Some(0.05),
        elitism: 2,
        ..GaConfig::default()
    };
    let mut ga = GenerationalGa::new(
        initial_pop,
        config,
        Selection::tournament(0.8)?,
        Crossover::SinglePoint,
        rng.random(),
    )?;
    let eval = PatternMatch { target };

    println!("Evolving {BIT_COUNT}-bit pattern matching...");

    for generation in 0..1000 {
        ga.step(&eval)?;
        let Some(best) = ga.best(&eval) else {
            break;
        };
        let accuracy = eval.fitness(best);

        if generation % 100 == 0 {
            println!(
                "Generation {generation}: Best Accuracy: {:.2}%",
                accuracy * 100.0
            );
        }

        if accuracy >= 1.0 {
            println!("Perfect match found at Generation {generation}!");
            println!("{best}");
            break;
        }
    }
    println!(
        "Population size after {} generations: {}",
        ga.generation(),
        ga.population().len()
    );
    Ok(())
}
