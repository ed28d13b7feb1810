//! Edge cases and failure modes: degenerate populations, hostile fitness
//! values and malformed configurations must either behave or fail loudly.

use holland_ga::algorithms::generational::{GaConfig, GenerationalGa, run};
use holland_ga::operators::crossover::{Crossover, single_point, two_point, uniform};
use holland_ga::operators::selection::{
    self, Boltzmann, Selection, Temperature, elitism, roulette_wheel, tournament,
};
use holland_ga::{BinaryEncoding, Encoding, Evolver, Fitness, GaError};
use rand::prelude::SeedableRng;
use rand_pcg::Pcg64;
use std::cmp::Ordering;

// --- Mock Infrastructure ---

fn ones(c: &BinaryEncoding) -> f64 {
    c.count_ones() as f64
}

fn shifted_ones(c: &BinaryEncoding) -> f64 {
    c.count_ones() as f64 + 1.0
}

fn population(n: usize, len: usize, seed: u64) -> Vec<BinaryEncoding> {
    let mut rng = Pcg64::seed_from_u64(seed);
    (0..n).map(|_| BinaryEncoding::random(len, &mut rng)).collect()
}

// ============================================================================
// NaN fitness
// ============================================================================

/// A fitness function that returns NaN for any chromosome with a leading 1.
fn nan_on_leading_one(c: &BinaryEncoding) -> f64 {
    if c.values()[0] {
        f64::NAN
    } else {
        c.count_ones() as f64 + 1.0
    }
}

#[test]
fn test_nan_fitness_is_rejected_by_proportionate_selection() {
    let mut rng = Pcg64::seed_from_u64(1);
    let pop = vec![
        BinaryEncoding::from_bits([1, 0, 0]),
        BinaryEncoding::from_bits([0, 1, 1]),
    ];
    let result = roulette_wheel(&pop, &nan_on_leading_one, None, &mut rng);
    assert!(matches!(result, Err(GaError::InvalidWeight(_))));

    let result = selection::stochastic_universal(&pop, &nan_on_leading_one, None, &mut rng);
    assert!(matches!(result, Err(GaError::InvalidWeight(_))));

    let result = selection::sigma_scaling(&pop, &nan_on_leading_one, None, &mut rng);
    assert!(matches!(result, Err(GaError::InvalidWeight(_))));
}

#[test]
fn test_nan_fitness_ranks_last_in_comparisons() {
    let pop = vec![
        BinaryEncoding::from_bits([1, 1, 1]),
        BinaryEncoding::from_bits([0, 0, 1]),
        BinaryEncoding::from_bits([0, 1, 1]),
    ];
    let elites = elitism(&pop, &nan_on_leading_one, 3).unwrap();
    assert_eq!(elites[0], &pop[2]);
    assert_eq!(elites[1], &pop[1]);
    assert_eq!(elites[2], &pop[0], "NaN individual must come last");

    assert_eq!(
        nan_on_leading_one.compare(&pop[0], &pop[1]),
        Ordering::Less
    );
    assert_eq!(
        nan_on_leading_one.compare(&pop[0], &pop[0]),
        Ordering::Equal
    );
}

#[test]
fn test_engine_survives_nan_fitness_under_tournament() {
    let config = GaConfig {
        generations: 10,
        pm: 0.05,
        elitism: 2,
        ..GaConfig::default()
    };
    let last = run(
        population(12, 6, 3),
        &nan_on_leading_one,
        Selection::tournament(0.9).unwrap(),
        Crossover::SinglePoint,
        config,
        3,
    )
    .unwrap();
    assert_eq!(last.len(), 12);
}

// ============================================================================
// Invalid weights abort the run
// ============================================================================

#[test]
fn test_negative_fitness_aborts_roulette_engine() {
    let negative = |c: &BinaryEncoding| c.count_ones() as f64 - 100.0;
    let result = run(
        population(6, 4, 4),
        &negative,
        Selection::RouletteWheel,
        Crossover::SinglePoint,
        GaConfig::default(),
        4,
    );
    assert!(matches!(result, Err(GaError::InvalidWeight(_))));
}

#[test]
fn test_negative_fitness_is_fine_for_scaled_strategies() {
    let negative = |c: &BinaryEncoding| c.count_ones() as f64 - 100.0;
    for strategy in [
        Selection::SigmaScaling,
        Selection::rank(1.5).unwrap(),
        Selection::tournament(0.75).unwrap(),
    ] {
        let config = GaConfig {
            generations: 5,
            ..GaConfig::default()
        };
        let last = run(
            population(6, 4, 5),
            &negative,
            strategy,
            Crossover::SinglePoint,
            config,
            5,
        );
        assert!(last.is_ok(), "{strategy:?} rejected negative fitness");
    }
}

#[test]
fn test_boltzmann_overflow_aborts_the_engine() {
    let huge = |c: &BinaryEncoding| c.count_ones() as f64 * 1.0e6;
    let mut ga = GenerationalGa::new(
        population(6, 8, 6),
        GaConfig::default(),
        Boltzmann::new(Temperature::Constant(1.0)),
        Crossover::SinglePoint,
        6,
    )
    .unwrap();
    let err = ga.step(&huge).unwrap_err();
    assert!(matches!(err, GaError::NumericOverflow(_)));
    // A failed step leaves the population and generation counter alone.
    assert_eq!(ga.generation(), 0);
    assert_eq!(ga.population().len(), 6);
}

#[test]
fn test_cold_schedule_is_a_configuration_error() {
    let frozen = |_generation: usize| 0.0;
    let result = run(
        population(4, 4, 7),
        &shifted_ones,
        Boltzmann::new(frozen),
        Crossover::SinglePoint,
        GaConfig::default(),
        7,
    );
    assert!(matches!(result, Err(GaError::InvalidConfiguration(_))));
}

// ============================================================================
// Mismatched genome lengths
// ============================================================================

#[test]
fn test_length_mismatch_is_inconsistent_encoding() {
    let mut rng = Pcg64::seed_from_u64(8);
    let parents = || {
        (
            BinaryEncoding::from_bits([1, 0, 1]),
            BinaryEncoding::from_bits([0, 1, 0, 1]),
        )
    };
    // Checked before the pc roll, so even a no-op crossover reports it.
    for pc in [0.0, 1.0] {
        assert!(matches!(
            single_point(parents(), pc, false, &mut rng),
            Err(GaError::InconsistentEncoding(_))
        ));
        assert!(matches!(
            two_point(parents(), pc, &mut rng),
            Err(GaError::InconsistentEncoding(_))
        ));
        assert!(matches!(
            uniform(parents(), 0.5, pc, &mut rng),
            Err(GaError::InconsistentEncoding(_))
        ));
    }
}

#[test]
fn test_mixed_length_population_aborts_the_engine() {
    let pop = vec![
        BinaryEncoding::from_bits([1, 1, 0, 1]),
        BinaryEncoding::from_bits([1, 0, 1]),
    ];
    let config = GaConfig {
        generations: 20,
        pc: 1.0,
        ..GaConfig::default()
    };
    // Equal weights put one SUS pointer on each individual.
    let result = run(
        pop,
        &|_: &BinaryEncoding| 1.0,
        Selection::StochasticUniversal,
        Crossover::SinglePoint,
        config,
        9,
    );
    assert!(matches!(result, Err(GaError::InconsistentEncoding(_))));
}

#[test]
fn test_malformed_permutation_is_rejected() {
    assert!(matches!(
        Encoding::from_parts(vec![true, false, true], vec![0, 0, 2]),
        Err(GaError::InconsistentEncoding(_))
    ));
    assert!(matches!(
        Encoding::from_parts(vec![true, false], vec![0, 1, 2]),
        Err(GaError::InconsistentEncoding(_))
    ));
    let json = r#"{"values":[true,false],"order":[1,1]}"#;
    assert!(serde_json::from_str::<BinaryEncoding>(json).is_err());
}

// ============================================================================
// Degenerate populations
// ============================================================================

#[test]
fn test_empty_population() {
    let mut rng = Pcg64::seed_from_u64(10);
    let empty: Vec<BinaryEncoding> = Vec::new();

    assert!(roulette_wheel(&empty, &ones, None, &mut rng).unwrap().is_empty());
    assert!(matches!(
        roulette_wheel(&empty, &ones, Some(2), &mut rng),
        Err(GaError::InvalidConfiguration(_))
    ));

    let last = run(
        empty,
        &ones,
        Selection::RouletteWheel,
        Crossover::SinglePoint,
        GaConfig::default(),
        10,
    )
    .unwrap();
    assert!(last.is_empty());
}

#[test]
fn test_single_individual_population() {
    let config = GaConfig {
        generations: 5,
        pm: 0.0,
        ..GaConfig::default()
    };
    let only = BinaryEncoding::from_bits([1, 0, 1, 1]);
    let last = run(
        vec![only.clone()],
        &shifted_ones,
        Selection::StochasticUniversal,
        Crossover::SinglePoint,
        config,
        11,
    )
    .unwrap();
    // Self-crossover of a lone parent reproduces it.
    assert_eq!(last, vec![only]);
}

#[test]
fn test_elitism_equal_to_population_freezes_it() {
    let pop = population(5, 6, 12);
    let config = GaConfig {
        generations: 10,
        pm: 1.0,
        pi: Some(1.0),
        elitism: 5,
        ..GaConfig::default()
    };
    // Selection never runs, so even an unusable roulette wheel is fine.
    let last = run(
        pop.clone(),
        &|_: &BinaryEncoding| 0.0,
        Selection::RouletteWheel,
        Crossover::SinglePoint,
        config,
        12,
    )
    .unwrap();
    let mut before: Vec<String> = pop.iter().map(ToString::to_string).collect();
    let mut after: Vec<String> = last.iter().map(ToString::to_string).collect();
    before.sort();
    after.sort();
    assert_eq!(before, after);
}

#[test]
fn test_single_gene_chromosomes_pass_through_crossover() {
    let mut rng = Pcg64::seed_from_u64(13);
    let parents = (BinaryEncoding::from_bits([1]), BinaryEncoding::from_bits([0]));
    let (x, y) = single_point(parents.clone(), 1.0, true, &mut rng).unwrap();
    assert_eq!((x, y), parents);
    let (x, y) = two_point(parents.clone(), 1.0, &mut rng).unwrap();
    assert_eq!((x, y), parents);
}

// ============================================================================
// Configuration bounds
// ============================================================================

#[test]
fn test_out_of_range_probabilities_are_rejected() {
    let configs = [
        GaConfig {
            pc: -0.01,
            ..GaConfig::default()
        },
        GaConfig {
            pm: 1.01,
            ..GaConfig::default()
        },
        GaConfig {
            pi: Some(f64::NAN),
            ..GaConfig::default()
        },
    ];
    for config in configs {
        let result = GenerationalGa::new(
            population(4, 4, 14),
            config,
            Selection::StochasticUniversal,
            Crossover::SinglePoint,
            14,
        );
        assert!(matches!(result, Err(GaError::InvalidConfiguration(_))));
    }
}

#[test]
fn test_out_of_range_operator_parameters_are_rejected() {
    assert!(Selection::rank(0.9).is_err());
    assert!(Selection::rank(2.1).is_err());
    assert!(Selection::tournament(-0.5).is_err());
    assert!(Crossover::uniform(1.5).is_err());

    let mut rng = Pcg64::seed_from_u64(15);
    let pop = population(4, 4, 15);
    assert!(matches!(
        tournament(&pop, &ones, 2.0, None, &mut rng),
        Err(GaError::InvalidConfiguration(_))
    ));
}
