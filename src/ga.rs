use crate::cinfo;
use crate::data::NutrientDataset;
use crate::error::DietError;
use crate::individual::Individual;
use crate::param::Param;
use crate::pool::WorkerPool;
use crate::population::{GenerationStats, Population};
use crate::seed::SeedProvider;
use crate::utils::{display_epoch, display_epoch_legend};
use log::{debug, info, warn};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

//-----------------------------------------------------------------------------
// Operators and per-run configuration
//-----------------------------------------------------------------------------

/// Builds a parent pool of `population_size` bundles from an evaluated population.
pub type SelectionFn = fn(&Population, &GAConfig, &mut ChaCha8Rng) -> Population;
/// Recombines two offspring in place.
pub type CrossoverFn = fn(&mut Individual, &mut Individual, &mut ChaCha8Rng);
/// Mutates one offspring in place given the per-slot probability and the catalog size.
pub type MutationFn = fn(&mut Individual, f64, usize, &mut ChaCha8Rng);

/// Immutable configuration of one genetic search.
///
/// Built once per run through [`GAConfig::builder`] or [`GAConfig::from_param`]
/// and only read afterwards, so concurrent runs never share mutable operator state.
#[derive(Clone)]
pub struct GAConfig {
    bundle_size: usize,
    population_size: usize,
    generations: usize,
    crossover_prob: f64,
    mutation_prob: f64,
    tournament_size: usize,
    seed: u64,
    max_duration: Option<Duration>,
    display_colorful: bool,
    select: SelectionFn,
    crossover: CrossoverFn,
    mutate: MutationFn,
}

impl GAConfig {
    pub fn builder() -> GAConfigBuilder {
        GAConfigBuilder::default()
    }

    /// Configuration described by the `ga` and `general` sections of a parameter file.
    pub fn from_param(param: &Param) -> Result<GAConfig, DietError> {
        let mut builder = GAConfig::builder()
            .bundle_size(param.ga.bundle_size)
            .population_size(param.ga.population_size)
            .generations(param.ga.generations)
            .crossover_prob(param.ga.crossover_prob)
            .mutation_prob(param.ga.mutation_prob)
            .tournament_size(param.ga.tournament_size)
            .seed(param.general.seed)
            .display_colorful(param.general.display_colorful);
        if param.ga.max_duration_secs > 0 {
            builder = builder.max_duration(Duration::from_secs(param.ga.max_duration_secs));
        }
        builder.build()
    }

    pub fn bundle_size(&self) -> usize {
        self.bundle_size
    }

    pub fn population_size(&self) -> usize {
        self.population_size
    }

    pub fn generations(&self) -> usize {
        self.generations
    }

    pub fn crossover_prob(&self) -> f64 {
        self.crossover_prob
    }

    pub fn mutation_prob(&self) -> f64 {
        self.mutation_prob
    }

    pub fn tournament_size(&self) -> usize {
        self.tournament_size
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn max_duration(&self) -> Option<Duration> {
        self.max_duration
    }

    pub fn display_colorful(&self) -> bool {
        self.display_colorful
    }
}

impl Default for GAConfig {
    fn default() -> Self {
        GAConfigBuilder::default().assemble()
    }
}

impl fmt::Debug for GAConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GAConfig")
            .field("bundle_size", &self.bundle_size)
            .field("population_size", &self.population_size)
            .field("generations", &self.generations)
            .field("crossover_prob", &self.crossover_prob)
            .field("mutation_prob", &self.mutation_prob)
            .field("tournament_size", &self.tournament_size)
            .field("seed", &self.seed)
            .field("max_duration", &self.max_duration)
            .finish_non_exhaustive()
    }
}

/// Step-by-step assembly of a [`GAConfig`]; nothing is checked until `build`.
#[derive(Clone)]
pub struct GAConfigBuilder {
    bundle_size: usize,
    population_size: usize,
    generations: usize,
    crossover_prob: f64,
    mutation_prob: f64,
    tournament_size: usize,
    seed: u64,
    max_duration: Option<Duration>,
    display_colorful: bool,
    select: SelectionFn,
    crossover: CrossoverFn,
    mutate: MutationFn,
}

impl Default for GAConfigBuilder {
    fn default() -> Self {
        let param = Param::default();
        GAConfigBuilder {
            bundle_size: param.ga.bundle_size,
            population_size: param.ga.population_size,
            generations: param.ga.generations,
            crossover_prob: param.ga.crossover_prob,
            mutation_prob: param.ga.mutation_prob,
            tournament_size: param.ga.tournament_size,
            seed: param.general.seed,
            max_duration: None,
            display_colorful: param.general.display_colorful,
            select: tournament_select,
            crossover: two_point_crossover,
            mutate: uniform_mutation,
        }
    }
}

impl GAConfigBuilder {
    pub fn bundle_size(mut self, bundle_size: usize) -> Self {
        self.bundle_size = bundle_size;
        self
    }

    pub fn population_size(mut self, population_size: usize) -> Self {
        self.population_size = population_size;
        self
    }

    pub fn generations(mut self, generations: usize) -> Self {
        self.generations = generations;
        self
    }

    pub fn crossover_prob(mut self, crossover_prob: f64) -> Self {
        self.crossover_prob = crossover_prob;
        self
    }

    pub fn mutation_prob(mut self, mutation_prob: f64) -> Self {
        self.mutation_prob = mutation_prob;
        self
    }

    pub fn tournament_size(mut self, tournament_size: usize) -> Self {
        self.tournament_size = tournament_size;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Wall-clock cap on the generational loop.
    pub fn max_duration(mut self, max_duration: Duration) -> Self {
        self.max_duration = Some(max_duration);
        self
    }

    pub fn display_colorful(mut self, display_colorful: bool) -> Self {
        self.display_colorful = display_colorful;
        self
    }

    pub fn selection(mut self, select: SelectionFn) -> Self {
        self.select = select;
        self
    }

    pub fn crossover(mut self, crossover: CrossoverFn) -> Self {
        self.crossover = crossover;
        self
    }

    pub fn mutation(mut self, mutate: MutationFn) -> Self {
        self.mutate = mutate;
        self
    }

    pub fn build(self) -> Result<GAConfig, DietError> {
        for (name, value) in [
            ("bundle_size", self.bundle_size),
            ("population_size", self.population_size),
            ("tournament_size", self.tournament_size),
        ] {
            if value == 0 {
                return Err(DietError::Configuration(format!(
                    "Invalid {}=0. Must be >= 1.",
                    name
                )));
            }
        }

        for (name, value) in [
            ("crossover_prob", self.crossover_prob),
            ("mutation_prob", self.mutation_prob),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(DietError::Configuration(format!(
                    "Invalid {}={}. Must be in range [0, 1].",
                    name, value
                )));
            }
        }

        Ok(self.assemble())
    }

    fn assemble(self) -> GAConfig {
        GAConfig {
            bundle_size: self.bundle_size,
            population_size: self.population_size,
            generations: self.generations,
            crossover_prob: self.crossover_prob,
            mutation_prob: self.mutation_prob,
            tournament_size: self.tournament_size,
            seed: self.seed,
            max_duration: self.max_duration,
            display_colorful: self.display_colorful,
            select: self.select,
            crossover: self.crossover,
            mutate: self.mutate,
        }
    }
}

//-----------------------------------------------------------------------------
// Search outcome
//-----------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum TruncationReason {
    /// The running flag was cleared, usually by SIGINT/SIGTERM/SIGHUP
    Signal,
    /// `max_duration` elapsed
    TimeLimit,
}

/// The loop stopped before running every requested generation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Truncation {
    pub reason: TruncationReason,
    pub completed: usize,
    pub requested: usize,
}

impl fmt::Display for Truncation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self.reason {
            TruncationReason::Signal => "stop signal",
            TruncationReason::TimeLimit => "time limit",
        };
        write!(
            f,
            "stopped by {} after {}/{} generations",
            reason, self.completed, self.requested
        )
    }
}

#[derive(Clone, Debug)]
pub struct SearchResult {
    /// Lowest-fitness bundle of the final population
    pub best: Individual,
    /// One entry per evaluated generation, the initial population being generation 0
    pub generations: Vec<GenerationStats>,
    pub truncated: Option<Truncation>,
    pub population: Population,
}

//-----------------------------------------------------------------------------
// Genetic Algorithm core functions
//-----------------------------------------------------------------------------

/// Run the genetic search for the best food bundle
///
/// # Arguments
///
/// * `data` - The nutrient dataset to optimize against.
/// * `seeds` - Optional provider of initial bundles; random bundles complete the population.
/// * `config` - Immutable configuration of this run.
/// * `pool` - Worker pool used to evaluate each generation.
/// * `running` - Cleared from outside to stop the loop between two generations.
///
/// # Returns
///
/// The best bundle with the per-generation statistics, or a configuration error
/// when the catalog is empty or a seed bundle does not fit the dataset.
pub fn ga(
    data: &NutrientDataset,
    seeds: Option<&dyn SeedProvider>,
    config: &GAConfig,
    pool: &WorkerPool,
    running: Arc<AtomicBool>,
) -> Result<SearchResult, DietError> {
    let time = Instant::now();

    if data.food_len == 0 {
        return Err(DietError::Configuration(
            "Food catalog is empty: nothing to search.".to_string(),
        ));
    }
    if config.bundle_size() == 0 {
        return Err(DietError::Configuration(
            "Invalid bundle_size=0. Must be >= 1.".to_string(),
        ));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed());

    let (base_pop, evaluations) = generate_pop(data, seeds, config, pool, &mut rng)?;

    info!(
        "Population size: {}, bundle size {}, {} foods",
        base_pop.individuals.len(),
        config.bundle_size(),
        data.food_len
    );

    let result = iterative_evolution(
        base_pop,
        evaluations,
        data,
        config,
        pool,
        running,
        &mut rng,
        time,
    )?;

    info!(
        "Genetic algorithm computed {} generations in {:.2?}",
        result.generations.len() - 1,
        time.elapsed()
    );

    Ok(result)
}

/// Build and evaluate the initial population
///
/// Seed bundles are checked against the dataset, evaluated, and at most
/// `population_size` of the best are kept. Uniformly random bundles fill the rest.
///
/// # Returns
///
/// The evaluated population and the number of bundles evaluated to build it.
pub fn generate_pop(
    data: &NutrientDataset,
    seeds: Option<&dyn SeedProvider>,
    config: &GAConfig,
    pool: &WorkerPool,
    rng: &mut ChaCha8Rng,
) -> Result<(Population, usize), DietError> {
    let mut pop = Population::new();
    let mut evaluations = 0;

    if let Some(provider) = seeds {
        let bundles = provider.seed(data, config.bundle_size(), config.population_size(), rng)?;
        for bundle in bundles {
            let individual = Individual::from_foods(bundle);
            if individual.foods.len() != config.bundle_size()
                || !individual.check_compatibility(data)
            {
                return Err(DietError::Configuration(format!(
                    "Seed bundle {:?} does not fit a bundle size of {} over {} foods",
                    individual.foods,
                    config.bundle_size(),
                    data.food_len
                )));
            }
            pop.individuals.push(individual);
        }

        evaluations += pop.individuals.len();
        pool.install(|| pop.fit(data))?;
        pop = pop.sort();
        if pop.individuals.len() > config.population_size() {
            warn!(
                "{} seed bundles provided for a population of {}: keeping the best ones",
                pop.individuals.len(),
                config.population_size()
            );
            pop.individuals.truncate(config.population_size());
        }
        info!(
            "{} seed bundles kept in the initial population",
            pop.individuals.len()
        );
    }

    let missing = config.population_size() - pop.individuals.len();
    if missing > 0 {
        let mut random_pop = Population::new();
        random_pop.generate(missing, config.bundle_size(), data.food_len, rng);
        evaluations += missing;
        pool.install(|| random_pop.fit(data))?;
        pop.add(random_pop);
    }

    Ok((pop, evaluations))
}

/// Run the generational loop until the budget is spent or a cap stops it
///
/// # Arguments
///
/// * `base_pop` - The evaluated initial population.
/// * `evaluations` - Number of evaluations spent building `base_pop`.
/// * `data` - The nutrient dataset.
/// * `config` - Immutable configuration of this run.
/// * `pool` - Worker pool used for evaluation.
/// * `running` - Stop flag checked before each generation.
/// * `rng` - Random number generator.
/// * `start` - Start of the run, for the wall-clock cap.
#[allow(clippy::too_many_arguments)]
pub fn iterative_evolution(
    base_pop: Population,
    evaluations: usize,
    data: &NutrientDataset,
    config: &GAConfig,
    pool: &WorkerPool,
    running: Arc<AtomicBool>,
    rng: &mut ChaCha8Rng,
    start: Instant,
) -> Result<SearchResult, DietError> {
    let mut pop = base_pop;
    let mut generations = vec![pop.stats(0, evaluations)];
    let mut truncated = None;

    cinfo!(config.display_colorful(), "{}", display_epoch_legend());
    cinfo!(config.display_colorful(), "{}", display_epoch(&generations[0]));

    for epoch in 1..=config.generations() {
        let reason = if !running.load(Ordering::Relaxed) {
            Some(TruncationReason::Signal)
        } else if config.max_duration().map_or(false, |d| start.elapsed() >= d) {
            Some(TruncationReason::TimeLimit)
        } else {
            None
        };

        if let Some(reason) = reason {
            let truncation = Truncation {
                reason,
                completed: epoch - 1,
                requested: config.generations(),
            };
            warn!(
                "Genetic search {}: the best bundle may be far from converged",
                truncation
            );
            truncated = Some(truncation);
            break;
        }

        pop = evolve(&pop, data, config, pool, epoch, rng)?;

        let stats = pop.stats(epoch, pop.individuals.len());
        cinfo!(config.display_colorful(), "{}", display_epoch(&stats));
        generations.push(stats);
    }

    let best = pop
        .best()
        .cloned()
        .ok_or_else(|| DietError::Configuration("Population is empty".to_string()))?;
    debug!("Best bundle {:?}", best);

    Ok(SearchResult {
        best,
        generations,
        truncated,
        population: pop,
    })
}

/// Run one evolution step: selection, cross-over, mutation, fitting
///
/// The offspring replace the previous population entirely.
pub fn evolve(
    pop: &Population,
    data: &NutrientDataset,
    config: &GAConfig,
    pool: &WorkerPool,
    epoch: usize,
    rng: &mut ChaCha8Rng,
) -> Result<Population, DietError> {
    let parents = (config.select)(pop, config, rng);
    let mut children = cross_over(&parents, config, epoch, rng);
    mutate(&mut children, config, data.food_len, rng);
    children.compute_hash();

    debug!("Fitting children...");
    pool.install(|| children.fit(data))?;

    Ok(children)
}

/// Pair adjacent parents and recombine each pair with probability `crossover_prob`
///
/// An odd last parent is copied unchanged.
pub fn cross_over(
    parents: &Population,
    config: &GAConfig,
    epoch: usize,
    rng: &mut ChaCha8Rng,
) -> Population {
    let mut children = Population::new();
    children.individuals = parents
        .individuals
        .iter()
        .map(|p| Individual::child(p, epoch))
        .collect();

    for pair in children.individuals.chunks_exact_mut(2) {
        if rng.gen::<f64>() < config.crossover_prob() {
            let (first, second) = pair.split_at_mut(1);
            let parent_hashes = vec![first[0].hash, second[0].hash];
            (config.crossover)(&mut first[0], &mut second[0], rng);
            first[0].parents = Some(parent_hashes.clone());
            second[0].parents = Some(parent_hashes);
        }
    }

    children
}

/// Apply the mutation operator to every child
pub fn mutate(
    children: &mut Population,
    config: &GAConfig,
    food_len: usize,
    rng: &mut ChaCha8Rng,
) {
    if config.mutation_prob() <= 0.0 {
        return;
    }
    for child in children.individuals.iter_mut() {
        (config.mutate)(child, config.mutation_prob(), food_len, rng);
    }
}

//-----------------------------------------------------------------------------
// Default operators
//-----------------------------------------------------------------------------

/// Tournament selection
///
/// Each parent is the lowest-fitness bundle among `tournament_size` draws made
/// uniformly with replacement; the first one drawn wins ties.
pub fn tournament_select(
    pop: &Population,
    config: &GAConfig,
    rng: &mut ChaCha8Rng,
) -> Population {
    let mut parents = Population::new();
    let n = pop.individuals.len();
    if n == 0 {
        return parents;
    }

    for _ in 0..config.population_size() {
        let mut winner = &pop.individuals[rng.gen_range(0..n)];
        for _ in 1..config.tournament_size() {
            let challenger = &pop.individuals[rng.gen_range(0..n)];
            if challenger.fit < winner.fit {
                winner = challenger;
            }
        }
        parents.individuals.push(winner.clone());
    }

    parents
}

/// Two-point crossover
///
/// Draws two distinct cut points in `[1, size]` and swaps the slots between them.
/// Bundles shorter than two slots are left untouched.
pub fn two_point_crossover(a: &mut Individual, b: &mut Individual, rng: &mut ChaCha8Rng) {
    let size = a.foods.len().min(b.foods.len());
    if size < 2 {
        return;
    }

    let mut first = rng.gen_range(1..=size);
    let mut second = rng.gen_range(1..size);
    if second >= first {
        second += 1;
    } else {
        std::mem::swap(&mut first, &mut second);
    }

    a.foods[first..second].swap_with_slice(&mut b.foods[first..second]);
}

/// Uniform mutation: each slot is redrawn from `[0, food_len)` with probability `prob`.
pub fn uniform_mutation(
    individual: &mut Individual,
    prob: f64,
    food_len: usize,
    rng: &mut ChaCha8Rng,
) {
    for slot in individual.foods.iter_mut() {
        if rng.gen::<f64>() < prob {
            *slot = rng.gen_range(0..food_len);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::FixedSeeds;

    fn worked_dataset() -> NutrientDataset {
        NutrientDataset::new(
            vec![vec![4.0, 1.0], vec![2.0, 3.0], vec![1.0, 1.0]],
            vec![10.0, 5.0],
            vec![20.0, 15.0],
        )
        .unwrap()
    }

    fn wide_dataset() -> NutrientDataset {
        let nutrients = (0..40)
            .map(|i| vec![(i % 7) as f64, (i % 5) as f64 + 0.5, (i % 3) as f64])
            .collect();
        NutrientDataset::new(nutrients, vec![12.0, 8.0, 5.0], vec![20.0, 14.0, 9.0]).unwrap()
    }

    fn running() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(true))
    }

    fn small_config() -> GAConfig {
        GAConfig::builder()
            .bundle_size(4)
            .population_size(40)
            .generations(8)
            .tournament_size(3)
            .seed(42)
            .build()
            .unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = GAConfig::default();
        assert_eq!(config.bundle_size(), 6);
        assert_eq!(config.population_size(), 300);
        assert_eq!(config.generations(), 2);
        assert_eq!(config.crossover_prob(), 0.5);
        assert_eq!(config.mutation_prob(), 0.2);
        assert_eq!(config.tournament_size(), 10);
        assert!(config.max_duration().is_none());
    }

    #[test]
    fn test_builder_rejects_invalid_values() {
        assert!(matches!(
            GAConfig::builder().bundle_size(0).build(),
            Err(DietError::Configuration(_))
        ));
        assert!(GAConfig::builder().population_size(0).build().is_err());
        assert!(GAConfig::builder().tournament_size(0).build().is_err());
        assert!(GAConfig::builder().crossover_prob(1.5).build().is_err());
        assert!(GAConfig::builder().mutation_prob(-0.1).build().is_err());
        assert!(GAConfig::builder().mutation_prob(f64::NAN).build().is_err());
        assert!(GAConfig::builder().generations(0).build().is_ok());
    }

    #[test]
    fn test_from_param() {
        let mut param = Param::default();
        param.ga.bundle_size = 3;
        param.ga.max_duration_secs = 5;
        param.general.seed = 7;
        let config = GAConfig::from_param(&param).unwrap();
        assert_eq!(config.bundle_size(), 3);
        assert_eq!(config.seed(), 7);
        assert_eq!(config.max_duration(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_tournament_select_prefers_low_fitness() {
        let pop = Population::test_with_fits(&[5.0, 4.0, 3.0, 2.0, 1.0, 0.0]);
        let config = GAConfig::builder()
            .population_size(50)
            .tournament_size(6)
            .build()
            .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let parents = tournament_select(&pop, &config, &mut rng);
        assert_eq!(parents.individuals.len(), 50);
        let mean: f64 = parents.individuals.iter().map(|i| i.fit).sum::<f64>() / 50.0;
        assert!(
            mean < 2.5,
            "mean parent fitness {} should beat the population mean",
            mean
        );
    }

    #[test]
    fn test_tournament_of_one_is_uniform_sampling() {
        let pop = Population::test_with_fits(&[1.0, 1.0, 1.0]);
        let config = GAConfig::builder()
            .population_size(300)
            .tournament_size(1)
            .build()
            .unwrap();
        let parents = tournament_select(&pop, &config, &mut ChaCha8Rng::seed_from_u64(1));
        for n in 0..3 {
            assert!(parents.individuals.iter().any(|i| i.foods == vec![n, n]));
        }
    }

    #[test]
    fn test_tournament_tie_keeps_first_drawn() {
        let pop = Population::test_with_fits(&[0.0, 0.0]);
        let config = GAConfig::builder()
            .population_size(20)
            .tournament_size(2)
            .build()
            .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut replay = rng.clone();
        let parents = tournament_select(&pop, &config, &mut rng);
        for parent in &parents.individuals {
            let first: usize = replay.gen_range(0..2);
            let _second: usize = replay.gen_range(0..2);
            assert_eq!(parent.foods, vec![first, first]);
        }
    }

    #[test]
    fn test_two_point_crossover_swaps_one_segment() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..100 {
            let mut a = Individual::from_foods(vec![0, 0, 0, 0, 0, 0]);
            let mut b = Individual::from_foods(vec![1, 1, 1, 1, 1, 1]);
            two_point_crossover(&mut a, &mut b, &mut rng);

            for slot in 0..6 {
                assert_eq!(a.foods[slot] + b.foods[slot], 1);
            }
            // slot 0 is never swapped
            assert_eq!(a.foods[0], 0);
            let swapped: Vec<usize> = (0..6).filter(|&s| a.foods[s] == 1).collect();
            assert!(!swapped.is_empty());
            assert!(swapped.windows(2).all(|w| w[1] == w[0] + 1));
        }
    }

    #[test]
    fn test_two_point_crossover_short_bundles() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut a = Individual::from_foods(vec![0]);
        let mut b = Individual::from_foods(vec![1]);
        two_point_crossover(&mut a, &mut b, &mut rng);
        assert_eq!(a.foods, vec![0]);
        assert_eq!(b.foods, vec![1]);

        let mut a = Individual::from_foods(vec![0, 0]);
        let mut b = Individual::from_foods(vec![1, 1]);
        two_point_crossover(&mut a, &mut b, &mut rng);
        assert_eq!(a.foods, vec![0, 1]);
        assert_eq!(b.foods, vec![1, 0]);
    }

    #[test]
    fn test_uniform_mutation_extremes() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut i = Individual::from_foods(vec![3; 50]);
        uniform_mutation(&mut i, 0.0, 5, &mut rng);
        assert_eq!(i.foods, vec![3; 50]);

        uniform_mutation(&mut i, 1.0, 3, &mut rng);
        assert!(i.foods.iter().all(|&f| f < 3));
    }

    #[test]
    fn test_cross_over_keeps_size_and_tracks_parents() {
        let parents = Population::test_with_fits(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let config = GAConfig::builder().crossover_prob(1.0).build().unwrap();
        let children = cross_over(&parents, &config, 3, &mut ChaCha8Rng::seed_from_u64(1));
        assert_eq!(children.individuals.len(), 5);
        assert!(children.individuals[..4].iter().all(|c| c.parents.is_some()));
        // odd one out is copied
        assert!(children.individuals[4].parents.is_none());
        assert_eq!(children.individuals[4].foods, vec![4, 4]);
        assert!(children
            .individuals
            .iter()
            .all(|c| c.epoch == 3 && c.fit.is_infinite()));

        let config = GAConfig::builder().crossover_prob(0.0).build().unwrap();
        let copies = cross_over(&parents, &config, 1, &mut ChaCha8Rng::seed_from_u64(1));
        for (c, p) in copies.individuals.iter().zip(&parents.individuals) {
            assert_eq!(c.foods, p.foods);
        }
    }

    #[test]
    fn test_ga_bundles_shape_and_range() {
        let data = wide_dataset();
        let config = small_config();
        let pool = WorkerPool::new(2);
        let result = ga(&data, None, &config, &pool, running()).unwrap();

        assert_eq!(result.population.individuals.len(), 40);
        assert_eq!(result.generations.len(), 9);
        assert!(result.truncated.is_none());
        for i in &result.population.individuals {
            assert_eq!(i.foods.len(), 4);
            assert!(i.foods.iter().all(|&f| f < data.food_len));
            assert_eq!(i.fit, i.evaluate(&data));
        }
        let min = result
            .population
            .individuals
            .iter()
            .map(|i| i.fit)
            .fold(f64::INFINITY, f64::min);
        assert_eq!(result.best.fit, min);
        assert_eq!(result.generations.last().unwrap().min, min);
    }

    #[test]
    fn test_ga_is_deterministic() {
        let data = wide_dataset();
        let config = small_config();
        let pool = WorkerPool::new(2);
        let a = ga(&data, None, &config, &pool, running()).unwrap();
        let b = ga(&data, None, &config, &pool, running()).unwrap();
        assert_eq!(a.best.foods, b.best.foods);
        assert_eq!(a.generations, b.generations);
    }

    #[test]
    fn test_ga_finds_zero_violation_on_worked_dataset() {
        let data = worked_dataset();
        let config = GAConfig::builder()
            .bundle_size(3)
            .population_size(60)
            .generations(15)
            .tournament_size(3)
            .seed(42)
            .build()
            .unwrap();
        let result = ga(&data, None, &config, &WorkerPool::new(1), running()).unwrap();
        // [0,0,1] and its permutations meet every bound at unit portions
        assert_eq!(result.best.fit, 0.0);
    }

    #[test]
    fn test_ga_rejects_empty_catalog() {
        let mut data = worked_dataset();
        data.nutrients.clear();
        data.food_len = 0;
        let res = ga(&data, None, &small_config(), &WorkerPool::new(1), running());
        assert!(matches!(res, Err(DietError::Configuration(_))));
    }

    #[test]
    fn test_ga_stops_on_signal() {
        let data = wide_dataset();
        let flag = Arc::new(AtomicBool::new(false));
        let result = ga(&data, None, &small_config(), &WorkerPool::new(1), flag).unwrap();
        let truncation = result.truncated.unwrap();
        assert_eq!(truncation.reason, TruncationReason::Signal);
        assert_eq!(truncation.completed, 0);
        assert_eq!(truncation.requested, 8);
        assert_eq!(result.generations.len(), 1);
    }

    #[test]
    fn test_ga_stops_on_time_limit() {
        let data = wide_dataset();
        let config = GAConfig::builder()
            .bundle_size(4)
            .population_size(20)
            .generations(5)
            .max_duration(Duration::from_nanos(1))
            .build()
            .unwrap();
        let result = ga(&data, None, &config, &WorkerPool::new(1), running()).unwrap();
        assert_eq!(
            result.truncated.unwrap().reason,
            TruncationReason::TimeLimit
        );
    }

    #[test]
    fn test_ga_uses_and_validates_seeds() {
        let data = worked_dataset();
        let config = GAConfig::builder()
            .bundle_size(3)
            .population_size(10)
            .generations(0)
            .build()
            .unwrap();
        let pool = WorkerPool::new(1);

        let seeds = FixedSeeds(vec![vec![0, 0, 1]]);
        let result = ga(&data, Some(&seeds), &config, &pool, running()).unwrap();
        assert_eq!(result.population.individuals.len(), 10);
        assert_eq!(result.best.foods, vec![0, 0, 1]);
        assert_eq!(result.generations[0].evaluations, 10);

        let bad_length = FixedSeeds(vec![vec![0, 1]]);
        assert!(ga(&data, Some(&bad_length), &config, &pool, running()).is_err());
        let bad_food = FixedSeeds(vec![vec![0, 1, 3]]);
        assert!(ga(&data, Some(&bad_food), &config, &pool, running()).is_err());
    }

    #[test]
    fn test_custom_operators_are_used() {
        fn keep_first(pop: &Population, config: &GAConfig, _rng: &mut ChaCha8Rng) -> Population {
            let mut parents = Population::new();
            for _ in 0..config.population_size() {
                parents.individuals.push(pop.individuals[0].clone());
            }
            parents
        }
        fn no_mutation(_i: &mut Individual, _p: f64, _n: usize, _rng: &mut ChaCha8Rng) {}

        let data = wide_dataset();
        let config = GAConfig::builder()
            .bundle_size(4)
            .population_size(10)
            .generations(3)
            .selection(keep_first)
            .mutation(no_mutation)
            .build()
            .unwrap();
        let result = ga(&data, None, &config, &WorkerPool::new(1), running()).unwrap();
        let first = &result.population.individuals[0].foods;
        assert!(result
            .population
            .individuals
            .iter()
            .all(|i| &i.foods == first));
    }
}
