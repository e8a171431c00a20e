use crate::data::NutrientDataset;
use crate::individual::Individual;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Max, Median, Min};
use std::fmt;

#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct Population {
    pub individuals: Vec<Individual>,
}

/// Fitness summary of one generation
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GenerationStats {
    /// 0 for the initial population
    pub generation: usize,
    pub min: f64,
    pub median: f64,
    pub max: f64,
    /// Number of bundles evaluated to produce this generation
    pub evaluations: usize,
}

impl Population {
    pub fn new() -> Population {
        Population {
            individuals: Vec::new(),
        }
    }

    /// Append `population_size` uniformly random bundles.
    pub fn generate(
        &mut self,
        population_size: usize,
        bundle_size: usize,
        food_len: usize,
        rng: &mut ChaCha8Rng,
    ) {
        for _ in 0..population_size {
            self.individuals
                .push(Individual::random(bundle_size, food_len, rng));
        }
    }

    pub fn add(&mut self, population: Population) {
        self.individuals.extend(population.individuals);
    }

    pub fn compute_hash(&mut self) {
        for individual in &mut self.individuals {
            individual.compute_hash();
        }
    }

    /// Evaluate every bundle in parallel on the current rayon pool.
    pub fn fit(&mut self, data: &NutrientDataset) {
        self.individuals
            .par_iter_mut()
            .for_each(|i| i.fit = i.evaluate(data));
    }

    /// Stable ascending sort: the lowest violation comes first.
    pub fn sort(mut self) -> Self {
        self.individuals.sort_by(|i, j| i.fit.total_cmp(&j.fit));
        self
    }

    /// Lowest-fitness bundle; ties go to the first one found.
    pub fn best(&self) -> Option<&Individual> {
        let mut best: Option<&Individual> = None;
        for i in &self.individuals {
            match best {
                Some(b) if b.fit <= i.fit => {}
                _ => best = Some(i),
            }
        }
        best
    }

    pub fn stats(&self, generation: usize, evaluations: usize) -> GenerationStats {
        let fits = Data::new(self.individuals.iter().map(|i| i.fit).collect::<Vec<f64>>());
        GenerationStats {
            generation,
            min: fits.min(),
            median: fits.median(),
            max: fits.max(),
            evaluations,
        }
    }
}

impl fmt::Debug for Population {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Population of {} bundles", self.individuals.len())
    }
}
