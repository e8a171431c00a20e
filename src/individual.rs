use crate::data::NutrientDataset;
use crate::fitness;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Candidate diet: a fixed-length sequence of food identifiers
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct Individual {
    /// Food identifiers, one per slot; duplicates are independent slots
    pub foods: Vec<usize>,
    /// Total nutrient bound violation at unit portions (lower is better)
    pub fit: f64,
    /// Generation that produced this bundle
    pub epoch: usize,
    /// Hashes of the two parents when produced by crossover
    pub parents: Option<Vec<u64>>,
    /// Identifier hash of the slot sequence
    pub hash: u64,
}

impl Individual {
    pub fn new() -> Individual {
        Individual {
            foods: Vec::new(),
            fit: f64::INFINITY,
            epoch: 0,
            parents: None,
            hash: 0,
        }
    }

    pub fn from_foods(foods: Vec<usize>) -> Individual {
        let mut i = Individual::new();
        i.foods = foods;
        i.compute_hash();
        i
    }

    /// Draw every slot uniformly from `[0, food_len)`.
    pub fn random(bundle_size: usize, food_len: usize, rng: &mut ChaCha8Rng) -> Individual {
        Individual::from_foods((0..bundle_size).map(|_| rng.gen_range(0..food_len)).collect())
    }

    /// A fresh copy of `parent` waiting for evaluation.
    pub fn child(parent: &Individual, epoch: usize) -> Individual {
        let mut i = parent.clone();
        i.fit = f64::INFINITY;
        i.epoch = epoch;
        i.parents = None;
        i
    }

    pub fn compute_hash(&mut self) {
        let mut hasher = DefaultHasher::new();
        self.foods.hash(&mut hasher);
        self.hash = hasher.finish();
    }

    pub fn evaluate(&self, data: &NutrientDataset) -> f64 {
        fitness::evaluate(&self.foods, data)
    }

    pub fn profile(&self, data: &NutrientDataset) -> Vec<f64> {
        fitness::profile(&self.foods, data)
    }

    /// Whether every slot names a food of `data`.
    pub fn check_compatibility(&self, data: &NutrientDataset) -> bool {
        self.foods.iter().all(|&f| f < data.food_len)
    }

    pub fn display(&self, data: &NutrientDataset) -> String {
        let names: Vec<&str> = self
            .foods
            .iter()
            .map(|&f| data.food_desc.get(f).map(|s| s.as_str()).unwrap_or("?"))
            .collect();
        format!("fit {:.4} [{}]", self.fit, names.join(" | "))
    }
}

impl fmt::Debug for Individual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Individual {{ foods: {:?}, fit: {:.4}, epoch: {} }}",
            self.foods, self.fit, self.epoch
        )
    }
}
