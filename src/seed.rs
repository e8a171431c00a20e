use crate::data::NutrientDataset;
use crate::error::DietError;
use log::info;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Supplies bundles for the initial population instead of pure random draws.
pub trait SeedProvider: Send + Sync {
    /// Return up to `count` bundles of `bundle_size` food identifiers.
    fn seed(
        &self,
        data: &NutrientDataset,
        bundle_size: usize,
        count: usize,
        rng: &mut ChaCha8Rng,
    ) -> Result<Vec<Vec<usize>>, DietError>;
}

/// Fixed list of bundles, mostly useful to resume from a previous run.
pub struct FixedSeeds(pub Vec<Vec<usize>>);

impl SeedProvider for FixedSeeds {
    fn seed(
        &self,
        _data: &NutrientDataset,
        _bundle_size: usize,
        count: usize,
        _rng: &mut ChaCha8Rng,
    ) -> Result<Vec<Vec<usize>>, DietError> {
        Ok(self.0.iter().take(count).cloned().collect())
    }
}

/// Food clustering computed offline, one cluster id per food.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ClusterCache {
    /// Fingerprint of the dataset the clustering was computed on
    pub fingerprint: String,
    pub assignments: Vec<usize>,
}

impl ClusterCache {
    pub fn new(data: &NutrientDataset, assignments: Vec<usize>) -> Result<ClusterCache, DietError> {
        let cache = ClusterCache {
            fingerprint: data.fingerprint()?,
            assignments,
        };
        cache.check_compatibility(data)?;
        Ok(cache)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<ClusterCache, DietError> {
        let bytes = fs::read(path)?;
        Ok(bincode::deserialize(&bytes)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), DietError> {
        let encoded = bincode::serialize(self)?;
        fs::write(path, encoded)?;
        Ok(())
    }

    pub fn check_compatibility(&self, data: &NutrientDataset) -> Result<(), DietError> {
        if self.assignments.len() != data.food_len {
            return Err(DietError::Dataset(format!(
                "Cluster cache covers {} foods, dataset has {}",
                self.assignments.len(),
                data.food_len
            )));
        }
        // There can be no more clusters than foods
        if let Some(cluster) = self.assignments.iter().find(|&&c| c >= data.food_len) {
            return Err(DietError::Dataset(format!(
                "Cluster id {} out of range for {} foods",
                cluster, data.food_len
            )));
        }
        if self.fingerprint != data.fingerprint()? {
            return Err(DietError::Dataset(
                "Cluster cache was computed on another dataset".to_string(),
            ));
        }
        Ok(())
    }

    /// Food identifiers grouped by cluster, empty clusters dropped.
    pub fn members(&self) -> Vec<Vec<usize>> {
        let cluster_len = self.assignments.iter().max().map(|m| m + 1).unwrap_or(0);
        let mut members = vec![Vec::new(); cluster_len];
        for (food, &cluster) in self.assignments.iter().enumerate() {
            members[cluster].push(food);
        }
        members.retain(|m| !m.is_empty());
        members
    }
}

/// Seeds bundles whose slots come from distinct clusters.
pub struct ClusterSeeds {
    members: Vec<Vec<usize>>,
}

impl ClusterSeeds {
    pub fn new(cache: &ClusterCache, data: &NutrientDataset) -> Result<ClusterSeeds, DietError> {
        cache.check_compatibility(data)?;
        let members = cache.members();
        info!(
            "Found cluster cache with {} clusters and {} foods",
            members.len(),
            cache.assignments.len()
        );
        Ok(ClusterSeeds { members })
    }

    pub fn from_file<P: AsRef<Path>>(path: P, data: &NutrientDataset) -> Result<ClusterSeeds, DietError> {
        ClusterSeeds::new(&ClusterCache::load(path)?, data)
    }

    pub fn cluster_len(&self) -> usize {
        self.members.len()
    }
}

impl SeedProvider for ClusterSeeds {
    fn seed(
        &self,
        _data: &NutrientDataset,
        bundle_size: usize,
        count: usize,
        rng: &mut ChaCha8Rng,
    ) -> Result<Vec<Vec<usize>>, DietError> {
        if self.members.is_empty() {
            return Ok(Vec::new());
        }

        let mut bundles = Vec::with_capacity(count);
        for _ in 0..count {
            let mut clusters: Vec<&Vec<usize>> = Vec::with_capacity(bundle_size);
            // distinct clusters first, then with replacement once they run out
            while clusters.len() < bundle_size {
                let take = (bundle_size - clusters.len()).min(self.members.len());
                clusters.extend(self.members.choose_multiple(rng, take));
            }
            let mut bundle = Vec::with_capacity(bundle_size);
            for cluster in clusters {
                if let Some(&food) = cluster.choose(rng) {
                    bundle.push(food);
                }
            }
            bundles.push(bundle);
        }
        Ok(bundles)
    }
}
