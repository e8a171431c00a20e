use crate::error::DietError;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;

/// Food x nutrient table with per-nutrient bounds.
///
/// Rows are foods, columns are nutrient channels. Values are amounts per
/// portion unit (100 g for USDA-style tables).
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct NutrientDataset {
    /// One nutrient vector per food
    pub nutrients: Vec<Vec<f64>>,
    /// Per-channel lower bound
    pub required: Vec<f64>,
    /// Per-channel upper bound, may be infinite
    pub limit: Vec<f64>,
    /// Food identifiers (first column of the foods table)
    pub food_ids: Vec<String>,
    /// Food long descriptions
    pub food_desc: Vec<String>,
    /// Nutrient channel identifiers (foods table header)
    pub channels: Vec<String>,
    /// Nutrient channel descriptions
    pub channel_desc: Vec<String>,
    /// Channel holding energy per portion unit, used to derive calories
    pub energy_channel: Option<usize>,
    pub food_len: usize,
    pub channel_len: usize,
}

impl NutrientDataset {
    /// Build a dataset from in-memory vectors, generating placeholder names.
    pub fn new(
        nutrients: Vec<Vec<f64>>,
        required: Vec<f64>,
        limit: Vec<f64>,
    ) -> Result<NutrientDataset, DietError> {
        let food_len = nutrients.len();
        let channel_len = required.len();
        let data = NutrientDataset {
            food_ids: (0..food_len).map(|i| format!("food_{}", i)).collect(),
            food_desc: (0..food_len).map(|i| format!("Food {}", i)).collect(),
            channels: (0..channel_len).map(|j| format!("nutrient_{}", j)).collect(),
            channel_desc: (0..channel_len).map(|j| format!("Nutrient {}", j)).collect(),
            nutrients,
            required,
            limit,
            energy_channel: None,
            food_len,
            channel_len,
        };
        data.check()?;
        Ok(data)
    }

    pub fn with_food_descriptions(mut self, food_desc: Vec<String>) -> Result<Self, DietError> {
        if food_desc.len() != self.food_len {
            return Err(DietError::Configuration(format!(
                "{} descriptions given for {} foods",
                food_desc.len(),
                self.food_len
            )));
        }
        self.food_desc = food_desc;
        Ok(self)
    }

    pub fn with_energy_channel(mut self, channel: usize) -> Result<Self, DietError> {
        if channel >= self.channel_len {
            return Err(DietError::Configuration(format!(
                "Energy channel {} out of range (dataset has {} channels)",
                channel, self.channel_len
            )));
        }
        self.energy_channel = Some(channel);
        Ok(self)
    }

    /// Load the foods and bounds tables (tab separated, with header).
    ///
    /// # Arguments
    ///
    /// * `foods_path` - `food_id, description, <channel>...` one row per food.
    /// * `bounds_path` - `nutrient, description, required, limit` one row per channel.
    /// * `energy_nutrient` - channel id holding energy; empty to disable calories.
    ///
    /// # Errors
    ///
    /// `DietError::Dataset` for malformed content, `DietError::Csv` when a file cannot be opened.
    pub fn load(
        foods_path: &str,
        bounds_path: &str,
        energy_nutrient: &str,
    ) -> Result<NutrientDataset, DietError> {
        info!("Loading files {} and {}...", foods_path, bounds_path);

        let mut foods_reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .from_path(foods_path)?;

        let header = foods_reader
            .headers()
            .map_err(|e| DietError::Dataset(format!("{}: {}", foods_path, e)))?
            .clone();
        if header.len() < 3 {
            return Err(DietError::Dataset(format!(
                "{}: expected food_id, description and at least one nutrient column",
                foods_path
            )));
        }
        let channels: Vec<String> = header.iter().skip(2).map(|s| s.trim().to_string()).collect();

        let mut food_ids = Vec::new();
        let mut food_desc = Vec::new();
        let mut nutrients = Vec::new();
        for (line, record) in foods_reader.records().enumerate() {
            let record = record.map_err(|e| DietError::Dataset(format!("{}: {}", foods_path, e)))?;
            food_ids.push(record.get(0).unwrap_or("").trim().to_string());
            food_desc.push(record.get(1).unwrap_or("").trim().to_string());
            let row = record
                .iter()
                .skip(2)
                .map(|cell| parse_cell(cell, 0.0))
                .collect::<Result<Vec<f64>, String>>()
                .map_err(|e| {
                    DietError::Dataset(format!("{} line {}: {}", foods_path, line + 2, e))
                })?;
            nutrients.push(row);
        }

        let mut bounds_reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .from_path(bounds_path)?;

        let mut bounds: HashMap<String, (String, f64, f64)> = HashMap::new();
        for (line, record) in bounds_reader.records().enumerate() {
            let record =
                record.map_err(|e| DietError::Dataset(format!("{}: {}", bounds_path, e)))?;
            let location = format!("{} line {}", bounds_path, line + 2);
            if record.len() < 4 {
                return Err(DietError::Dataset(format!(
                    "{}: expected nutrient, description, required and limit",
                    location
                )));
            }
            let id = record[0].trim().to_string();
            let required = parse_cell(&record[2], f64::NAN)
                .map_err(|e| DietError::Dataset(format!("{}: {}", location, e)))?;
            let limit = parse_cell(&record[3], f64::INFINITY)
                .map_err(|e| DietError::Dataset(format!("{}: {}", location, e)))?;
            if bounds
                .insert(id.clone(), (record[1].trim().to_string(), required, limit))
                .is_some()
            {
                return Err(DietError::Dataset(format!(
                    "{}: nutrient {} has several bound rows",
                    location, id
                )));
            }
        }

        // Reorder bounds to follow the foods header
        let mut channel_desc = Vec::with_capacity(channels.len());
        let mut required = Vec::with_capacity(channels.len());
        let mut limit = Vec::with_capacity(channels.len());
        for channel in &channels {
            match bounds.remove(channel) {
                Some((desc, r, l)) => {
                    channel_desc.push(desc);
                    required.push(r);
                    limit.push(l);
                }
                None => {
                    return Err(DietError::Dataset(format!(
                        "Nutrient {} has no row in {}",
                        channel, bounds_path
                    )))
                }
            }
        }
        if !bounds.is_empty() {
            let mut unused: Vec<&String> = bounds.keys().collect();
            unused.sort();
            warn!(
                "Bounds given for nutrients absent from {}: {:?}",
                foods_path, unused
            );
        }

        let energy_channel = if energy_nutrient.is_empty() {
            None
        } else {
            match channels.iter().position(|c| c == energy_nutrient) {
                Some(j) => Some(j),
                None => {
                    return Err(DietError::Dataset(format!(
                        "Energy nutrient {} is not a column of {}",
                        energy_nutrient, foods_path
                    )))
                }
            }
        };

        let data = NutrientDataset {
            food_len: nutrients.len(),
            channel_len: channels.len(),
            nutrients,
            required,
            limit,
            food_ids,
            food_desc,
            channels,
            channel_desc,
            energy_channel,
        };
        data.check()?;

        Ok(data)
    }

    /// Reject datasets the search and the LP cannot work with.
    pub fn check(&self) -> Result<(), DietError> {
        if self.food_len == 0 {
            return Err(DietError::Configuration("Food catalog is empty".to_string()));
        }
        if self.channel_len == 0 {
            return Err(DietError::Dataset("No nutrient channel".to_string()));
        }
        if self.limit.len() != self.channel_len {
            return Err(DietError::Configuration(format!(
                "Bound vectors differ in length: {} required, {} limit",
                self.channel_len,
                self.limit.len()
            )));
        }

        for (i, row) in self.nutrients.iter().enumerate() {
            if row.len() != self.channel_len {
                return Err(DietError::Configuration(format!(
                    "Food {} has {} nutrient values, bounds cover {} channels",
                    self.food_ids[i],
                    row.len(),
                    self.channel_len
                )));
            }
            if let Some(j) = row.iter().position(|v| !v.is_finite() || *v < 0.0) {
                return Err(DietError::Dataset(format!(
                    "Food {} has invalid value {} for nutrient {}",
                    self.food_ids[i], row[j], self.channels[j]
                )));
            }
        }

        for j in 0..self.channel_len {
            if !self.required[j].is_finite() {
                return Err(DietError::Dataset(format!(
                    "Nutrient {} has a non-finite required value",
                    self.channels[j]
                )));
            }
            if self.limit[j].is_nan() {
                return Err(DietError::Dataset(format!(
                    "Nutrient {} has an undefined limit",
                    self.channels[j]
                )));
            }
            if self.required[j] > self.limit[j] {
                warn!(
                    "Nutrient {} requires {} but is limited to {}: every plan will be infeasible",
                    self.channels[j], self.required[j], self.limit[j]
                );
            }
        }

        Ok(())
    }

    /// Nutrient vector of one food
    pub fn food_nutrients(&self, food: usize) -> &[f64] {
        &self.nutrients[food]
    }

    /// Energy per portion unit, 0 when no energy channel is known
    pub fn energy(&self, food: usize) -> f64 {
        self.energy_channel
            .map(|j| self.nutrients[food][j])
            .unwrap_or(0.0)
    }

    /// SHA-256 digest of the nutrient table and bounds.
    pub fn fingerprint(&self) -> Result<String, DietError> {
        let serialized = bincode::serialize(&(&self.nutrients, &self.required, &self.limit))?;
        let mut hasher = Sha256::new();
        hasher.update(serialized);
        Ok(format!("{:x}", hasher.finalize()))
    }
}

fn parse_cell(cell: &str, empty: f64) -> Result<f64, String> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Ok(empty);
    }
    cell.parse::<f64>()
        .map_err(|_| format!("'{}' is not a number", cell))
}

impl fmt::Debug for NutrientDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bounded = self.limit.iter().filter(|l| l.is_finite()).count();
        write!(
            f,
            "NutrientDataset: {} foods x {} nutrients ({} with an upper limit), energy channel: {}",
            self.food_len,
            self.channel_len,
            bounded,
            self.energy_channel
                .map(|j| self.channels[j].as_str())
                .unwrap_or("none")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_fixture(name: &str, content: &str) -> String {
        let path = std::env::temp_dir().join(name);
        std::fs::write(&path, content).unwrap();
        path.to_str().unwrap().to_string()
    }

    #[test]
    fn test_new_rejects_empty_catalog() {
        let result = NutrientDataset::new(vec![], vec![1.0], vec![2.0]);
        assert!(matches!(result, Err(DietError::Configuration(_))));
    }

    #[test]
    fn test_new_rejects_mismatched_bounds() {
        let result = NutrientDataset::new(vec![vec![1.0, 2.0]], vec![1.0, 1.0], vec![2.0]);
        assert!(matches!(result, Err(DietError::Configuration(_))));

        let result = NutrientDataset::new(vec![vec![1.0]], vec![1.0, 1.0], vec![2.0, 2.0]);
        assert!(matches!(result, Err(DietError::Configuration(_))));
    }

    #[test]
    fn test_new_rejects_negative_or_nan_values() {
        let result = NutrientDataset::new(vec![vec![-1.0]], vec![1.0], vec![2.0]);
        assert!(matches!(result, Err(DietError::Dataset(_))));

        let result = NutrientDataset::new(vec![vec![f64::NAN]], vec![1.0], vec![2.0]);
        assert!(matches!(result, Err(DietError::Dataset(_))));
    }

    #[test]
    fn test_inverted_bounds_are_accepted() {
        let data = NutrientDataset::new(vec![vec![1.0]], vec![5.0], vec![2.0]).unwrap();
        assert_eq!(data.required[0], 5.0);
        assert_eq!(data.limit[0], 2.0);
    }

    #[test]
    fn test_load_reorders_bounds_and_reads_energy() {
        let foods = write_fixture(
            "gdiet_data_load_foods.tsv",
            "food_id\tdescription\t208\t203\n\
             01001\tButter, salted\t717\t0.85\n\
             01009\tCheese, cheddar\t403\t\n",
        );
        let bounds = write_fixture(
            "gdiet_data_load_bounds.tsv",
            "nutrient\tdescription\trequired\tlimit\n\
             203\tProtein\t50\t\n\
             208\tEnergy\t1800\t2200\n",
        );

        let data = NutrientDataset::load(&foods, &bounds, "208").unwrap();
        assert_eq!(data.food_len, 2);
        assert_eq!(data.channel_len, 2);
        assert_eq!(data.channels, vec!["208", "203"]);
        assert_eq!(data.required, vec![1800.0, 50.0]);
        assert_eq!(data.limit[0], 2200.0);
        assert!(data.limit[1].is_infinite());
        assert_eq!(data.nutrients[1], vec![403.0, 0.0]);
        assert_eq!(data.food_desc[0], "Butter, salted");
        assert_eq!(data.energy_channel, Some(0));
        assert_eq!(data.energy(1), 403.0);
    }

    #[test]
    fn test_load_missing_bound_row_is_dataset_error() {
        let foods = write_fixture(
            "gdiet_data_missing_foods.tsv",
            "food_id\tdescription\t208\t203\n01001\tButter\t717\t0.85\n",
        );
        let bounds = write_fixture(
            "gdiet_data_missing_bounds.tsv",
            "nutrient\tdescription\trequired\tlimit\n208\tEnergy\t1800\t2200\n",
        );
        let result = NutrientDataset::load(&foods, &bounds, "208");
        assert!(matches!(result, Err(DietError::Dataset(_))));
    }

    #[test]
    fn test_load_non_numeric_value_is_dataset_error() {
        let foods = write_fixture(
            "gdiet_data_bad_foods.tsv",
            "food_id\tdescription\t208\n01001\tButter\tlots\n",
        );
        let bounds = write_fixture(
            "gdiet_data_bad_bounds.tsv",
            "nutrient\tdescription\trequired\tlimit\n208\tEnergy\t1800\t2200\n",
        );
        let result = NutrientDataset::load(&foods, &bounds, "");
        assert!(matches!(result, Err(DietError::Dataset(_))));
    }

    #[test]
    fn test_load_unknown_energy_channel() {
        let foods = write_fixture(
            "gdiet_data_energy_foods.tsv",
            "food_id\tdescription\t203\n01001\tButter\t0.85\n",
        );
        let bounds = write_fixture(
            "gdiet_data_energy_bounds.tsv",
            "nutrient\tdescription\trequired\tlimit\n203\tProtein\t50\t100\n",
        );
        assert!(NutrientDataset::load(&foods, &bounds, "208").is_err());
        let data = NutrientDataset::load(&foods, &bounds, "").unwrap();
        assert_eq!(data.energy(0), 0.0);
    }

    #[test]
    fn test_load_header_only_foods_is_rejected() {
        let foods = write_fixture(
            "gdiet_data_empty_foods.tsv",
            "food_id\tdescription\t208\n",
        );
        let bounds = write_fixture(
            "gdiet_data_empty_bounds.tsv",
            "nutrient\tdescription\trequired\tlimit\n208\tEnergy\t1800\t2200\n",
        );
        assert!(NutrientDataset::load(&foods, &bounds, "208").is_err());
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = NutrientDataset::new(vec![vec![1.0, 2.0]], vec![1.0, 1.0], vec![3.0, 3.0]).unwrap();
        let b = a.clone();
        let c = NutrientDataset::new(vec![vec![1.0, 2.5]], vec![1.0, 1.0], vec![3.0, 3.0]).unwrap();
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        assert_ne!(a.fingerprint().unwrap(), c.fingerprint().unwrap());
        assert_eq!(a.fingerprint().unwrap().len(), 64);
    }

    #[test]
    fn test_with_descriptions_and_energy() {
        let data = NutrientDataset::new(vec![vec![1.0, 90.0], vec![2.0, 10.0]], vec![0.0, 0.0], vec![5.0, 500.0])
            .unwrap()
            .with_food_descriptions(vec!["Oats".to_string(), "Milk".to_string()])
            .unwrap()
            .with_energy_channel(1)
            .unwrap();
        assert_eq!(data.food_desc[1], "Milk");
        assert_eq!(data.energy(0), 90.0);
        assert!(data.clone().with_energy_channel(2).is_err());
        assert!(data.with_food_descriptions(vec![]).is_err());
    }
}
