use crate::error::DietError;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;

/// Below this many generations the search rarely settles; the run is allowed but flagged.
pub const FEW_GENERATIONS_WARNING: usize = 10;

// Field definitions and associated default values

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Param {
    #[serde(default)]
    pub general: General,
    #[serde(default)]
    pub data: Data,
    #[serde(default)]
    pub ga: GA,
    #[serde(default)]
    pub portion: Portion,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct General {
    #[serde(default = "seed_default")]
    pub seed: u64,
    #[serde(default = "uzero_default")]
    pub thread_number: usize,
    #[serde(default = "empty_string")]
    pub log_base: String,
    #[serde(default = "log_suffix_default")]
    pub log_suffix: String,
    #[serde(default = "log_level_default")]
    pub log_level: String,
    #[serde(default = "true_default")]
    pub display_colorful: bool,
    #[serde(default = "empty_string")]
    pub save_exp: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Data {
    #[serde(default = "foods_default")]
    pub foods: String,
    #[serde(default = "bounds_default")]
    pub bounds: String,
    #[serde(default = "energy_nutrient_default")]
    pub energy_nutrient: String,
    #[serde(default = "empty_string")]
    pub cluster_cache: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GA {
    #[serde(default = "bundle_size_default")]
    pub bundle_size: usize,
    #[serde(default = "pop_size_default")]
    pub population_size: usize,
    #[serde(default = "generations_default")]
    pub generations: usize,
    #[serde(default = "crossover_prob_default")]
    pub crossover_prob: f64,
    #[serde(default = "mutation_prob_default")]
    pub mutation_prob: f64,
    #[serde(default = "tournament_size_default")]
    pub tournament_size: usize,
    #[serde(default = "uzero_u64_default")]
    pub max_duration_secs: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Portion {
    #[serde(default = "epsilon_default")]
    pub epsilon: f64,
    #[serde(default = "feasibility_tolerance_default")]
    pub feasibility_tolerance: f64,
}

// Default section definitions

impl Default for General {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Default for Data {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Default for GA {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Default for Portion {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Default for Param {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

/// Read a YAML parameter file and validate it.
pub fn get(param_file: &str) -> Result<Param, DietError> {
    let mut config = read(param_file)?;

    validate(&mut config)?;

    Ok(config)
}

/// Read a YAML parameter file without validating it.
pub fn read(param_file: &str) -> Result<Param, DietError> {
    let param_file_reader = File::open(param_file)?;
    let param_reader = BufReader::new(param_file_reader);

    Ok(serde_yaml::from_reader(param_reader)?)
}

pub fn validate(param: &mut Param) -> Result<(), DietError> {
    if !param.general.log_base.is_empty() {
        param.general.display_colorful = false;
    }

    if param.data.foods.is_empty() || param.data.bounds.is_empty() {
        return Err(DietError::Configuration(
            "Both data.foods and data.bounds must be provided.".to_string(),
        ));
    }

    validate_ga(param)?;
    validate_portion(param)?;
    Ok(())
}

fn validate_ga(param: &Param) -> Result<(), DietError> {
    let ga = &param.ga;

    if ga.bundle_size == 0 {
        return Err(DietError::Configuration(
            "Invalid bundle_size=0. Must be >= 1.".to_string(),
        ));
    }

    if ga.population_size == 0 {
        return Err(DietError::Configuration(
            "Invalid population_size=0. Must be >= 1.".to_string(),
        ));
    }

    if ga.tournament_size == 0 {
        return Err(DietError::Configuration(
            "Invalid tournament_size=0. Must be >= 1.".to_string(),
        ));
    }

    for (name, value) in [
        ("crossover_prob", ga.crossover_prob),
        ("mutation_prob", ga.mutation_prob),
    ] {
        if !(0.0..=1.0).contains(&value) {
            return Err(DietError::Configuration(format!(
                "Invalid {}={:.3}. Must be in range [0, 1].",
                name, value
            )));
        }
    }

    if ga.generations < FEW_GENERATIONS_WARNING {
        warn!(
            "Only {} generation(s) requested for a population of {}: the search will likely stop \
            before converging. Raise ga.generations if the plan quality matters.",
            ga.generations, ga.population_size
        );
    }

    if ga.tournament_size > ga.population_size {
        warn!(
            "tournament_size={} exceeds population_size={}: every tournament will almost surely \
            return the current best bundle.",
            ga.tournament_size, ga.population_size
        );
    }

    Ok(())
}

fn validate_portion(param: &Param) -> Result<(), DietError> {
    let portion = &param.portion;

    if !(portion.epsilon >= 0.0) {
        return Err(DietError::Configuration(format!(
            "Invalid portion.epsilon={}. Must be >= 0.",
            portion.epsilon
        )));
    }

    if !(portion.feasibility_tolerance >= 0.0) {
        return Err(DietError::Configuration(format!(
            "Invalid portion.feasibility_tolerance={}. Must be >= 0.",
            portion.feasibility_tolerance
        )));
    }

    Ok(())
}

// Default value definitions

fn seed_default() -> u64 {
    4815162342
}
fn empty_string() -> String {
    "".to_string()
}
fn log_suffix_default() -> String {
    "log".to_string()
}
fn log_level_default() -> String {
    "info".to_string()
}
fn true_default() -> bool {
    true
}
fn uzero_default() -> usize {
    0
}
fn uzero_u64_default() -> u64 {
    0
}
fn foods_default() -> String {
    "samples/foods.tsv".to_string()
}
fn bounds_default() -> String {
    "samples/bounds.tsv".to_string()
}
fn energy_nutrient_default() -> String {
    "208".to_string()
}
fn bundle_size_default() -> usize {
    6
}
fn pop_size_default() -> usize {
    300
}
fn generations_default() -> usize {
    2
}
fn crossover_prob_default() -> f64 {
    0.5
}
fn mutation_prob_default() -> f64 {
    0.2
}
fn tournament_size_default() -> usize {
    10
}
fn epsilon_default() -> f64 {
    1e-6
}
fn feasibility_tolerance_default() -> f64 {
    1e-6
}
