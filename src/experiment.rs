use crate::ga::Truncation;
use crate::individual::Individual;
use crate::param::Param;
use crate::plan::PlanOutcome;
use crate::population::GenerationStats;
use crate::utils::{display_epoch, display_epoch_legend, strip_ansi};
use crate::{DietError, Optimization};
use chrono::Local;
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Record of one optimization run, persisted when `general.save_exp` is set.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Experiment {
    pub id: String,
    /// Package version and git short hash
    pub version: String,
    pub timestamp: String,
    pub parameters: Param,
    pub generations: Vec<GenerationStats>,
    pub best: Individual,
    pub truncated: Option<Truncation>,
    pub outcome: PlanOutcome,
    /// Seconds
    pub execution_time: f64,
}

pub fn version() -> String {
    format!(
        "{}#{}",
        env!("CARGO_PKG_VERSION"),
        option_env!("GDIET_GIT_SHA").unwrap_or("unknown")
    )
}

impl Experiment {
    pub fn new(param: &Param, optimization: Optimization, execution_time: f64) -> Experiment {
        let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
        let name = Path::new(&param.general.save_exp)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("gdiet");

        Experiment {
            id: format!("{}_{}", name, timestamp),
            version: version(),
            timestamp,
            parameters: param.clone(),
            generations: optimization.search.generations,
            best: optimization.search.best,
            truncated: optimization.search.truncated,
            outcome: optimization.outcome,
            execution_time,
        }
    }

    /// Terminal summary: generation table, best bundle and the plan.
    pub fn display(&self) -> String {
        let mut text = format!(
            "\x1b[1;97mExperiment {}\x1b[0m (gdiet {}, {:.2}s)\n",
            self.id, self.version, self.execution_time
        );
        text.push_str(&display_epoch_legend());
        text.push('\n');
        for stats in &self.generations {
            text.push_str(&display_epoch(stats));
            text.push('\n');
        }
        if let Some(truncation) = &self.truncated {
            text.push_str(&format!("\x1b[1;93mSearch {}\x1b[0m\n", truncation));
        }
        text.push_str(&format!(
            "Best bundle {:?} (unit violation {:.4})\n",
            self.best.foods, self.best.fit
        ));
        match &self.outcome {
            PlanOutcome::Feasible(plan) if plan.is_empty() => {
                text.push_str("Empty plan: every amount fell below the display threshold")
            }
            outcome @ PlanOutcome::Feasible(_) => text.push_str(&outcome.to_string()),
            outcome @ PlanOutcome::Infeasible { .. } => {
                text.push_str(&format!("\x1b[1;91m{}\x1b[0m", outcome))
            }
        }
        text
    }

    /// Same as `display` without colour sequences.
    pub fn display_plain(&self) -> String {
        strip_ansi(&self.display())
    }

    /// Saves the experiment in a format chosen by the file extension.
    ///
    /// `.json`, `.yaml`/`.yml` and `.bin`/`.bincode` are recognized; anything
    /// else is written as JSON next to the requested path.
    pub fn save_auto<P: AsRef<Path>>(&self, path: P) -> Result<(), DietError> {
        let path = path.as_ref();
        match extension(path).as_str() {
            "json" => self.save_json(path),
            "yaml" | "yml" => self.save_yaml(path),
            "bin" | "bincode" => self.save_bincode(path),
            _ => {
                warn!("Unknown format. Saving experiment in JSON.");
                self.save_json(path.with_extension("json"))
            }
        }
    }

    fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), DietError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    fn save_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), DietError> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    fn save_bincode<P: AsRef<Path>>(&self, path: P) -> Result<(), DietError> {
        let encoded = bincode::serialize(self)?;
        std::fs::write(path, encoded)?;
        Ok(())
    }

    /// Loads an experiment, detecting the format from the file extension.
    pub fn load_auto<P: AsRef<Path>>(path: P) -> Result<Self, DietError> {
        let path = path.as_ref();
        match extension(path).as_str() {
            "json" => Self::load_json(path),
            "yaml" | "yml" => Self::load_yaml(path),
            "bin" | "bincode" => Self::load_bincode(path),
            _ => Self::load_with_fallback(path),
        }
    }

    fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, DietError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn load_yaml<P: AsRef<Path>>(path: P) -> Result<Self, DietError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    fn load_bincode<P: AsRef<Path>>(path: P) -> Result<Self, DietError> {
        let bytes = std::fs::read(path)?;
        Ok(bincode::deserialize(&bytes)?)
    }

    /// Tries bincode, then JSON, then YAML.
    fn load_with_fallback<P: AsRef<Path>>(path: P) -> Result<Self, DietError> {
        let path = path.as_ref();

        if let Ok(experiment) = Self::load_bincode(path) {
            return Ok(experiment);
        }

        if let Ok(experiment) = Self::load_json(path) {
            return Ok(experiment);
        }

        Self::load_yaml(path)
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}
