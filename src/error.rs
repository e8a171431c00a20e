use thiserror::Error;

/// Failures of a diet optimization run.
///
/// An infeasible nutrient system is not an error: it is reported through
/// [`crate::portion::PortionSolution::Infeasible`] and
/// [`crate::plan::PlanOutcome::Infeasible`].
#[derive(Debug, Error)]
pub enum DietError {
    /// Nutrient data missing, malformed or inconsistent with a companion file
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Parameters that cannot describe a valid run
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The LP backend stopped for a reason other than infeasibility
    #[error("Solver error: {0}")]
    Solver(String),

    /// The LP backend claimed success but returned unusable amounts
    #[error("Degenerate solution: {0}")]
    Degenerate(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Bincode error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
