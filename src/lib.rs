pub mod data;
pub mod error;
pub mod experiment;
pub mod fitness;
pub mod ga;
pub mod individual;
pub mod param;
pub mod plan;
pub mod pool;
pub mod population;
pub mod portion;
pub mod seed;
pub mod utils;

pub use error::DietError;

use data::NutrientDataset;
use experiment::Experiment;
use ga::{ga, GAConfig, SearchResult};
use log::{info, warn};
use param::Param;
use plan::PlanOutcome;
use pool::WorkerPool;
use portion::{PortionSolution, PortionSolver};
use seed::{ClusterSeeds, SeedProvider};

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

/// Genetic search result together with the portions of its best bundle.
#[derive(Clone, Debug)]
pub struct Optimization {
    pub search: SearchResult,
    pub outcome: PlanOutcome,
}

/// Search a food bundle, then solve its portions
///
/// # Arguments
///
/// * `data` - Nutrient dataset, checked before anything else runs.
/// * `config` - Immutable GA configuration of this run.
/// * `solver` - Portion LP settings.
/// * `pool` - Process-wide worker pool, owned by the caller.
/// * `seeds` - Optional initial bundles.
/// * `running` - Cleared from outside to stop the search early.
///
/// # Returns
///
/// A feasible plan or an explicit infeasible outcome. Dataset and configuration
/// problems are reported before the search starts.
pub fn optimize_diet(
    data: &NutrientDataset,
    config: &GAConfig,
    solver: &PortionSolver,
    pool: &WorkerPool,
    seeds: Option<&dyn SeedProvider>,
    running: Arc<AtomicBool>,
) -> Result<Optimization, DietError> {
    data.check()?;

    let search = ga(data, seeds, config, pool, running)?;
    let bundle = &search.best.foods;
    info!("Best bundle: {}", search.best.display(data));

    let outcome = match solver.solve(bundle, data)? {
        PortionSolution::Optimal(portions) => {
            portion::report_bounds(
                bundle,
                &portions,
                data,
                solver.feasibility_tolerance(),
            );
            let plan = plan::assemble(bundle, &portions, data, solver.epsilon());
            info!(
                "Plan of {} foods, {:.1} g, {:.1} kcal",
                plan.items.len(),
                plan.total_amount(),
                plan.total_calories()
            );
            PlanOutcome::Feasible(plan)
        }
        PortionSolution::Infeasible => {
            warn!(
                "Best bundle {:?} cannot meet every nutrient bound. Consider raising ga.generations or ga.population_size.",
                bundle
            );
            PlanOutcome::Infeasible {
                bundle: bundle.clone(),
                violation: search.best.fit,
            }
        }
    };

    Ok(Optimization { search, outcome })
}

/// Run the optimization described by a parameter set
///
/// Loads the dataset and the optional cluster cache, optimizes, and saves the
/// run record when `general.save_exp` is set.
pub fn run(
    param: &Param,
    pool: &WorkerPool,
    running: Arc<AtomicBool>,
) -> Result<Experiment, DietError> {
    let start = Instant::now();

    let data = NutrientDataset::load(
        &param.data.foods,
        &param.data.bounds,
        &param.data.energy_nutrient,
    )?;
    cinfo!(param.general.display_colorful, "\x1b[2;97m{:?}\x1b[0m", data);

    let seeds = if param.data.cluster_cache.is_empty() {
        None
    } else {
        Some(ClusterSeeds::from_file(&param.data.cluster_cache, &data)?)
    };

    let config = GAConfig::from_param(param)?;
    let solver = PortionSolver::new(&param.portion);

    let optimization = optimize_diet(
        &data,
        &config,
        &solver,
        pool,
        seeds.as_ref().map(|s| s as &dyn SeedProvider),
        running,
    )?;

    let exp = Experiment::new(param, optimization, start.elapsed().as_secs_f64());

    if !param.general.save_exp.is_empty() {
        exp.save_auto(&param.general.save_exp)?;
        info!("Experiment saved to {}", param.general.save_exp);
    }

    Ok(exp)
}
