use crate::data::NutrientDataset;
use crate::error::DietError;
use crate::param;
use log::{debug, warn};
use microlp::{ComparisonOp, LinearExpr, OptimizationDirection, Problem};

/// Result of the portion LP for one bundle.
#[derive(Clone, Debug, PartialEq)]
pub enum PortionSolution {
    /// One non-negative amount per slot, in portion units
    Optimal(Vec<f64>),
    /// No non-negative amounts meet every bound
    Infeasible,
}

/// Minimal-mass portions for a fixed bundle
///
/// minimize `sum(x)` subject to `G x <= h` where `G` stacks the upper-bound rows,
/// the negated lower-bound rows and `-x <= 0`. Solved with the simplex method, so
/// slots that are not part of the optimal vertex come out as exactly 0.
#[derive(Clone, Debug)]
pub struct PortionSolver {
    epsilon: f64,
    feasibility_tolerance: f64,
}

impl Default for PortionSolver {
    fn default() -> Self {
        PortionSolver::new(&param::Portion::default())
    }
}

impl PortionSolver {
    pub fn new(portion: &param::Portion) -> PortionSolver {
        PortionSolver {
            epsilon: portion.epsilon,
            feasibility_tolerance: portion.feasibility_tolerance,
        }
    }

    /// Amount below which a slot is left out of the plan.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Relative slack accepted on a bound, shared by the re-check and `report_bounds`.
    pub fn feasibility_tolerance(&self) -> f64 {
        self.feasibility_tolerance
    }

    /// Solve the portion LP of `bundle`
    ///
    /// # Returns
    ///
    /// `Infeasible` when the bounds cannot be met, otherwise the amounts per slot.
    /// Backend failures and solutions that do not hold up to the re-check are errors.
    pub fn solve(
        &self,
        bundle: &[usize],
        data: &NutrientDataset,
    ) -> Result<PortionSolution, DietError> {
        if let Some(food) = bundle.iter().find(|&&f| f >= data.food_len) {
            return Err(DietError::Configuration(format!(
                "Food {} is out of the catalog of {} foods",
                food, data.food_len
            )));
        }

        if let Some(reason) = infeasibility_reason(bundle, data) {
            debug!("Bundle {:?} infeasible before solving: {}", bundle, reason);
            return Ok(PortionSolution::Infeasible);
        }

        let n = bundle.len();
        if n == 0 {
            return Ok(PortionSolution::Optimal(Vec::new()));
        }

        let (g, h) = constraint_system(bundle, data);

        let mut problem = Problem::new(OptimizationDirection::Minimize);
        let vars: Vec<_> = (0..n)
            .map(|_| problem.add_var(1.0, (0.0, f64::INFINITY)))
            .collect();

        // The trailing `-x <= 0` rows are the variable bounds above. All-zero rows
        // hold once infeasibility_reason has passed.
        for (row, bound) in g.iter().zip(&h).take(g.len() - n) {
            if row.iter().all(|c| *c == 0.0) {
                continue;
            }
            let mut expr = LinearExpr::empty();
            for (var, coeff) in vars.iter().zip(row) {
                if *coeff != 0.0 {
                    expr.add(*var, *coeff);
                }
            }
            problem.add_constraint(expr, ComparisonOp::Le, *bound);
        }

        let x: Vec<f64> = match problem.solve() {
            Ok(solution) => vars.iter().map(|var| solution[*var]).collect(),
            Err(microlp::Error::Infeasible) => {
                debug!("Solver certified bundle {:?} infeasible", bundle);
                return Ok(PortionSolution::Infeasible);
            }
            Err(e) => {
                return Err(DietError::Solver(format!(
                    "Portion LP of bundle {:?} failed: {}",
                    bundle, e
                )))
            }
        };

        self.check_solution(x, &g, &h).map(PortionSolution::Optimal)
    }

    /// Reject non-finite or constraint-breaking amounts; clamp tiny negatives to 0.
    fn check_solution(
        &self,
        mut x: Vec<f64>,
        g: &[Vec<f64>],
        h: &[f64],
    ) -> Result<Vec<f64>, DietError> {
        if x.iter().any(|v| !v.is_finite()) {
            return Err(DietError::Degenerate(format!(
                "non-finite amounts {:?}",
                x
            )));
        }

        for (row, bound) in g.iter().zip(h) {
            let lhs: f64 = row.iter().zip(&x).map(|(a, v)| a * v).sum();
            let slack = self.feasibility_tolerance * bound.abs().max(1.0);
            if lhs > bound + slack {
                return Err(DietError::Degenerate(format!(
                    "amounts {:?} break a bound: {} > {}",
                    x, lhs, bound
                )));
            }
        }

        for v in x.iter_mut() {
            if *v < 0.0 {
                *v = 0.0;
            }
        }
        Ok(x)
    }
}

/// Stack `G x <= h` for `bundle`
///
/// Rows in order: one upper-bound row per channel with a finite limit, one negated
/// lower-bound row per channel, one `-x_i <= 0` row per slot.
pub fn constraint_system(bundle: &[usize], data: &NutrientDataset) -> (Vec<Vec<f64>>, Vec<f64>) {
    let n = bundle.len();
    let mut g = Vec::with_capacity(2 * data.channel_len + n);
    let mut h = Vec::with_capacity(2 * data.channel_len + n);

    let column = |channel: usize| -> Vec<f64> {
        bundle
            .iter()
            .map(|&food| data.food_nutrients(food)[channel])
            .collect()
    };

    for channel in 0..data.channel_len {
        if data.limit[channel].is_finite() {
            g.push(column(channel));
            h.push(data.limit[channel]);
        }
    }

    for channel in 0..data.channel_len {
        g.push(column(channel).iter().map(|v| -v).collect());
        h.push(-data.required[channel]);
    }

    for i in 0..n {
        let mut row = vec![0.0; n];
        row[i] = -1.0;
        g.push(row);
        h.push(0.0);
    }

    (g, h)
}

/// Cheap certificates of infeasibility that need no solve.
pub fn infeasibility_reason(bundle: &[usize], data: &NutrientDataset) -> Option<String> {
    for channel in 0..data.channel_len {
        let required = data.required[channel];
        let limit = data.limit[channel];
        if required > limit {
            return Some(format!(
                "{} requires {} above its limit {}",
                data.channels[channel], required, limit
            ));
        }
        if limit < 0.0 {
            return Some(format!(
                "{} has a negative limit {}",
                data.channels[channel], limit
            ));
        }
        if required > 0.0
            && bundle
                .iter()
                .all(|&food| data.food_nutrients(food)[channel] == 0.0)
        {
            return Some(format!(
                "{} requires {} but no food of the bundle provides it",
                data.channels[channel], required
            ));
        }
    }
    None
}

/// Nutrient totals of `amounts` portions of `bundle`.
pub fn intake(bundle: &[usize], amounts: &[f64], data: &NutrientDataset) -> Vec<f64> {
    let mut totals = vec![0.0; data.channel_len];
    for (&food, amount) in bundle.iter().zip(amounts) {
        for (total, value) in totals.iter_mut().zip(data.food_nutrients(food)) {
            *total += value * amount;
        }
    }
    totals
}

/// Warn about channels of the solved intake that stray outside their bounds.
pub fn report_bounds(bundle: &[usize], amounts: &[f64], data: &NutrientDataset, tolerance: f64) {
    for (channel, total) in intake(bundle, amounts, data).iter().enumerate() {
        let required = data.required[channel];
        let limit = data.limit[channel];
        if *total < required - tolerance * required.abs().max(1.0)
            || *total > limit + tolerance * limit.abs().max(1.0)
        {
            warn!(
                "{} intake {:.4} outside [{}, {}]",
                data.channels[channel], total, required, limit
            );
        }
    }
}
