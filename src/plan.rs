use crate::data::NutrientDataset;
use crate::error::DietError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Grams in one portion unit of the nutrient table.
pub const PORTION_GRAMS: f64 = 100.0;

/// One line of the final diet.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PlanItem {
    pub food_id: String,
    pub description: String,
    /// Grams
    pub amount: f64,
    pub calories: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct DietPlan {
    pub items: Vec<PlanItem>,
}

/// Terminal outcome of a successful run.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum PlanOutcome {
    Feasible(DietPlan),
    /// No portions of the best bundle meet every bound
    Infeasible { bundle: Vec<usize>, violation: f64 },
}

impl PlanOutcome {
    pub fn is_feasible(&self) -> bool {
        matches!(self, PlanOutcome::Feasible(_))
    }

    pub fn plan(&self) -> Option<&DietPlan> {
        match self {
            PlanOutcome::Feasible(plan) => Some(plan),
            PlanOutcome::Infeasible { .. } => None,
        }
    }
}

/// Join the slots of `bundle` with their solved portions
///
/// # Arguments
///
/// * `bundle` - Food identifiers, one per slot.
/// * `portions` - Solved amount per slot, in portion units.
/// * `data` - Dataset providing descriptions and the energy channel.
/// * `epsilon` - Slots with a smaller amount are left out.
///
/// # Returns
///
/// Items in slot order, amounts in grams.
pub fn assemble(
    bundle: &[usize],
    portions: &[f64],
    data: &NutrientDataset,
    epsilon: f64,
) -> DietPlan {
    let items = bundle
        .iter()
        .zip(portions)
        .filter(|(_, &x)| x >= epsilon)
        .map(|(&food, &x)| {
            let amount = x * PORTION_GRAMS;
            PlanItem {
                food_id: data.food_ids[food].clone(),
                description: data.food_desc[food].clone(),
                amount,
                calories: data.energy(food) * amount / 100.0,
            }
        })
        .collect();
    DietPlan { items }
}

impl DietPlan {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total_amount(&self) -> f64 {
        self.items.iter().map(|i| i.amount).sum()
    }

    pub fn total_calories(&self) -> f64 {
        self.items.iter().map(|i| i.calories).sum()
    }

    /// JSON array of `{food_id, description, amount, calories}` records.
    pub fn to_json(&self) -> Result<String, DietError> {
        Ok(serde_json::to_string(&self.items)?)
    }
}

impl fmt::Display for DietPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .items
            .iter()
            .map(|i| i.description.chars().count())
            .max()
            .unwrap_or(0)
            .clamp(11, 60);

        writeln!(
            f,
            "{:<10} {:<width$} {:>10} {:>10}",
            "food_id",
            "description",
            "amount (g)",
            "kcal",
            width = width
        )?;
        for item in &self.items {
            let description: String = item.description.chars().take(width).collect();
            writeln!(
                f,
                "{:<10} {:<width$} {:>10.1} {:>10.1}",
                item.food_id,
                description,
                item.amount,
                item.calories,
                width = width
            )?;
        }
        write!(
            f,
            "{:<10} {:<width$} {:>10.1} {:>10.1}",
            "",
            "TOTAL",
            self.total_amount(),
            self.total_calories(),
            width = width
        )
    }
}

impl fmt::Display for PlanOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanOutcome::Feasible(plan) => write!(f, "{}", plan),
            PlanOutcome::Infeasible { bundle, violation } => write!(
                f,
                "Infeasible: no portions of bundle {:?} meet every bound (unit violation {:.4})",
                bundle, violation
            ),
        }
    }
}
