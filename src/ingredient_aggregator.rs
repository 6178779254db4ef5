use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::response_parser::RecipePlanItem;

/// One distinct ingredient across the whole plan, keyed by its normalized
/// (lowercased, trimmed) name, with the summed quantity of every requirement
/// sharing that name.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AggregatedIngredient {
    pub normalized_name: String,
    pub total_quantity: f64,
    pub unit: String,
}

/// Collapses a plan's per-meal ingredient lists into one entry per distinct
/// normalized name, in order of first occurrence.
///
/// Quantities are summed without unit conversion: the unit of the first
/// occurrence wins and later occurrences add their raw numbers. Two
/// requirements for the same name in incompatible units will therefore sum
/// silently — a known limitation kept as observed behavior, since conversion
/// happens only at pricing time.
pub fn aggregate_ingredients(plan: &[RecipePlanItem]) -> Vec<AggregatedIngredient> {
    let mut aggregated: Vec<AggregatedIngredient> = Vec::new();
    let mut index_by_name: HashMap<String, usize> = HashMap::new();

    for item in plan {
        for requirement in &item.ingredients {
            let key = requirement.name.trim().to_lowercase();
            if key.is_empty() {
                continue;
            }
            match index_by_name.get(&key) {
                Some(&position) => {
                    aggregated[position].total_quantity += requirement.quantity;
                }
                None => {
                    index_by_name.insert(key.clone(), aggregated.len());
                    aggregated.push(AggregatedIngredient {
                        normalized_name: key,
                        total_quantity: requirement.quantity,
                        unit: requirement.unit.clone(),
                    });
                }
            }
        }
    }

    aggregated
}
