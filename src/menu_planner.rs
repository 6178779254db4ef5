use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;

use crate::api_connection::connection::ModelGateway;
use crate::ingredient_aggregator::aggregate_ingredients;
use crate::price_resolver::{PriceResolver, PricedProduct};
use crate::product_catalog::round_currency;
use crate::response_parser::{parse_plan, ParseError, RecipePlanItem};

/// Budget requests below this threshold are rejected before any generation
/// call is attempted.
pub const MIN_BUDGET: f64 = 500.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    All,
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::All => "all meals",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StartDay {
    Today,
    Tomorrow,
    Monday,
}

impl fmt::Display for StartDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StartDay::Today => "today",
            StartDay::Tomorrow => "tomorrow",
            StartDay::Monday => "on Monday",
        };
        write!(f, "{}", label)
    }
}

/// One user-facing planning request.
#[derive(Debug, Clone)]
pub struct MenuRequest {
    pub budget: f64,
    pub day_count: u32,
    pub meal_type: MealType,
    pub start_day: StartDay,
    /// Ingredients the user already has on hand, embedded into the prompt.
    pub available_ingredients: Vec<String>,
}

#[derive(Debug)]
pub enum PlanningError {
    BudgetTooLow { budget: f64, minimum: f64 },
    NoDays,
    UnusableResponse(ParseError),
    EmptyPlan,
}

impl fmt::Display for PlanningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanningError::BudgetTooLow { budget, minimum } => write!(
                f,
                "Budget {:.2} is below the minimum of {:.2} currency units",
                budget, minimum
            ),
            PlanningError::NoDays => write!(f, "The plan must cover at least one day"),
            PlanningError::UnusableResponse(err) => {
                write!(f, "The generation service returned an unusable menu: {}", err)
            }
            PlanningError::EmptyPlan => {
                write!(f, "The generation service returned an empty menu")
            }
        }
    }
}

impl Error for PlanningError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PlanningError::UnusableResponse(err) => Some(err),
            _ => None,
        }
    }
}

/// The finished output of one reconciliation run. Exceeding the budget is
/// data here, not an error.
#[derive(Debug, Clone)]
pub struct PlannedMenu {
    pub items: Vec<RecipePlanItem>,
    pub shopping_list: Vec<PricedProduct>,
    pub total_cost: f64,
    pub within_budget: bool,
    /// Whether the cheaper-variant adjustment pass produced the final plan.
    pub adjusted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MenuStatus {
    AwaitingPurchase,
    InProgress,
    Complete,
}

/// A committed menu in the per-user history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuRecord {
    pub id: u64,
    pub budget: f64,
    pub day_count: u32,
    pub meal_type: MealType,
    pub start_day: StartDay,
    pub items: Vec<RecipePlanItem>,
    pub total_cost: f64,
    pub created_at: DateTime<Utc>,
    pub status: MenuStatus,
}

impl PlannedMenu {
    /// Stamps the planned menu into a history record.
    pub fn to_record(&self, request: &MenuRequest) -> MenuRecord {
        let created_at = Utc::now();
        MenuRecord {
            id: created_at.timestamp_millis() as u64,
            budget: request.budget,
            day_count: request.day_count,
            meal_type: request.meal_type,
            start_day: request.start_day,
            items: self.items.clone(),
            total_cost: self.total_cost,
            created_at,
            status: MenuStatus::AwaitingPurchase,
        }
    }
}

/// Orchestrates generate → aggregate → price → check, with at most one
/// cheaper-variant adjustment pass.
pub struct MenuPlanner {
    gateway: ModelGateway,
    resolver: PriceResolver,
}

impl MenuPlanner {
    pub fn new(gateway: ModelGateway, resolver: PriceResolver) -> Self {
        MenuPlanner { gateway, resolver }
    }

    pub async fn plan_menu(
        &mut self,
        request: &MenuRequest,
        progress_updater: impl Fn(String),
    ) -> Result<PlannedMenu, PlanningError> {
        if request.budget < MIN_BUDGET {
            return Err(PlanningError::BudgetTooLow {
                budget: request.budget,
                minimum: MIN_BUDGET,
            });
        }
        if request.day_count == 0 {
            return Err(PlanningError::NoDays);
        }

        progress_updater(format!(
            "Requesting a {}-day menu for {} within {:.2}...",
            request.day_count, request.meal_type, request.budget
        ));
        let raw = self.gateway.generate(&menu_prompt(request)).await;
        let items = parse_plan(&raw).map_err(PlanningError::UnusableResponse)?;
        if items.is_empty() {
            return Err(PlanningError::EmptyPlan);
        }

        let (shopping_list, total_cost) = self.price_plan(&items, &progress_updater).await;

        let mut adjusted = false;
        let (items, shopping_list, total_cost) = if total_cost > request.budget {
            progress_updater(format!(
                "Total {:.2} exceeds the budget of {:.2}; requesting a cheaper variant...",
                total_cost, request.budget
            ));
            let raw = self
                .gateway
                .generate(&adjustment_prompt(request, total_cost))
                .await;
            match parse_plan(&raw) {
                Ok(adjusted_items) if !adjusted_items.is_empty() => {
                    let (adjusted_list, adjusted_total) =
                        self.price_plan(&adjusted_items, &progress_updater).await;
                    adjusted = true;
                    (adjusted_items, adjusted_list, adjusted_total)
                }
                Ok(_) => {
                    progress_updater(
                        "Adjustment returned an empty menu; keeping the original plan.".to_string(),
                    );
                    (items, shopping_list, total_cost)
                }
                Err(err) => {
                    progress_updater(format!(
                        "Adjustment response was unusable ({}); keeping the original plan.",
                        err
                    ));
                    (items, shopping_list, total_cost)
                }
            }
        } else {
            (items, shopping_list, total_cost)
        };

        Ok(PlannedMenu {
            within_budget: total_cost <= request.budget,
            items,
            shopping_list,
            total_cost,
            adjusted,
        })
    }

    /// Aggregates the plan and prices each distinct ingredient, strictly one
    /// at a time.
    async fn price_plan(
        &mut self,
        items: &[RecipePlanItem],
        progress_updater: &impl Fn(String),
    ) -> (Vec<PricedProduct>, f64) {
        let aggregated = aggregate_ingredients(items);
        let mut shopping_list = Vec::with_capacity(aggregated.len());
        let mut total_cost = 0.0;

        for (index, ingredient) in aggregated.iter().enumerate() {
            progress_updater(format!(
                "Pricing ingredient {}/{}: {}",
                index + 1,
                aggregated.len(),
                ingredient.normalized_name
            ));
            let product = self
                .resolver
                .resolve(
                    &mut self.gateway,
                    &ingredient.normalized_name,
                    ingredient.total_quantity,
                    &ingredient.unit,
                )
                .await;
            total_cost += product.line_cost;
            shopping_list.push(product);
        }

        (shopping_list, round_currency(total_cost))
    }
}

fn menu_prompt(request: &MenuRequest) -> String {
    let on_hand = if request.available_ingredients.is_empty() {
        "none".to_string()
    } else {
        request.available_ingredients.join(", ")
    };
    format!(
        "Plan a menu for {} days for {} within a budget of {:.2} currency units, \
         using products from the store catalog, starting {}. \
         Take into account ingredients already on hand: {}. \
         Respond with JSON only, inside a fenced code block: an array of objects \
         with fields day, meal, recipe, ingredients [{{ name, qty, unit }}], cookingTime.",
        request.day_count, request.meal_type, request.budget, request.start_day, on_hand
    )
}

fn adjustment_prompt(request: &MenuRequest, current_cost: f64) -> String {
    format!(
        "Adjust the menu to fit a budget of {:.2} currency units. The current \
         selection costs {:.2}, which is {:.2} over budget. Use cheaper products \
         and replace expensive ingredients with substitutes, keeping {} days for {}. \
         Respond with JSON only, inside a fenced code block: an array of objects \
         with fields day, meal, recipe, ingredients [{{ name, qty, unit }}], cookingTime.",
        request.budget,
        current_cost,
        current_cost - request.budget,
        request.day_count,
        request.meal_type
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_connection::key_rotation::CredentialRotator;
    use crate::product_catalog::ProductCatalog;

    fn offline_planner() -> MenuPlanner {
        MenuPlanner::new(
            ModelGateway::new(CredentialRotator::new(Vec::new())),
            PriceResolver::new(ProductCatalog::builtin()),
        )
    }

    fn request(budget: f64, days: u32, meal_type: MealType) -> MenuRequest {
        MenuRequest {
            budget,
            day_count: days,
            meal_type,
            start_day: StartDay::Today,
            available_ingredients: Vec::new(),
        }
    }

    #[tokio::test]
    async fn offline_plan_produces_priced_shopping_list() {
        let mut planner = offline_planner();
        let planned = planner
            .plan_menu(&request(100_000.0, 2, MealType::All), |_| {})
            .await
            .unwrap();
        assert_eq!(planned.items.len(), 6);
        assert!(!planned.shopping_list.is_empty());
        assert!(planned.total_cost.is_finite());
        assert!(planned.total_cost > 0.0);
        assert!(planned.within_budget);
        assert!(!planned.adjusted);
    }

    #[tokio::test]
    async fn budget_below_minimum_is_rejected() {
        let mut planner = offline_planner();
        let result = planner.plan_menu(&request(300.0, 3, MealType::All), |_| {}).await;
        assert!(matches!(result, Err(PlanningError::BudgetTooLow { .. })));
    }

    #[tokio::test]
    async fn zero_days_is_rejected() {
        let mut planner = offline_planner();
        let result = planner.plan_menu(&request(1000.0, 0, MealType::All), |_| {}).await;
        assert!(matches!(result, Err(PlanningError::NoDays)));
    }

    #[tokio::test]
    async fn over_budget_result_is_data_not_an_error() {
        let mut planner = offline_planner();
        // 500 is the minimum budget and far below the cost of a 7-day plan,
        // so even the adjusted plan stays over budget.
        let planned = planner
            .plan_menu(&request(500.0, 7, MealType::All), |_| {})
            .await
            .unwrap();
        assert!(!planned.within_budget);
        assert!(planned.total_cost > 500.0);
    }

    #[tokio::test]
    async fn record_carries_request_parameters() {
        let mut planner = offline_planner();
        let req = request(5000.0, 1, MealType::Dinner);
        let planned = planner.plan_menu(&req, |_| {}).await.unwrap();
        let record = planned.to_record(&req);
        assert_eq!(record.day_count, 1);
        assert_eq!(record.meal_type, MealType::Dinner);
        assert_eq!(record.status, MenuStatus::AwaitingPurchase);
        assert_eq!(record.total_cost, planned.total_cost);
        assert!(record.id > 0);
    }
}
