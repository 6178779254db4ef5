//! Deterministic offline substitute for the generation service.
//!
//! When no credential works (or none is configured) the gateway answers from
//! here instead of failing, so the planning pipeline always receives a
//! parseable response. Menu responses rotate through small fixed option sets
//! by day index; price responses are keyword-matched against the built-in
//! catalog.

use serde_json::{json, Value};

use crate::product_catalog::ProductCatalog;

struct CannedRecipe {
    name: &'static str,
    cooking_time: u32,
    // (ingredient name, quantity, unit)
    ingredients: &'static [(&'static str, f64, &'static str)],
}

const BREAKFAST_OPTIONS: &[CannedRecipe] = &[
    CannedRecipe {
        name: "Oatmeal with fruit and nuts",
        cooking_time: 15,
        ingredients: &[
            ("Oat flakes", 80.0, "g"),
            ("Milk", 200.0, "ml"),
            ("Bananas", 1.0, "pcs"),
            ("Walnuts", 20.0, "g"),
        ],
    },
    CannedRecipe {
        name: "Cottage cheese bake with raisins",
        cooking_time: 25,
        ingredients: &[
            ("Cottage cheese", 200.0, "g"),
            ("Eggs", 2.0, "pcs"),
            ("Raisins", 50.0, "g"),
            ("Sugar", 30.0, "g"),
        ],
    },
    CannedRecipe {
        name: "Buckwheat porridge with milk",
        cooking_time: 20,
        ingredients: &[
            ("Buckwheat", 100.0, "g"),
            ("Milk", 300.0, "ml"),
            ("Butter", 20.0, "g"),
        ],
    },
];

const LUNCH_OPTIONS: &[CannedRecipe] = &[
    CannedRecipe {
        name: "Chicken breast with rice and vegetables",
        cooking_time: 30,
        ingredients: &[
            ("Chicken breast", 150.0, "g"),
            ("Rice", 100.0, "g"),
            ("Broccoli", 100.0, "g"),
            ("Carrots", 50.0, "g"),
        ],
    },
    CannedRecipe {
        name: "Salmon with potatoes",
        cooking_time: 35,
        ingredients: &[
            ("Salmon", 150.0, "g"),
            ("Potatoes", 200.0, "g"),
            ("Lemon", 0.5, "pcs"),
            ("Dill", 10.0, "g"),
        ],
    },
    CannedRecipe {
        name: "Vegetable soup",
        cooking_time: 40,
        ingredients: &[
            ("Potatoes", 150.0, "g"),
            ("Carrots", 100.0, "g"),
            ("Onions", 50.0, "g"),
            ("Mixed greens", 20.0, "g"),
        ],
    },
];

const DINNER_OPTIONS: &[CannedRecipe] = &[
    CannedRecipe {
        name: "Cottage cheese bake with berries",
        cooking_time: 25,
        ingredients: &[
            ("Cottage cheese", 200.0, "g"),
            ("Eggs", 2.0, "pcs"),
            ("Sour cream", 50.0, "g"),
            ("Blueberries", 100.0, "g"),
        ],
    },
    CannedRecipe {
        name: "Omelette with vegetables",
        cooking_time: 15,
        ingredients: &[
            ("Eggs", 3.0, "pcs"),
            ("Tomatoes", 100.0, "g"),
            ("Spinach", 50.0, "g"),
            ("Cheese", 50.0, "g"),
        ],
    },
    CannedRecipe {
        name: "Caesar salad",
        cooking_time: 20,
        ingredients: &[
            ("Chicken breast", 100.0, "g"),
            ("Iceberg lettuce", 100.0, "g"),
            ("Croutons", 30.0, "g"),
            ("Parmesan", 30.0, "g"),
        ],
    },
];

/// Answers a prompt the way the generation service would, without a network.
/// Menu and pricing prompts get fenced JSON; anything else gets a plain
/// refusal line.
pub fn offline_completion(prompt: &str) -> String {
    let lower = prompt.to_lowercase();
    if lower.contains("menu") || lower.contains("recipe") {
        canned_menu_response(&lower)
    } else if lower.contains("price") || lower.contains("catalog") {
        canned_price_response(prompt)
    } else {
        "Sorry, I can only help with menu plans and product prices.".to_string()
    }
}

fn canned_menu_response(prompt: &str) -> String {
    let days = requested_day_count(prompt);
    let (breakfast, lunch, dinner) = requested_meals(prompt);

    let mut items: Vec<Value> = Vec::new();
    for day in 1..=days {
        let day_label = format!("Day {}", day);
        if breakfast {
            items.push(plan_item(&day_label, "breakfast", pick(BREAKFAST_OPTIONS, day)));
        }
        if lunch {
            items.push(plan_item(&day_label, "lunch", pick(LUNCH_OPTIONS, day)));
        }
        if dinner {
            items.push(plan_item(&day_label, "dinner", pick(DINNER_OPTIONS, day)));
        }
    }
    fenced(&Value::Array(items))
}

fn pick(options: &'static [CannedRecipe], day: u32) -> &'static CannedRecipe {
    &options[(day as usize) % options.len()]
}

fn plan_item(day: &str, meal: &str, recipe: &CannedRecipe) -> Value {
    let ingredients: Vec<Value> = recipe
        .ingredients
        .iter()
        .map(|&(name, qty, unit)| json!({ "name": name, "qty": qty, "unit": unit }))
        .collect();
    json!({
        "day": day,
        "meal": meal,
        "recipe": recipe.name,
        "ingredients": ingredients,
        "cookingTime": recipe.cooking_time,
    })
}

fn canned_price_response(prompt: &str) -> String {
    let name = quoted_product_name(prompt).unwrap_or_default();
    let catalog = ProductCatalog::builtin();
    let found = catalog
        .find_exact(name)
        .or_else(|| catalog.find_substring(name))
        .or_else(|| catalog.find_keyword(name));
    match found {
        Some(product) => fenced(&json!({
            "name": product.display_name,
            "pack": product.package_description(),
            "price": product.unit_price,
        })),
        None => fenced(&json!({
            "error": "Product not found in catalog",
            "searchedFor": name,
        })),
    }
}

/// The product name is embedded in the pricing prompt between double quotes.
fn quoted_product_name(prompt: &str) -> Option<&str> {
    let start = prompt.find('"')? + 1;
    let rest = &prompt[start..];
    let end = rest.find('"')?;
    Some(rest[..end].trim())
}

/// Day count appears in the prompt as "... for N days ...". Defaults to 3
/// when absent (e.g. in adjustment prompts).
fn requested_day_count(prompt: &str) -> u32 {
    let tokens: Vec<&str> = prompt.split_whitespace().collect();
    for window in tokens.windows(2) {
        let next = window[1].trim_matches(|c: char| !c.is_ascii_alphanumeric());
        if next == "day" || next == "days" {
            if let Ok(count) = window[0].parse::<u32>() {
                return count.clamp(1, 14);
            }
        }
    }
    3
}

fn requested_meals(prompt: &str) -> (bool, bool, bool) {
    let breakfast = prompt.contains("breakfast");
    let lunch = prompt.contains("lunch");
    let dinner = prompt.contains("dinner");
    if breakfast || lunch || dinner {
        (breakfast, lunch, dinner)
    } else {
        (true, true, true)
    }
}

fn fenced(value: &Value) -> String {
    let body = serde_json::to_string_pretty(value).unwrap_or_default();
    format!("```json\n{}\n```", body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn menu_prompt_yields_fenced_json_array() {
        let raw = offline_completion("Plan a menu for 2 days with a budget of 2000.");
        assert!(raw.starts_with("```json"));
        let interior = raw
            .trim_start_matches("```json")
            .trim_end_matches("```")
            .trim();
        let value: Value = serde_json::from_str(interior).unwrap();
        let items = value.as_array().unwrap();
        // 2 days, all three meal slots.
        assert_eq!(items.len(), 6);
        assert_eq!(items[0]["day"], "Day 1");
        assert_eq!(items[0]["meal"], "breakfast");
    }

    #[test]
    fn consecutive_days_rotate_recipes() {
        let raw = offline_completion("Plan a menu for 2 days for breakfast with a budget of 800.");
        let interior = raw
            .trim_start_matches("```json")
            .trim_end_matches("```")
            .trim();
        let value: Value = serde_json::from_str(interior).unwrap();
        let items = value.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_ne!(items[0]["recipe"], items[1]["recipe"]);
    }

    #[test]
    fn meal_filter_honors_prompt_wording() {
        let raw = offline_completion("Plan a menu for 1 days for dinner with a budget of 700.");
        let interior = raw
            .trim_start_matches("```json")
            .trim_end_matches("```")
            .trim();
        let value: Value = serde_json::from_str(interior).unwrap();
        let items = value.as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["meal"], "dinner");
    }

    #[test]
    fn price_prompt_matches_catalog_product() {
        let raw = offline_completion("Find the price for the product \"Milk\" in the store catalog.");
        assert!(raw.contains("Milk 3.2%"));
        assert!(raw.contains("89.9"));
    }

    #[test]
    fn price_prompt_for_unknown_product_reports_miss() {
        let raw =
            offline_completion("Find the price for the product \"quail eggs\" in the store catalog.");
        assert!(raw.contains("Product not found in catalog"));
        assert!(raw.contains("quail eggs"));
    }

    #[test]
    fn unrelated_prompt_gets_plain_refusal() {
        let raw = offline_completion("What is the capital of France?");
        assert!(!raw.contains("```"));
    }

    #[test]
    fn day_count_defaults_when_absent() {
        assert_eq!(requested_day_count("adjust the menu to fit the budget"), 3);
        assert_eq!(requested_day_count("plan a menu for 5 days"), 5);
        assert_eq!(requested_day_count("plan a menu for 99 days"), 14);
    }
}
