use anyhow::{Context, Result};
use std::path::Path;

use flash_menu::api_connection::connection::ModelGateway;
use flash_menu::api_connection::key_rotation::CredentialRotator;
use flash_menu::cli::parse_args;
use flash_menu::menu_planner::{MenuPlanner, MenuRequest};
use flash_menu::price_resolver::PriceResolver;
use flash_menu::product_catalog::ProductCatalog;
use flash_menu::shopping_tracker::ShoppingTracker;
use flash_menu::storage::{JsonFileStore, UserStore};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok(); // Load .env for API credentials

    let cli_args = parse_args();

    let rotator = CredentialRotator::from_env();
    if rotator.is_empty() {
        println!("No API credentials configured; answering from the offline generator.");
    } else {
        println!("Loaded {} API credential(s).", rotator.len());
    }

    let catalog = match &cli_args.catalog {
        Some(path) => ProductCatalog::from_csv(Path::new(path))
            .with_context(|| format!("Failed to load catalog from '{}'", path))?,
        None => ProductCatalog::builtin(),
    };

    let store = JsonFileStore::new(&cli_args.data_dir);
    let mut user_data = store
        .load(&cli_args.user)
        .await
        .with_context(|| format!("Failed to load data for user '{}'", cli_args.user))?;

    if let Some(have) = &cli_args.have {
        for ingredient in have.split(',') {
            let ingredient = ingredient.trim();
            if !ingredient.is_empty()
                && !user_data
                    .available_ingredients
                    .iter()
                    .any(|existing| existing.eq_ignore_ascii_case(ingredient))
            {
                user_data.available_ingredients.push(ingredient.to_string());
            }
        }
    }

    let request = MenuRequest {
        budget: cli_args.budget,
        day_count: cli_args.days,
        meal_type: cli_args.meal,
        start_day: cli_args.start,
        available_ingredients: user_data.available_ingredients.clone(),
    };

    let mut planner = MenuPlanner::new(ModelGateway::new(rotator), PriceResolver::new(catalog));

    let planned = match planner.plan_menu(&request, |message| println!("{}", message)).await {
        Ok(planned) => planned,
        Err(err) => {
            eprintln!("\nMenu planning failed: {}", err);
            std::process::exit(1);
        }
    };

    println!("\n=== Menu ===");
    let mut current_day = String::new();
    for item in &planned.items {
        if item.day != current_day {
            current_day = item.day.clone();
            println!("\n{}", current_day);
        }
        if item.cooking_time_minutes > 0 {
            println!("  {}: {} ({} min)", item.meal, item.recipe, item.cooking_time_minutes);
        } else {
            println!("  {}: {}", item.meal, item.recipe);
        }
        for ingredient in &item.ingredients {
            println!("    - {} {} {}", ingredient.name, ingredient.quantity, ingredient.unit);
        }
    }

    println!("\n=== Shopping list ===");
    for product in &planned.shopping_list {
        let marker = if product.available { " " } else { "~" };
        let packs = product
            .packages_needed
            .map(|n| format!(" x{}", n))
            .unwrap_or_default();
        println!(
            "{} {} ({}{}) for {} {} — {:.2}",
            marker,
            product.display_name,
            product.package_description,
            packs,
            product.required_quantity,
            product.required_unit,
            product.line_cost
        );
    }

    println!("\nTotal: {:.2} (budget {:.2})", planned.total_cost, request.budget);
    if planned.within_budget {
        println!("The plan fits the budget.");
    } else {
        println!(
            "The plan exceeds the budget by {:.2}{}.",
            planned.total_cost - request.budget,
            if planned.adjusted { " even after adjustment" } else { "" }
        );
    }

    let record = planned.to_record(&request);
    let tracker = ShoppingTracker::from_products(planned.shopping_list.clone());
    user_data.menu_history.push(record);
    user_data.current_shopping_list = tracker.into_entries();

    store
        .save(&cli_args.user, &user_data)
        .await
        .with_context(|| format!("Failed to save data for user '{}'", cli_args.user))?;
    println!(
        "\nSaved menu #{} for user '{}'.",
        user_data.menu_history.len(),
        cli_args.user
    );

    Ok(())
}
