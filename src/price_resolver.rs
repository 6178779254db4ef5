use serde::{Deserialize, Serialize};

use crate::api_connection::connection::ModelGateway;
use crate::product_catalog::{round_currency, CatalogProduct, ProductCatalog};
use crate::response_parser::parse_typed;

/// Fixed unit price used for placeholder products when no strategy matched.
pub const DEFAULT_UNIT_PRICE: f64 = 150.0;

/// A purchasable product matched (or synthesized) for one aggregated
/// ingredient requirement.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PricedProduct {
    pub display_name: String,
    pub package_description: String,
    pub unit_price: f64,
    pub required_quantity: f64,
    pub required_unit: String,
    /// Whole packages to buy; `None` for per-unit rates and model estimates.
    pub packages_needed: Option<u32>,
    pub line_cost: f64,
    /// False when the product is a placeholder estimate rather than a real
    /// catalog or model match.
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub note: Option<String>,
}

/// Structured product quote returned by a delegated pricing prompt.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProductQuote {
    pub name: String,
    #[serde(default)]
    pub pack: Option<String>,
    pub price: f64,
}

/// Maps an ingredient requirement to a priced product.
///
/// Strategies are tried in order and the first success wins: exact catalog
/// key, substring match, keyword table, a delegated pricing prompt through
/// the gateway, and finally a flagged placeholder. Resolution never fails;
/// a miss degrades to the placeholder so the pipeline always completes.
pub struct PriceResolver {
    catalog: ProductCatalog,
}

impl PriceResolver {
    pub fn new(catalog: ProductCatalog) -> Self {
        PriceResolver { catalog }
    }

    pub fn catalog(&self) -> &ProductCatalog {
        &self.catalog
    }

    pub async fn resolve(
        &self,
        gateway: &mut ModelGateway,
        ingredient_name: &str,
        quantity: f64,
        unit: &str,
    ) -> PricedProduct {
        let catalog_hit = self
            .catalog
            .find_exact(ingredient_name)
            .or_else(|| self.catalog.find_substring(ingredient_name))
            .or_else(|| self.catalog.find_keyword(ingredient_name));

        if let Some(product) = catalog_hit {
            return priced_from_catalog(product, quantity, unit);
        }

        if let Some(product) = self
            .delegated_quote(gateway, ingredient_name, quantity, unit)
            .await
        {
            return product;
        }

        placeholder_product(ingredient_name, quantity, unit)
    }

    /// Asks the generation service to quote the product. A response that does
    /// not parse into a usable quote is a miss, not an error.
    async fn delegated_quote(
        &self,
        gateway: &mut ModelGateway,
        ingredient_name: &str,
        quantity: f64,
        unit: &str,
    ) -> Option<PricedProduct> {
        let prompt = pricing_prompt(ingredient_name);
        let raw = gateway.generate(&prompt).await;
        match parse_typed::<ProductQuote>(&raw) {
            Ok(quote) if quote.price > 0.0 => Some(PricedProduct {
                display_name: quote.name,
                package_description: quote.pack.unwrap_or_else(|| "~".to_string()),
                unit_price: quote.price,
                required_quantity: quantity,
                required_unit: unit.to_string(),
                packages_needed: None,
                line_cost: round_currency(quote.price * quantity),
                available: true,
                note: Some("model-quoted estimate".to_string()),
            }),
            Ok(_) | Err(_) => None,
        }
    }
}

pub fn pricing_prompt(ingredient_name: &str) -> String {
    format!(
        "Find the price for the product \"{}\" in the store catalog. \
         Respond with JSON only, inside a fenced code block: an object with \
         fields name, pack, price. If the product is not listed, suggest the \
         closest substitute.",
        ingredient_name
    )
}

fn priced_from_catalog(product: &CatalogProduct, quantity: f64, unit: &str) -> PricedProduct {
    let (line_cost, packages_needed) = product.price_requirement(quantity, unit);
    PricedProduct {
        display_name: product.display_name.clone(),
        package_description: product.package_description(),
        unit_price: product.unit_price,
        required_quantity: quantity,
        required_unit: unit.to_string(),
        packages_needed,
        line_cost,
        available: true,
        note: None,
    }
}

fn placeholder_product(ingredient_name: &str, quantity: f64, unit: &str) -> PricedProduct {
    PricedProduct {
        display_name: ingredient_name.to_string(),
        package_description: "~".to_string(),
        unit_price: DEFAULT_UNIT_PRICE,
        required_quantity: quantity,
        required_unit: unit.to_string(),
        packages_needed: Some(1),
        line_cost: DEFAULT_UNIT_PRICE,
        available: false,
        note: Some(format!("No catalog match for \"{}\"; estimated price", ingredient_name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_connection::key_rotation::CredentialRotator;

    fn offline_gateway() -> ModelGateway {
        // No credentials: delegated lookups are answered by the offline
        // generator, with no network involved.
        ModelGateway::new(CredentialRotator::new(Vec::new()))
    }

    #[tokio::test]
    async fn exact_match_prices_from_the_catalog() {
        let resolver = PriceResolver::new(ProductCatalog::builtin());
        let mut gateway = offline_gateway();
        let product = resolver.resolve(&mut gateway, "Rice", 100.0, "g").await;
        assert!(product.available);
        assert_eq!(product.display_name, "Long-grain rice");
        assert_eq!(product.packages_needed, Some(1));
        assert_eq!(product.line_cost, 149.90);
    }

    #[tokio::test]
    async fn resolve_is_idempotent_for_catalog_matches() {
        let resolver = PriceResolver::new(ProductCatalog::builtin());
        let mut gateway = offline_gateway();
        let first = resolver.resolve(&mut gateway, "Milk", 200.0, "ml").await;
        let second = resolver.resolve(&mut gateway, "Milk", 200.0, "ml").await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn keyword_fallback_picks_a_representative() {
        let resolver = PriceResolver::new(ProductCatalog::builtin());
        let mut gateway = offline_gateway();
        let product = resolver.resolve(&mut gateway, "white fish of any kind", 300.0, "g").await;
        assert!(product.available);
        assert_eq!(product.display_name, "Salmon fillet");
    }

    #[tokio::test]
    async fn unmatched_ingredient_degrades_to_placeholder() {
        let resolver = PriceResolver::new(ProductCatalog::builtin());
        let mut gateway = offline_gateway();
        let product = resolver.resolve(&mut gateway, "quail eggs", 6.0, "pcs").await;
        assert!(!product.available);
        assert_eq!(product.unit_price, DEFAULT_UNIT_PRICE);
        assert_eq!(product.line_cost, DEFAULT_UNIT_PRICE);
        assert!(product.note.as_deref().unwrap_or_default().contains("quail eggs"));
    }

    #[tokio::test]
    async fn continuous_rate_line_cost_rounds_to_minor_unit() {
        let resolver = PriceResolver::new(ProductCatalog::builtin());
        let mut gateway = offline_gateway();
        // Chicken breast is priced per kilogram in the built-in catalog.
        let product = resolver.resolve(&mut gateway, "chicken breast", 150.0, "g").await;
        assert_eq!(product.packages_needed, None);
        assert_eq!(product.line_cost, round_currency(399.90 * 0.15));
    }
}
