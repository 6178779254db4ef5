use anyhow::{Context, Result};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Measurement units understood by the pricing layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Grams,
    Kilograms,
    Milliliters,
    Liters,
    Piece,
    Dozen,
}

impl Unit {
    pub fn label(&self) -> &'static str {
        match self {
            Unit::Grams => "g",
            Unit::Kilograms => "kg",
            Unit::Milliliters => "ml",
            Unit::Liters => "l",
            Unit::Piece => "pcs",
            Unit::Dozen => "dozen",
        }
    }
}

/// Parses a free-text unit as written by the generation service or the
/// canned plans. Unknown spellings return `None` and the caller assumes a
/// 1:1 relation to the package unit.
pub fn parse_unit(raw: &str) -> Option<Unit> {
    match raw.trim().to_lowercase().as_str() {
        "g" | "gr" | "gram" | "grams" => Some(Unit::Grams),
        "kg" | "kilogram" | "kilograms" => Some(Unit::Kilograms),
        "ml" | "milliliter" | "milliliters" => Some(Unit::Milliliters),
        "l" | "liter" | "liters" | "litre" | "litres" => Some(Unit::Liters),
        "pc" | "pcs" | "piece" | "pieces" | "count" | "item" | "items" => Some(Unit::Piece),
        "dozen" => Some(Unit::Dozen),
        _ => None,
    }
}

/// Converts a quantity between two units when they differ by a known scale
/// (g↔kg, ml↔l, piece↔dozen). Returns `None` for incompatible pairs.
pub fn convert_quantity(quantity: f64, from: Unit, to: Unit) -> Option<f64> {
    if from == to {
        return Some(quantity);
    }
    match (from, to) {
        (Unit::Grams, Unit::Kilograms) => Some(quantity / 1000.0),
        (Unit::Kilograms, Unit::Grams) => Some(quantity * 1000.0),
        (Unit::Milliliters, Unit::Liters) => Some(quantity / 1000.0),
        (Unit::Liters, Unit::Milliliters) => Some(quantity * 1000.0),
        (Unit::Piece, Unit::Dozen) => Some(quantity / 12.0),
        (Unit::Dozen, Unit::Piece) => Some(quantity * 12.0),
        _ => None,
    }
}

/// Rounds to the currency's minor unit (2 decimal places).
pub fn round_currency(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// How a catalog entry is priced.
///
/// `PerPackage` goods are bought in whole packs (`unit_price` per pack of
/// `pack_size` `pack_unit`); `PerUnit` goods are loose produce priced as a
/// continuous rate (`unit_price` per `pack_size` `pack_unit`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PricingMode {
    PerPackage,
    PerUnit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub display_name: String,
    pub pack_size: f64,
    pub pack_unit: Unit,
    pub unit_price: f64,
    pub pricing: PricingMode,
}

impl CatalogProduct {
    /// Human-readable packaging description, e.g. "500 g" or "10 pcs".
    pub fn package_description(&self) -> String {
        if self.pack_size == self.pack_size.trunc() {
            format!("{} {}", self.pack_size as i64, self.pack_unit.label())
        } else {
            format!("{} {}", self.pack_size, self.pack_unit.label())
        }
    }

    /// Line cost for a requirement of `quantity` `unit`, plus the whole
    /// package count for discrete goods.
    ///
    /// The requirement is converted into the package unit when the scale is
    /// known; otherwise the package price is multiplied by the raw quantity
    /// directly (the 1:1 assumption).
    pub fn price_requirement(&self, quantity: f64, unit: &str) -> (f64, Option<u32>) {
        let converted = parse_unit(unit)
            .and_then(|from| convert_quantity(quantity, from, self.pack_unit));
        let in_pack_units = match converted {
            Some(value) => value,
            None => return (round_currency(self.unit_price * quantity), None),
        };
        match self.pricing {
            PricingMode::PerPackage => {
                let packages = (in_pack_units / self.pack_size).ceil().max(1.0) as u32;
                (round_currency(packages as f64 * self.unit_price), Some(packages))
            }
            PricingMode::PerUnit => (
                round_currency(self.unit_price * in_pack_units / self.pack_size),
                None,
            ),
        }
    }
}

// Built-in store catalog: (key, display name, pack size, pack unit, price,
// pricing mode). Keys are lowercase; order matters for substring matching.
const BUILTIN_CATALOG: &[(&str, &str, f64, Unit, f64, PricingMode)] = &[
    // Dairy
    ("milk", "Milk 3.2%", 1.0, Unit::Liters, 89.90, PricingMode::PerPackage),
    ("cottage cheese", "Cottage cheese 5%", 200.0, Unit::Grams, 89.90, PricingMode::PerPackage),
    ("sour cream", "Sour cream 20%", 400.0, Unit::Grams, 89.90, PricingMode::PerPackage),
    ("parmesan", "Parmesan cheese", 100.0, Unit::Grams, 399.90, PricingMode::PerPackage),
    ("cheese", "Russian cheese", 200.0, Unit::Grams, 189.90, PricingMode::PerPackage),
    ("butter", "Butter 82.5%", 180.0, Unit::Grams, 159.90, PricingMode::PerPackage),
    // Meat and fish
    ("chicken breast", "Chicken breast fillet", 1.0, Unit::Kilograms, 399.90, PricingMode::PerUnit),
    ("salmon", "Salmon fillet", 300.0, Unit::Grams, 599.90, PricingMode::PerPackage),
    ("beef", "Beef tenderloin", 500.0, Unit::Grams, 899.90, PricingMode::PerPackage),
    // Grains and pasta
    ("oat flakes", "Oat flakes", 500.0, Unit::Grams, 89.90, PricingMode::PerPackage),
    ("buckwheat", "Buckwheat", 900.0, Unit::Grams, 119.90, PricingMode::PerPackage),
    ("rice", "Long-grain rice", 900.0, Unit::Grams, 149.90, PricingMode::PerPackage),
    ("pasta", "Spaghetti", 500.0, Unit::Grams, 79.90, PricingMode::PerPackage),
    ("croutons", "Rye croutons", 100.0, Unit::Grams, 89.90, PricingMode::PerPackage),
    // Produce
    ("potatoes", "Potatoes", 1.0, Unit::Kilograms, 89.90, PricingMode::PerUnit),
    ("carrots", "Carrots", 1.0, Unit::Kilograms, 79.90, PricingMode::PerUnit),
    ("onions", "Yellow onions", 1.0, Unit::Kilograms, 59.90, PricingMode::PerUnit),
    ("tomatoes", "Tomatoes", 1.0, Unit::Kilograms, 199.90, PricingMode::PerUnit),
    ("bananas", "Bananas", 1.0, Unit::Kilograms, 129.90, PricingMode::PerUnit),
    ("apples", "Golden apples", 1.0, Unit::Kilograms, 159.90, PricingMode::PerUnit),
    ("lemon", "Lemons", 1.0, Unit::Kilograms, 199.90, PricingMode::PerUnit),
    ("iceberg lettuce", "Iceberg lettuce", 400.0, Unit::Grams, 159.90, PricingMode::PerPackage),
    ("broccoli", "Frozen broccoli", 400.0, Unit::Grams, 199.90, PricingMode::PerPackage),
    ("spinach", "Frozen spinach", 400.0, Unit::Grams, 179.90, PricingMode::PerPackage),
    ("blueberries", "Frozen blueberries", 400.0, Unit::Grams, 299.90, PricingMode::PerPackage),
    // Eggs and oil
    ("chicken eggs", "Chicken eggs", 10.0, Unit::Piece, 129.90, PricingMode::PerPackage),
    ("sunflower oil", "Sunflower oil", 1.0, Unit::Liters, 89.90, PricingMode::PerPackage),
    // Staples
    ("sugar", "Granulated sugar", 1.0, Unit::Kilograms, 69.90, PricingMode::PerPackage),
    ("salt", "Table salt", 1.0, Unit::Kilograms, 29.90, PricingMode::PerPackage),
    ("black pepper", "Ground black pepper", 100.0, Unit::Grams, 89.90, PricingMode::PerPackage),
    // Nuts, dried fruit, herbs
    ("walnuts", "Walnuts", 200.0, Unit::Grams, 299.90, PricingMode::PerPackage),
    ("raisins", "Raisins", 200.0, Unit::Grams, 149.90, PricingMode::PerPackage),
    ("dried apricots", "Dried apricots", 200.0, Unit::Grams, 199.90, PricingMode::PerPackage),
    ("dill", "Fresh dill", 50.0, Unit::Grams, 89.90, PricingMode::PerPackage),
    ("parsley", "Fresh parsley", 50.0, Unit::Grams, 89.90, PricingMode::PerPackage),
    ("mixed greens", "Mixed greens", 100.0, Unit::Grams, 129.90, PricingMode::PerPackage),
];

/// Broad terms mapped to a representative catalog key, tried after exact and
/// substring matching.
const KEYWORD_TABLE: &[(&str, &str)] = &[
    ("meat", "chicken breast"),
    ("poultry", "chicken breast"),
    ("chicken", "chicken breast"),
    ("fish", "salmon"),
    ("vegetable", "potatoes"),
    ("fruit", "apples"),
    ("berries", "blueberries"),
    ("dairy", "milk"),
    ("grain", "rice"),
    ("cereal", "oat flakes"),
    ("greens", "mixed greens"),
    ("herbs", "mixed greens"),
    ("nuts", "walnuts"),
    ("oil", "sunflower oil"),
];

/// The static name→product price catalog with its lookup strategies.
#[derive(Debug, Clone)]
pub struct ProductCatalog {
    entries: Vec<(String, CatalogProduct)>,
}

impl ProductCatalog {
    pub fn builtin() -> Self {
        let entries = BUILTIN_CATALOG
            .iter()
            .map(|&(key, name, pack_size, pack_unit, unit_price, pricing)| {
                (
                    key.to_string(),
                    CatalogProduct {
                        display_name: name.to_string(),
                        pack_size,
                        pack_unit,
                        unit_price,
                        pricing,
                    },
                )
            })
            .collect();
        ProductCatalog { entries }
    }

    /// Loads a replacement catalog from a CSV file with the columns
    /// `Key,Product,Pack size,Pack unit,Price,Pricing`.
    pub fn from_csv(csv_path: &Path) -> Result<Self> {
        if !csv_path.exists() {
            return Err(anyhow::anyhow!("Catalog CSV file not found at: {:?}", csv_path));
        }

        let file = std::fs::File::open(csv_path)
            .with_context(|| format!("Failed to open catalog CSV file at {:?}", csv_path))?;
        let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(file);

        let headers = rdr.headers()?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| anyhow::anyhow!("Column '{}' not found", name))
        };
        let key_idx = column(KEY_COL)?;
        let name_idx = column(NAME_COL)?;
        let pack_size_idx = column(PACK_SIZE_COL)?;
        let pack_unit_idx = column(PACK_UNIT_COL)?;
        let price_idx = column(PRICE_COL)?;
        let pricing_idx = column(PRICING_COL)?;

        let mut entries = Vec::new();
        for (row_index, result) in rdr.records().enumerate() {
            let record =
                result.with_context(|| format!("Failed to read record at row index {}", row_index))?;
            let key = record
                .get(key_idx)
                .unwrap_or_default()
                .trim()
                .to_lowercase();
            if key.is_empty() {
                continue;
            }
            let pack_size = record
                .get(pack_size_idx)
                .and_then(|s| s.trim().parse::<f64>().ok());
            let unit_price = record
                .get(price_idx)
                .and_then(|s| s.trim().parse::<f64>().ok());
            let (pack_size, unit_price) = match (pack_size, unit_price) {
                (Some(size), Some(price)) if size > 0.0 && price >= 0.0 => (size, price),
                _ => continue,
            };
            let pack_unit = match record.get(pack_unit_idx).and_then(parse_unit) {
                Some(unit) => unit,
                None => continue,
            };
            let pricing = match record.get(pricing_idx).map(str::trim) {
                Some("per-unit") => PricingMode::PerUnit,
                Some("package") => PricingMode::PerPackage,
                _ => continue,
            };
            let display_name = record
                .get(name_idx)
                .unwrap_or_default()
                .trim()
                .to_string();
            entries.push((
                key,
                CatalogProduct {
                    display_name,
                    pack_size,
                    pack_unit,
                    unit_price,
                    pricing,
                },
            ));
        }

        if entries.is_empty() {
            return Err(anyhow::anyhow!("No valid catalog entries loaded from {:?}", csv_path));
        }
        Ok(ProductCatalog { entries })
    }

    /// Exact case-insensitive key match.
    pub fn find_exact(&self, ingredient_name: &str) -> Option<&CatalogProduct> {
        let needle = ingredient_name.trim().to_lowercase();
        self.entries
            .iter()
            .find(|(key, _)| *key == needle)
            .map(|(_, product)| product)
    }

    /// Substring match in either direction: the ingredient contains a catalog
    /// key, or a catalog key contains the ingredient.
    pub fn find_substring(&self, ingredient_name: &str) -> Option<&CatalogProduct> {
        let needle = ingredient_name.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|(key, _)| needle.contains(key.as_str()) || key.contains(&needle))
            .map(|(_, product)| product)
    }

    /// Keyword-table fallback mapping broad terms to a representative entry.
    pub fn find_keyword(&self, ingredient_name: &str) -> Option<&CatalogProduct> {
        let needle = ingredient_name.trim().to_lowercase();
        KEYWORD_TABLE
            .iter()
            .find(|(term, _)| needle.contains(term))
            .and_then(|(_, key)| self.find_exact(key))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

const KEY_COL: &str = "Key";
const NAME_COL: &str = "Product";
const PACK_SIZE_COL: &str = "Pack size";
const PACK_UNIT_COL: &str = "Pack unit";
const PRICE_COL: &str = "Price";
const PRICING_COL: &str = "Pricing";

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn parse_unit_accepts_common_spellings() {
        assert_eq!(parse_unit("g"), Some(Unit::Grams));
        assert_eq!(parse_unit(" Grams "), Some(Unit::Grams));
        assert_eq!(parse_unit("ML"), Some(Unit::Milliliters));
        assert_eq!(parse_unit("pieces"), Some(Unit::Piece));
        assert_eq!(parse_unit("cups"), None);
    }

    #[test]
    fn convert_quantity_known_scales() {
        assert_eq!(convert_quantity(1500.0, Unit::Grams, Unit::Kilograms), Some(1.5));
        assert_eq!(convert_quantity(2.0, Unit::Liters, Unit::Milliliters), Some(2000.0));
        assert_eq!(convert_quantity(6.0, Unit::Piece, Unit::Dozen), Some(0.5));
        assert_eq!(convert_quantity(100.0, Unit::Grams, Unit::Piece), None);
    }

    #[test]
    fn per_unit_pricing_scales_continuously() {
        let product = CatalogProduct {
            display_name: "Chicken breast fillet".to_string(),
            pack_size: 1.0,
            pack_unit: Unit::Kilograms,
            unit_price: 400.0,
            pricing: PricingMode::PerUnit,
        };
        let (cost, packages) = product.price_requirement(150.0, "g");
        assert_eq!(cost, 60.0);
        assert_eq!(packages, None);
    }

    #[test]
    fn per_package_pricing_rounds_packs_up() {
        let product = CatalogProduct {
            display_name: "Oat flakes".to_string(),
            pack_size: 500.0,
            pack_unit: Unit::Grams,
            unit_price: 89.90,
            pricing: PricingMode::PerPackage,
        };
        let (cost, packages) = product.price_requirement(600.0, "g");
        assert_eq!(packages, Some(2));
        assert_eq!(cost, 179.80);
    }

    #[test]
    fn eggs_by_the_dozen_convert_to_pack_pieces() {
        let product = CatalogProduct {
            display_name: "Chicken eggs".to_string(),
            pack_size: 10.0,
            pack_unit: Unit::Piece,
            unit_price: 129.90,
            pricing: PricingMode::PerPackage,
        };
        // One dozen = 12 pieces = 2 packs of 10.
        let (cost, packages) = product.price_requirement(1.0, "dozen");
        assert_eq!(packages, Some(2));
        assert_eq!(cost, 259.80);
    }

    #[test]
    fn unknown_unit_assumes_one_to_one() {
        let product = CatalogProduct {
            display_name: "Mixed greens".to_string(),
            pack_size: 100.0,
            pack_unit: Unit::Grams,
            unit_price: 129.90,
            pricing: PricingMode::PerPackage,
        };
        let (cost, packages) = product.price_requirement(2.0, "bunches");
        assert_eq!(packages, None);
        assert_eq!(cost, 259.80);
    }

    #[test]
    fn builtin_catalog_lookup_strategies() {
        let catalog = ProductCatalog::builtin();
        assert!(catalog.find_exact("Milk").is_some());
        assert!(catalog.find_exact("milk 3.2%").is_none());
        // Substring in both directions.
        assert_eq!(
            catalog.find_substring("fresh tomatoes").unwrap().display_name,
            "Tomatoes"
        );
        assert!(catalog.find_substring("tomat").is_some());
        // "eggs" is a substring of the "chicken eggs" key, but "quail eggs"
        // matches nothing in either direction.
        assert_eq!(
            catalog.find_substring("eggs").unwrap().display_name,
            "Chicken eggs"
        );
        assert!(catalog.find_substring("quail eggs").is_none());
        // Keyword table.
        assert_eq!(
            catalog.find_keyword("any white fish").unwrap().display_name,
            "Salmon fillet"
        );
        assert!(catalog.find_keyword("quail eggs").is_none());
    }

    #[test]
    fn csv_catalog_loads_and_skips_bad_rows() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "{},{},{},{},{},{}", KEY_COL, NAME_COL, PACK_SIZE_COL, PACK_UNIT_COL, PRICE_COL, PRICING_COL)?;
        writeln!(file, "milk,Whole milk,1,l,75.50,package")?;
        writeln!(file, "beef,Ground beef,1,kg,549.00,per-unit")?;
        writeln!(file, ",Nameless,1,kg,10.00,package")?;
        writeln!(file, "bad,Bad size,zero,kg,10.00,package")?;
        file.flush()?;

        let catalog = ProductCatalog::from_csv(file.path())?;
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.find_exact("milk").unwrap().unit_price, 75.50);
        assert_eq!(catalog.find_exact("beef").unwrap().pricing, PricingMode::PerUnit);
        Ok(())
    }

    #[test]
    fn csv_catalog_missing_column_errors() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "{},{},{},{},{}", KEY_COL, NAME_COL, PACK_SIZE_COL, PACK_UNIT_COL, PRICE_COL)?;
        writeln!(file, "milk,Whole milk,1,l,75.50")?;
        file.flush()?;

        let result = ProductCatalog::from_csv(file.path());
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains(&format!("Column '{}' not found", PRICING_COL)));
        Ok(())
    }

    #[test]
    fn csv_catalog_empty_errors() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "{},{},{},{},{},{}", KEY_COL, NAME_COL, PACK_SIZE_COL, PACK_UNIT_COL, PRICE_COL, PRICING_COL)?;
        file.flush()?;

        let result = ProductCatalog::from_csv(file.path());
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("No valid catalog entries"));
        Ok(())
    }
}
