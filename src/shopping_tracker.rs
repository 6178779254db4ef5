use serde::{Deserialize, Serialize};

use crate::price_resolver::PricedProduct;

/// One line of the shopping list with its purchase state.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ShoppingListEntry {
    pub product: PricedProduct,
    pub purchased: bool,
    pub position: usize,
}

/// Bookkeeping over a finalized shopping list: which products have been
/// bought, what remains to spend, and how far along the user is.
///
/// Entries are created once per generated menu and only their `purchased`
/// flags mutate; a fresh generation replaces the whole list.
#[derive(Debug, Default, Clone)]
pub struct ShoppingTracker {
    entries: Vec<ShoppingListEntry>,
}

impl ShoppingTracker {
    pub fn from_products(products: Vec<PricedProduct>) -> Self {
        let entries = products
            .into_iter()
            .enumerate()
            .map(|(position, product)| ShoppingListEntry {
                product,
                purchased: false,
                position,
            })
            .collect();
        ShoppingTracker { entries }
    }

    pub fn from_entries(entries: Vec<ShoppingListEntry>) -> Self {
        ShoppingTracker { entries }
    }

    pub fn entries(&self) -> &[ShoppingListEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<ShoppingListEntry> {
        self.entries
    }

    /// Flips the purchase flag at `position`; returns the new state, or
    /// `None` for an out-of-range position.
    pub fn toggle(&mut self, position: usize) -> Option<bool> {
        let entry = self.entries.get_mut(position)?;
        entry.purchased = !entry.purchased;
        Some(entry.purchased)
    }

    pub fn mark_all_purchased(&mut self) {
        for entry in &mut self.entries {
            entry.purchased = true;
        }
    }

    pub fn clear_purchases(&mut self) {
        for entry in &mut self.entries {
            entry.purchased = false;
        }
    }

    pub fn total_cost(&self) -> f64 {
        self.entries.iter().map(|e| e.product.line_cost).sum()
    }

    /// Cost of everything not yet purchased.
    pub fn remaining_cost(&self) -> f64 {
        self.entries
            .iter()
            .filter(|e| !e.purchased)
            .map(|e| e.product.line_cost)
            .sum()
    }

    /// Purchased fraction in [0, 1]; an empty list reports 0.
    pub fn progress(&self) -> f64 {
        if self.entries.is_empty() {
            return 0.0;
        }
        let purchased = self.entries.iter().filter(|e| e.purchased).count();
        purchased as f64 / self.entries.len() as f64
    }

    /// Names of purchased products, formatted for the available-ingredients
    /// list ("Milk 3.2% (200 ml)").
    pub fn purchased_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.purchased)
            .map(|e| {
                format!(
                    "{} ({} {})",
                    e.product.display_name, e.product.required_quantity, e.product.required_unit
                )
            })
            .collect()
    }
}
