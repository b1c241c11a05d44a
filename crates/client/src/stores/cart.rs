//! Local shopping cart.
//!
//! The cart never talks to the server. Totals are derived on every read.

use serde::{Deserialize, Serialize};

use virtual_craft_core::{Price, Product, ProductId};

/// A product and how many of it are in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product: Product,
    pub quantity: u32,
}

impl CartItem {
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.price.times(self.quantity)
    }
}

/// Session-scoped cart. Serializable so a host can persist it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartStore {
    items: Vec<CartItem>,
}

impl CartStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Line items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Add one unit of `product`, merging with an existing line.
    pub fn add(&mut self, product: &Product) {
        if let Some(item) = self.items.iter_mut().find(|i| i.product.id == product.id) {
            item.quantity = item.quantity.saturating_add(1);
        } else {
            self.items.push(CartItem {
                product: product.clone(),
                quantity: 1,
            });
        }
    }

    /// Set a line's quantity. Negative values clamp to zero, and zero
    /// removes the line. Unknown products are ignored.
    pub fn update_quantity(&mut self, product_id: ProductId, quantity: i64) {
        let quantity = u32::try_from(quantity.max(0)).unwrap_or(u32::MAX);
        if quantity == 0 {
            self.remove(product_id);
        } else if let Some(item) = self.items.iter_mut().find(|i| i.product.id == product_id) {
            item.quantity = quantity;
        }
    }

    pub fn remove(&mut self, product_id: ProductId) {
        self.items.retain(|i| i.product.id != product_id);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Sum of price times quantity over all lines.
    #[must_use]
    pub fn total(&self) -> Price {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Total units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0_u32, |count, i| count.saturating_add(i.quantity))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
