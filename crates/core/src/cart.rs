//! Shopping cart lines and totals.
//!
//! The cart is owned by the shopper's session. Lines are keyed by product,
//! size and color; unit prices are copied from the catalog when a line is
//! added and refreshed before checkout.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::ProductId;
use crate::types::price::round_cents;

/// Maximum quantity for a single cart line.
pub const MAX_LINE_QUANTITY: u32 = 99;

/// Errors from cart mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("quantity must be at least 1")]
    InvalidQuantity,
    #[error("item is not in the cart")]
    LineNotFound,
}

/// Identity of a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineKey {
    pub product_id: ProductId,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

/// One line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub name: String,
    pub image: Option<String>,
    pub unit_price: Decimal,
    pub size: Option<String>,
    pub color: Option<String>,
    pub quantity: u32,
}

impl CartItem {
    #[must_use]
    pub fn key(&self) -> LineKey {
        LineKey {
            product_id: self.product_id,
            size: self.size.clone(),
            color: self.color.clone(),
        }
    }

    fn matches(&self, key: &LineKey) -> bool {
        self.product_id == key.product_id && self.size == key.size && self.color == key.color
    }

    /// `unit_price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Shipping and tax rules applied to a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShippingPolicy {
    /// Shipping charged below the free-shipping threshold.
    pub flat_rate: Decimal,
    /// Subtotal at or above which shipping is free. `None` disables free shipping.
    pub free_shipping_threshold: Option<Decimal>,
    /// Sales tax as a fraction of the subtotal (e.g. `0.08`).
    pub tax_rate: Decimal,
}

impl ShippingPolicy {
    /// Shipping owed for a given subtotal.
    #[must_use]
    pub fn shipping_for(&self, subtotal: Decimal) -> Decimal {
        let free = subtotal.is_zero()
            || self
                .free_shipping_threshold
                .is_some_and(|threshold| subtotal >= threshold);
        if free { Decimal::ZERO } else { self.flat_rate }
    }
}

impl Default for ShippingPolicy {
    fn default() -> Self {
        Self {
            flat_rate: Decimal::new(999, 2),
            free_shipping_threshold: Some(Decimal::ONE_HUNDRED),
            tax_rate: Decimal::ZERO,
        }
    }
}

/// Computed cart totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub item_count: u32,
}

/// A shopper's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub items: Vec<CartItem>,
}

impl Cart {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add a line, merging with an existing line that has the same key.
    ///
    /// Quantities are capped at [`MAX_LINE_QUANTITY`].
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` if `item.quantity` is zero.
    pub fn add(&mut self, item: CartItem) -> Result<(), CartError> {
        if item.quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }

        let key = item.key();
        if let Some(existing) = self.items.iter_mut().find(|line| line.matches(&key)) {
            existing.quantity = existing
                .quantity
                .saturating_add(item.quantity)
                .min(MAX_LINE_QUANTITY);
            existing.unit_price = item.unit_price;
        } else {
            self.items.push(CartItem {
                quantity: item.quantity.min(MAX_LINE_QUANTITY),
                ..item
            });
        }
        Ok(())
    }

    /// Set a line's quantity. Zero removes the line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::LineNotFound` if no line has this key.
    pub fn set_quantity(&mut self, key: &LineKey, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return self.remove(key);
        }

        let line = self
            .items
            .iter_mut()
            .find(|line| line.matches(key))
            .ok_or(CartError::LineNotFound)?;
        line.quantity = quantity.min(MAX_LINE_QUANTITY);
        Ok(())
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::LineNotFound` if no line has this key.
    pub fn remove(&mut self, key: &LineKey) -> Result<(), CartError> {
        let before = self.items.len();
        self.items.retain(|line| !line.matches(key));
        if self.items.len() == before {
            return Err(CartError::LineNotFound);
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|line| line.quantity).sum()
    }

    /// Units of one product across all of its lines, skipping `except`.
    ///
    /// Stock is tracked per product, not per size or color.
    #[must_use]
    pub fn product_quantity(&self, product_id: ProductId, except: Option<&LineKey>) -> u32 {
        self.items
            .iter()
            .filter(|line| line.product_id == product_id)
            .filter(|line| except.is_none_or(|key| !line.matches(key)))
            .map(|line| line.quantity)
            .sum()
    }

    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Compute subtotal, shipping, tax and grand total.
    #[must_use]
    pub fn totals(&self, policy: &ShippingPolicy) -> CartTotals {
        let subtotal = round_cents(self.subtotal());
        let shipping = policy.shipping_for(subtotal);
        let tax = round_cents(subtotal * policy.tax_rate);

        CartTotals {
            subtotal,
            shipping,
            tax,
            total: subtotal + shipping + tax,
            item_count: self.item_count(),
        }
    }

    /// Refresh unit prices from the catalog.
    ///
    /// `lookup` returns the current price of a product, or `None` when the
    /// product is gone or inactive. Such lines are dropped and returned.
    pub fn reprice(&mut self, lookup: impl Fn(ProductId) -> Option<Decimal>) -> Vec<CartItem> {
        let mut dropped = Vec::new();
        let mut kept = Vec::with_capacity(self.items.len());

        for mut line in self.items.drain(..) {
            match lookup(line.product_id) {
                Some(price) => {
                    line.unit_price = price;
                    kept.push(line);
                }
                None => dropped.push(line),
            }
        }

        self.items = kept;
        dropped
    }
}
