//! Shopping cart model.
//!
//! One cart per user, created lazily on first add. A product appears at most
//! once per cart; adding it again merges quantities.

use maplemart_core::{CartItemId, ProductId, UserId};
use serde::{Deserialize, Serialize};

/// A line in a user's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub quantity: i32,
}

/// A user's cart. Absence of a stored cart is represented as an empty one,
/// never as an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub user_id: UserId,
    pub items: Vec<CartItem>,
}

impl Cart {
    /// An empty cart for the given user.
    #[must_use]
    pub const fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            items: Vec::new(),
        }
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn unit_count(&self) -> i64 {
        self.items.iter().map(|item| i64::from(item.quantity)).sum()
    }
}
