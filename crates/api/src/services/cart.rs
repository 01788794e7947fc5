//! Cart service.
//!
//! Enforces the cart operation contract: quantities are at least 1, adds
//! resolve to an existing in-stock product, and every operation is scoped to
//! the authenticated caller's own cart.

use std::sync::Arc;

use maplemart_core::{CartItemId, ProductId, UserId};
use thiserror::Error;

use crate::models::Cart;
use crate::store::{CartStore, CatalogStore, StoreError};

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The product does not resolve to an existing, in-stock product.
    #[error("product {0} not found or out of stock")]
    InvalidProduct(ProductId),

    /// Quantities must be at least 1; removal is a distinct operation.
    #[error("quantity must be at least 1, got {0}")]
    InvalidQuantity(i32),

    /// The item id is not in this user's cart.
    #[error("item not found in cart")]
    ItemNotFound(CartItemId),

    /// Underlying storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Service for a user's cart.
pub struct CartService {
    catalog: Arc<dyn CatalogStore>,
    carts: Arc<dyn CartStore>,
}

impl CartService {
    /// Create the service over its collaborators.
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogStore>, carts: Arc<dyn CartStore>) -> Self {
        Self { catalog, carts }
    }

    /// The user's cart; empty (never an error) when none exists yet.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn get(&self, user: UserId) -> Result<Cart, CartError> {
        Ok(self.carts.get(user).await?)
    }

    /// Merge `qty` units of a product into the user's cart.
    ///
    /// # Errors
    ///
    /// `InvalidQuantity` if `qty < 1`; `InvalidProduct` if the product does
    /// not exist or is out of stock.
    pub async fn add(&self, user: UserId, product: ProductId, qty: i32) -> Result<Cart, CartError> {
        if qty < 1 {
            return Err(CartError::InvalidQuantity(qty));
        }
        let resolved = self
            .catalog
            .get(product)
            .await?
            .ok_or(CartError::InvalidProduct(product))?;
        if !resolved.in_stock {
            return Err(CartError::InvalidProduct(product));
        }
        Ok(self.carts.add(user, product, qty).await?)
    }

    /// Replace a cart line's quantity.
    ///
    /// # Errors
    ///
    /// `InvalidQuantity` if `qty < 1` (there is no remove-via-zero);
    /// `ItemNotFound` if the item is not in this user's cart.
    pub async fn update_quantity(
        &self,
        user: UserId,
        item: CartItemId,
        qty: i32,
    ) -> Result<Cart, CartError> {
        if qty < 1 {
            return Err(CartError::InvalidQuantity(qty));
        }
        self.carts
            .update_quantity(user, item, qty)
            .await?
            .ok_or(CartError::ItemNotFound(item))
    }

    /// Remove a line from the user's cart.
    ///
    /// # Errors
    ///
    /// `ItemNotFound` if the item is not in this user's cart.
    pub async fn remove(&self, user: UserId, item: CartItemId) -> Result<Cart, CartError> {
        self.carts
            .remove(user, item)
            .await?
            .ok_or(CartError::ItemNotFound(item))
    }

    /// Remove every line from the user's cart.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn clear(&self, user: UserId) -> Result<Cart, CartError> {
        Ok(self.carts.clear(user).await?)
    }
}
