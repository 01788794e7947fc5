//! Checkout service.
//!
//! Turns a validated request into an order draft with denormalized product
//! snapshots, hands it to the order ledger for the all-or-nothing commit,
//! and fires the (best-effort) buyer and staff notifications.

use std::sync::Arc;

use maplemart_core::{Email, OrderId, PaymentMethod, ProductId, UserId, UserRole};
use thiserror::Error;

use super::notify::Notifier;
use crate::models::{Order, OrderDraft, OrderLine, OrderTotals, ShippingAddress};
use crate::store::{CancelError, CatalogStore, CheckoutError, OrderLedger, StoreError};

/// A requested order line, still by reference.
#[derive(Debug, Clone, Copy)]
pub struct LineRequest {
    pub product: ProductId,
    pub quantity: i32,
}

/// Errors from reading an order.
#[derive(Debug, Error)]
pub enum OrderAccessError {
    /// The order id does not resolve.
    #[error("order not found")]
    NotFound,

    /// The requester is neither the owner nor an admin.
    #[error("not authorized to view this order")]
    Forbidden,

    /// Underlying storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Service for placing, reading, and cancelling orders.
pub struct CheckoutService {
    catalog: Arc<dyn CatalogStore>,
    orders: Arc<dyn OrderLedger>,
    notifier: Notifier,
}

impl CheckoutService {
    /// Create the service over its collaborators.
    #[must_use]
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        orders: Arc<dyn OrderLedger>,
        notifier: Notifier,
    ) -> Self {
        Self {
            catalog,
            orders,
            notifier,
        }
    }

    /// Place an order from the given line items.
    ///
    /// Resolves and snapshots every product, then commits through the order
    /// ledger: stock is reserved for every line or for none, the order is
    /// persisted as `pending`, and the user's cart is cleared. Notifications
    /// go out after the commit and never affect the result.
    ///
    /// # Errors
    ///
    /// `EmptyOrder`, `ProductNotFound`, `InsufficientStock` (naming the
    /// offending product and its availability), or a storage failure.
    pub async fn create_order(
        &self,
        user: UserId,
        buyer: &Email,
        items: &[LineRequest],
        shipping_address: ShippingAddress,
        payment_method: PaymentMethod,
        totals: OrderTotals,
    ) -> Result<Order, CheckoutError> {
        if items.is_empty() {
            return Err(CheckoutError::EmptyOrder);
        }

        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            let product = self
                .catalog
                .get(item.product)
                .await
                .map_err(CheckoutError::Store)?
                .ok_or(CheckoutError::ProductNotFound(item.product))?;
            lines.push(OrderLine::snapshot(&product, item.quantity));
        }

        let order = self
            .orders
            .create(OrderDraft {
                user_id: user,
                lines,
                shipping_address,
                payment_method,
                totals,
            })
            .await?;

        let notifier = self.notifier.clone();
        let placed = order.clone();
        let buyer = buyer.clone();
        tokio::spawn(async move {
            notifier.order_placed(&placed, &buyer).await;
        });

        Ok(order)
    }

    /// Cancel a `pending` order, restoring every line's stock exactly once.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Forbidden` (requester is neither owner nor admin), or
    /// `InvalidTransition` when the order has already left `pending`.
    pub async fn cancel_order(
        &self,
        id: OrderId,
        requester: UserId,
        role: UserRole,
    ) -> Result<Order, CancelError> {
        let order = self
            .orders
            .get(id)
            .await
            .map_err(CancelError::Store)?
            .ok_or(CancelError::NotFound)?;
        if order.user_id != requester && !role.is_admin() {
            return Err(CancelError::Forbidden);
        }
        self.orders.cancel(id).await
    }

    /// Fetch an order, visible to its owner or an admin only.
    ///
    /// # Errors
    ///
    /// `NotFound` or `Forbidden`.
    pub async fn get_order(
        &self,
        id: OrderId,
        requester: UserId,
        role: UserRole,
    ) -> Result<Order, OrderAccessError> {
        let order = self
            .orders
            .get(id)
            .await?
            .ok_or(OrderAccessError::NotFound)?;
        if order.user_id != requester && !role.is_admin() {
            return Err(OrderAccessError::Forbidden);
        }
        Ok(order)
    }

    /// The user's own orders, newest first.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn list_orders(&self, user: UserId) -> Result<Vec<Order>, StoreError> {
        self.orders.list_for_user(user).await
    }
}
