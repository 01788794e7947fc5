//! Order model.
//!
//! Orders are immutable once created: line items carry the product title,
//! unit price, and image captured at order time, so later catalog edits never
//! rewrite order history. Only the status field changes after creation.

use chrono::{DateTime, Utc};
use maplemart_core::{OrderId, OrderStatus, PaymentMethod, ProductId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::product::Product;

/// A denormalized order line: product state snapshotted at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: ProductId,
    pub title: String,
    pub unit_price: Decimal,
    pub image: Option<String>,
    pub quantity: i32,
}

impl OrderLine {
    /// Snapshot a product into an order line.
    #[must_use]
    pub fn snapshot(product: &Product, quantity: i32) -> Self {
        Self {
            product_id: product.id,
            title: product.title.clone(),
            unit_price: product.current_price,
            image: product
                .main_images
                .first()
                .map(|asset| asset.url.clone()),
            quantity,
        }
    }
}

/// Shipping address snapshot embedded in an order.
///
/// Decoupled from the address book: deleting or editing a saved address never
/// changes where an existing order ships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub first_name: String,
    pub last_name: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    #[serde(default)]
    pub country: String,
    pub phone: String,
}

/// Order totals as computed by the checkout flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    pub items_price: Decimal,
    pub tax_price: Decimal,
    pub shipping_price: Decimal,
    pub total_price: Decimal,
}

impl OrderTotals {
    /// Whether every component is non-negative.
    #[must_use]
    pub fn is_non_negative(&self) -> bool {
        !self.items_price.is_sign_negative()
            && !self.tax_price.is_sign_negative()
            && !self.shipping_price.is_sign_negative()
            && !self.total_price.is_sign_negative()
    }
}

/// A placed order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub lines: Vec<OrderLine>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    #[serde(flatten)]
    pub totals: OrderTotals,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

/// A validated order ready to be committed by the order ledger.
///
/// Produced by the checkout service after resolving every product and
/// snapshotting its lines; the ledger still performs the authoritative
/// all-or-nothing stock reservation when committing.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub user_id: UserId,
    pub lines: Vec<OrderLine>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub totals: OrderTotals,
}

#[cfg(test)]
mod tests {
    use maplemart_core::ProductId;

    use super::*;
    use crate::models::product::ProductAsset;

    fn product(id: i32, price: Decimal) -> Product {
        Product {
            id: ProductId::new(id),
            title: format!("Product {id}"),
            description: String::new(),
            categories: vec![],
            original_price: price + Decimal::ONE,
            current_price: price,
            tax_rate: Decimal::ZERO,
            in_stock: true,
            visible: true,
            stock: 10,
            main_images: vec![ProductAsset::image("front.jpg")],
            gallery: vec![],
            key_benefits: vec![],
            detail_blocks: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn snapshot_captures_title_price_and_first_image() {
        let line = OrderLine::snapshot(&product(3, Decimal::new(1250, 2)), 2);
        assert_eq!(line.product_id, ProductId::new(3));
        assert_eq!(line.title, "Product 3");
        assert_eq!(line.unit_price, Decimal::new(1250, 2));
        assert_eq!(line.image.as_deref(), Some("front.jpg"));
        assert_eq!(line.quantity, 2);
    }

    #[test]
    fn totals_reject_negative_components() {
        let mut totals = OrderTotals {
            items_price: Decimal::new(100, 0),
            tax_price: Decimal::ZERO,
            shipping_price: Decimal::ZERO,
            total_price: Decimal::new(100, 0),
        };
        assert!(totals.is_non_negative());
        totals.shipping_price = Decimal::new(-1, 0);
        assert!(!totals.is_non_negative());
    }
}
