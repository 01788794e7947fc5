//! Shared fixtures for the integration tests.
//!
//! All tests run against the in-memory backend and blob store, so they
//! exercise the real service and store logic without external services.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use maplemart_api::models::{NewProduct, OrderTotals, Product, ProductAsset, ShippingAddress};
use maplemart_api::services::blobs::MemoryBlobStore;
use maplemart_api::services::catalog::{CatalogService, ProductForm};
use maplemart_api::services::checkout::CheckoutService;
use maplemart_api::services::notify::Notifier;
use maplemart_api::store::Stores;
use maplemart_core::{Email, UserId};
use rust_decimal::Decimal;

/// A fresh in-memory store bundle.
#[must_use]
pub fn stores() -> Stores {
    Stores::memory()
}

/// A checkout service over the given stores with notifications disabled.
#[must_use]
pub fn checkout_service(stores: &Stores) -> CheckoutService {
    CheckoutService::new(
        Arc::clone(&stores.catalog),
        Arc::clone(&stores.orders),
        Notifier::disabled(),
    )
}

/// A catalog service over the given stores and blob store.
#[must_use]
pub fn catalog_service(stores: &Stores, blobs: &MemoryBlobStore) -> CatalogService {
    CatalogService::new(
        Arc::clone(&stores.catalog),
        Arc::clone(&stores.stock),
        Arc::new(blobs.clone()),
    )
}

/// Persist a minimal product with the given title, price, and stock.
///
/// # Panics
///
/// Panics if the in-memory store rejects the insert (it cannot).
pub async fn seed_product(stores: &Stores, title: &str, price: Decimal, stock: i32) -> Product {
    stores
        .catalog
        .create(NewProduct {
            title: title.to_owned(),
            description: String::new(),
            categories: vec![],
            original_price: price + Decimal::TEN,
            current_price: price,
            tax_rate: Decimal::ZERO,
            in_stock: true,
            stock,
            main_images: (0..4)
                .map(|i| ProductAsset::image(format!("{title}-main-{i}.jpg")))
                .collect(),
            gallery: vec![],
            key_benefits: vec![],
            detail_blocks: vec![],
        })
        .await
        .expect("seeding a product cannot fail in memory")
}

/// A filled-in shipping address.
#[must_use]
pub fn shipping_address() -> ShippingAddress {
    ShippingAddress {
        first_name: "Asha".to_owned(),
        last_name: "Rao".to_owned(),
        street: "12 Lake Road".to_owned(),
        city: "Pune".to_owned(),
        state: "MH".to_owned(),
        zip_code: "411001".to_owned(),
        country: "India".to_owned(),
        phone: "9876543210".to_owned(),
    }
}

/// Order totals with the given grand total and no tax or shipping.
#[must_use]
pub fn totals(total: Decimal) -> OrderTotals {
    OrderTotals {
        items_price: total,
        tax_price: Decimal::ZERO,
        shipping_price: Decimal::ZERO,
        total_price: total,
    }
}

/// An authenticated customer identity for tests.
///
/// # Panics
///
/// Never; the address literal is valid.
#[must_use]
pub fn customer(id: i32) -> (UserId, Email) {
    (
        UserId::new(id),
        Email::parse(&format!("customer{id}@example.com")).expect("valid test email"),
    )
}

/// A catalog create payload with four key benefits and no detail blocks.
#[must_use]
pub fn product_form(title: &str, original: Decimal, current: Decimal) -> ProductForm {
    use maplemart_api::services::assets::KeyBenefitInput;

    ProductForm {
        title: title.to_owned(),
        description: "a fine product".to_owned(),
        categories: vec!["kitchen".to_owned()],
        original_price: original,
        current_price: current,
        tax_rate: Decimal::ZERO,
        in_stock: true,
        stock: 5,
        key_benefits: (0..4)
            .map(|i| KeyBenefitInput {
                title: format!("Benefit {i}"),
                description: "why it is good".to_owned(),
            })
            .collect(),
        detail_blocks: vec![],
    }
}
