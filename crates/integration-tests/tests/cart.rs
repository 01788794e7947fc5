//! Cart behavior: merge-on-add, quantity rules, per-user scoping.

use maplemart_api::services::cart::{CartError, CartService};
use maplemart_api::store::Stores;
use maplemart_core::{CartItemId, ProductId, UserId};
use maplemart_integration_tests::{seed_product, stores};
use rust_decimal::Decimal;
use std::sync::Arc;

fn cart_service(stores: &Stores) -> CartService {
    CartService::new(Arc::clone(&stores.catalog), Arc::clone(&stores.carts))
}

#[tokio::test]
async fn adding_the_same_product_twice_merges_quantities() {
    let stores = stores();
    let carts = cart_service(&stores);
    let product = seed_product(&stores, "Kettle", Decimal::new(4999, 2), 10).await;
    let user = UserId::new(1);

    carts.add(user, product.id, 2).await.unwrap();
    let cart = carts.add(user, product.id, 3).await.unwrap();

    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].product_id, product.id);
    assert_eq!(cart.items[0].quantity, 5);
}

#[tokio::test]
async fn empty_cart_reads_are_idempotent_and_never_error() {
    let stores = stores();
    let carts = cart_service(&stores);
    let user = UserId::new(1);

    let first = carts.get(user).await.unwrap();
    let second = carts.get(user).await.unwrap();
    assert!(first.items.is_empty());
    assert_eq!(first, second);
}

#[tokio::test]
async fn add_rejects_quantities_below_one() {
    let stores = stores();
    let carts = cart_service(&stores);
    let product = seed_product(&stores, "Kettle", Decimal::new(4999, 2), 10).await;

    let err = carts.add(UserId::new(1), product.id, 0).await.unwrap_err();
    assert!(matches!(err, CartError::InvalidQuantity(0)));
}

#[tokio::test]
async fn add_rejects_unknown_and_out_of_stock_products() {
    let stores = stores();
    let carts = cart_service(&stores);

    let err = carts
        .add(UserId::new(1), ProductId::new(999), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::InvalidProduct(_)));

    // A product with the in-stock flag off is just as invalid to add.
    let product = seed_product(&stores, "Discontinued", Decimal::new(999, 2), 3).await;
    let patch = maplemart_api::models::ProductPatch {
        in_stock: Some(false),
        ..Default::default()
    };
    stores.catalog.update(product.id, patch).await.unwrap();

    let err = carts.add(UserId::new(1), product.id, 1).await.unwrap_err();
    assert!(matches!(err, CartError::InvalidProduct(_)));
}

#[tokio::test]
async fn update_quantity_enforces_minimum_and_membership() {
    let stores = stores();
    let carts = cart_service(&stores);
    let product = seed_product(&stores, "Kettle", Decimal::new(4999, 2), 10).await;
    let user = UserId::new(1);

    let cart = carts.add(user, product.id, 2).await.unwrap();
    let item = cart.items[0].id;

    // No remove-via-zero semantics.
    let err = carts.update_quantity(user, item, 0).await.unwrap_err();
    assert!(matches!(err, CartError::InvalidQuantity(0)));

    let err = carts
        .update_quantity(user, CartItemId::new(999), 4)
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::ItemNotFound(_)));

    let cart = carts.update_quantity(user, item, 4).await.unwrap();
    assert_eq!(cart.items[0].quantity, 4);
}

#[tokio::test]
async fn cart_operations_are_scoped_to_their_user() {
    let stores = stores();
    let carts = cart_service(&stores);
    let product = seed_product(&stores, "Kettle", Decimal::new(4999, 2), 10).await;
    let owner = UserId::new(1);
    let stranger = UserId::new(2);

    let cart = carts.add(owner, product.id, 2).await.unwrap();
    let item = cart.items[0].id;

    // Another user cannot touch the owner's line, even with the right id.
    let err = carts.update_quantity(stranger, item, 5).await.unwrap_err();
    assert!(matches!(err, CartError::ItemNotFound(_)));
    let err = carts.remove(stranger, item).await.unwrap_err();
    assert!(matches!(err, CartError::ItemNotFound(_)));

    // And the owner's cart is unchanged.
    let cart = carts.get(owner).await.unwrap();
    assert_eq!(cart.items[0].quantity, 2);
}

#[tokio::test]
async fn remove_and_clear_empty_the_cart() {
    let stores = stores();
    let carts = cart_service(&stores);
    let kettle = seed_product(&stores, "Kettle", Decimal::new(4999, 2), 10).await;
    let toaster = seed_product(&stores, "Toaster", Decimal::new(2999, 2), 10).await;
    let user = UserId::new(1);

    let cart = carts.add(user, kettle.id, 1).await.unwrap();
    carts.add(user, toaster.id, 1).await.unwrap();

    let cart = carts.remove(user, cart.items[0].id).await.unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].product_id, toaster.id);

    let cart = carts.clear(user).await.unwrap();
    assert!(cart.items.is_empty());
}
