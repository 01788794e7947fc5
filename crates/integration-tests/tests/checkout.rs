//! Checkout and cancellation: all-or-nothing reservations, snapshots, the
//! order state machine, and access control.

use maplemart_api::models::ProductPatch;
use maplemart_api::services::checkout::{LineRequest, OrderAccessError};
use maplemart_api::store::{CancelError, CheckoutError};
use maplemart_core::{OrderStatus, PaymentMethod, ProductId, UserId, UserRole};
use maplemart_integration_tests::{
    checkout_service, customer, seed_product, shipping_address, stores, totals,
};
use rust_decimal::Decimal;

#[tokio::test]
async fn reserve_then_restore_round_trips_the_counter() {
    let stores = stores();
    let product = seed_product(&stores, "Kettle", Decimal::new(4999, 2), 10).await;

    let left = stores.stock.reserve(product.id, 3).await.unwrap();
    assert_eq!(left, 7);
    let left = stores.stock.restore(product.id, 3).await.unwrap();
    assert_eq!(left, 10);
}

#[tokio::test]
async fn checkout_with_an_insufficient_line_commits_nothing() {
    let stores = stores();
    let service = checkout_service(&stores);
    let in_stock = seed_product(&stores, "Kettle", Decimal::new(4999, 2), 10).await;
    let sold_out = seed_product(&stores, "Toaster", Decimal::new(2999, 2), 0).await;
    let (user, email) = customer(1);

    let err = service
        .create_order(
            user,
            &email,
            &[
                LineRequest {
                    product: in_stock.id,
                    quantity: 1,
                },
                LineRequest {
                    product: sold_out.id,
                    quantity: 1,
                },
            ],
            shipping_address(),
            PaymentMethod::Upi,
            totals(Decimal::new(7998, 2)),
        )
        .await
        .unwrap_err();

    match err {
        CheckoutError::InsufficientStock {
            product_id,
            title,
            available,
        } => {
            assert_eq!(product_id, sold_out.id);
            assert_eq!(title, "Toaster");
            assert_eq!(available, 0);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    // The first line's stock must be untouched.
    let kettle = stores.catalog.get(in_stock.id).await.unwrap().unwrap();
    assert_eq!(kettle.stock, 10);
    assert!(service.list_orders(user).await.unwrap().is_empty());
}

#[tokio::test]
async fn checkout_reserves_stock_clears_cart_and_snapshots_prices() {
    let stores = stores();
    let service = checkout_service(&stores);
    let product = seed_product(&stores, "Kettle", Decimal::new(4999, 2), 10).await;
    let (user, email) = customer(1);

    stores.carts.add(user, product.id, 2).await.unwrap();

    let order = service
        .create_order(
            user,
            &email,
            &[LineRequest {
                product: product.id,
                quantity: 2,
            }],
            shipping_address(),
            PaymentMethod::CreditCard,
            totals(Decimal::new(9998, 2)),
        )
        .await
        .unwrap();

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.lines.len(), 1);
    assert_eq!(order.lines[0].unit_price, Decimal::new(4999, 2));
    assert_eq!(order.lines[0].title, "Kettle");

    let product_after = stores.catalog.get(product.id).await.unwrap().unwrap();
    assert_eq!(product_after.stock, 8);
    assert!(stores.carts.get(user).await.unwrap().items.is_empty());

    // Later catalog edits must not rewrite order history.
    stores
        .catalog
        .update(
            product.id,
            ProductPatch {
                title: Some("Kettle v2".to_owned()),
                current_price: Some(Decimal::new(100, 2)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let stored = stores.orders.get(order.id).await.unwrap().unwrap();
    assert_eq!(stored.lines[0].title, "Kettle");
    assert_eq!(stored.lines[0].unit_price, Decimal::new(4999, 2));
}

#[tokio::test]
async fn empty_orders_and_unknown_products_are_rejected() {
    let stores = stores();
    let service = checkout_service(&stores);
    let (user, email) = customer(1);

    let err = service
        .create_order(
            user,
            &email,
            &[],
            shipping_address(),
            PaymentMethod::Paypal,
            totals(Decimal::ZERO),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::EmptyOrder));

    let err = service
        .create_order(
            user,
            &email,
            &[LineRequest {
                product: ProductId::new(404),
                quantity: 1,
            }],
            shipping_address(),
            PaymentMethod::Paypal,
            totals(Decimal::ONE),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CheckoutError::ProductNotFound(id) if id == ProductId::new(404)
    ));
}

#[tokio::test]
async fn cancelling_restores_stock_exactly_once() {
    let stores = stores();
    let service = checkout_service(&stores);
    let product = seed_product(&stores, "Kettle", Decimal::new(4999, 2), 10).await;
    let (user, email) = customer(1);

    let order = service
        .create_order(
            user,
            &email,
            &[LineRequest {
                product: product.id,
                quantity: 4,
            }],
            shipping_address(),
            PaymentMethod::Upi,
            totals(Decimal::new(19996, 2)),
        )
        .await
        .unwrap();
    assert_eq!(
        stores.catalog.get(product.id).await.unwrap().unwrap().stock,
        6
    );

    let cancelled = service
        .cancel_order(order.id, user, UserRole::Customer)
        .await
        .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(
        stores.catalog.get(product.id).await.unwrap().unwrap().stock,
        10
    );

    // A second cancel must fail and must not restore again.
    let err = service
        .cancel_order(order.id, user, UserRole::Customer)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CancelError::InvalidTransition(OrderStatus::Cancelled)
    ));
    assert_eq!(
        stores.catalog.get(product.id).await.unwrap().unwrap().stock,
        10
    );
}

#[tokio::test]
async fn cancel_requires_owner_or_admin() {
    let stores = stores();
    let service = checkout_service(&stores);
    let product = seed_product(&stores, "Kettle", Decimal::new(4999, 2), 10).await;
    let (owner, email) = customer(1);
    let (stranger, _) = customer(2);

    let order = service
        .create_order(
            owner,
            &email,
            &[LineRequest {
                product: product.id,
                quantity: 1,
            }],
            shipping_address(),
            PaymentMethod::Upi,
            totals(Decimal::new(4999, 2)),
        )
        .await
        .unwrap();

    let err = service
        .cancel_order(order.id, stranger, UserRole::Customer)
        .await
        .unwrap_err();
    assert!(matches!(err, CancelError::Forbidden));

    // An admin may cancel on the owner's behalf.
    let cancelled = service
        .cancel_order(order.id, stranger, UserRole::Admin)
        .await
        .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
}

#[tokio::test]
async fn orders_are_visible_to_owner_and_admin_only_and_list_newest_first() {
    let stores = stores();
    let service = checkout_service(&stores);
    let product = seed_product(&stores, "Kettle", Decimal::new(4999, 2), 10).await;
    let (owner, email) = customer(1);
    let (stranger, _) = customer(2);

    let first = service
        .create_order(
            owner,
            &email,
            &[LineRequest {
                product: product.id,
                quantity: 1,
            }],
            shipping_address(),
            PaymentMethod::Upi,
            totals(Decimal::new(4999, 2)),
        )
        .await
        .unwrap();
    let second = service
        .create_order(
            owner,
            &email,
            &[LineRequest {
                product: product.id,
                quantity: 1,
            }],
            shipping_address(),
            PaymentMethod::Upi,
            totals(Decimal::new(4999, 2)),
        )
        .await
        .unwrap();

    let err = service
        .get_order(first.id, stranger, UserRole::Customer)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderAccessError::Forbidden));

    let viewed = service
        .get_order(first.id, stranger, UserRole::Admin)
        .await
        .unwrap();
    assert_eq!(viewed.id, first.id);

    let listed = service.list_orders(owner).await.unwrap();
    assert_eq!(
        listed.iter().map(|o| o.id).collect::<Vec<_>>(),
        vec![second.id, first.id]
    );
}
