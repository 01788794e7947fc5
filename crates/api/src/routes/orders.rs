//! Checkout and order route handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use maplemart_core::{OrderId, PaymentMethod, ProductId};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use crate::error::{ApiError, Result};
use crate::middleware::RequireAuth;
use crate::models::{Order, OrderTotals, ShippingAddress};
use crate::services::checkout::LineRequest;
use crate::state::AppState;

/// Create the checkout routes router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(show).patch(cancel))
}

/// One requested order line.
#[derive(Debug, Deserialize)]
pub struct OrderItemRequest {
    pub product: ProductId,
    pub quantity: i32,
}

/// Checkout request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub order_items: Vec<OrderItemRequest>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub items_price: Decimal,
    pub tax_price: Decimal,
    pub shipping_price: Decimal,
    pub total_price: Decimal,
}

/// Boundary validation of the checkout payload: structural rules only, the
/// business invariants (stock, product resolution) are re-checked in the
/// core.
fn validate_checkout(body: &CheckoutRequest) -> Result<()> {
    for item in &body.order_items {
        if item.quantity < 1 {
            return Err(ApiError::InvalidQuantity(item.quantity));
        }
    }

    let required = [
        ("firstName", &body.shipping_address.first_name),
        ("lastName", &body.shipping_address.last_name),
        ("street", &body.shipping_address.street),
        ("city", &body.shipping_address.city),
        ("state", &body.shipping_address.state),
        ("zipCode", &body.shipping_address.zip_code),
        ("phone", &body.shipping_address.phone),
    ];
    for (name, value) in required {
        if value.trim().is_empty() {
            return Err(ApiError::invalid_input(format!(
                "shippingAddress.{name} is required"
            )));
        }
    }

    let totals = OrderTotals {
        items_price: body.items_price,
        tax_price: body.tax_price,
        shipping_price: body.shipping_price,
        total_price: body.total_price,
    };
    if !totals.is_non_negative() {
        return Err(ApiError::invalid_input(
            "prices must be non-negative".to_owned(),
        ));
    }
    Ok(())
}

/// Place an order from the submitted line items.
#[instrument(skip(state, user, body), fields(user = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    validate_checkout(&body)?;

    let lines: Vec<LineRequest> = body
        .order_items
        .iter()
        .map(|item| LineRequest {
            product: item.product,
            quantity: item.quantity,
        })
        .collect();
    let totals = OrderTotals {
        items_price: body.items_price,
        tax_price: body.tax_price,
        shipping_price: body.shipping_price,
        total_price: body.total_price,
    };

    let order = state
        .checkout_service()
        .create_order(
            user.id,
            &user.email,
            &lines,
            body.shipping_address,
            body.payment_method,
            totals,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// The caller's orders, newest first.
#[instrument(skip(state, user), fields(user = %user.id))]
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Order>>> {
    let orders = state.checkout_service().list_orders(user.id).await?;
    Ok(Json(orders))
}

/// Order detail, visible to its owner or an admin.
#[instrument(skip(state, user), fields(user = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    let order = state
        .checkout_service()
        .get_order(id, user.id, user.role)
        .await?;
    Ok(Json(order))
}

/// Cancel a pending order, restoring its stock.
#[instrument(skip(state, user), fields(user = %user.id))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    let order = state
        .checkout_service()
        .cancel_order(id, user.id, user.role)
        .await?;
    Ok(Json(order))
}
