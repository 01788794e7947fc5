//! Cart route handlers.

use axum::extract::{Path, State};
use axum::routing::{delete, get, put};
use axum::{Json, Router};
use maplemart_core::{CartItemId, ProductId};
use serde::Deserialize;
use tracing::instrument;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::Cart;
use crate::state::AppState;

/// Create the cart routes router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(show).post(add).delete(clear))
        .route("/{item_id}", put(update_item).delete(remove_item))
}

/// Add-to-cart request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

const fn default_quantity() -> i32 {
    1
}

/// Update-quantity request body.
#[derive(Debug, Deserialize)]
pub struct UpdateCartItemRequest {
    pub quantity: i32,
}

/// Current cart; an empty cart (never an error) when none exists yet.
#[instrument(skip(state, user))]
pub async fn show(State(state): State<AppState>, RequireAuth(user): RequireAuth) -> Result<Json<Cart>> {
    let cart = state.cart_service().get(user.id).await?;
    Ok(Json(cart))
}

/// Add an item; an existing line for the same product merges quantities.
#[instrument(skip(state, user), fields(user = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<AddToCartRequest>,
) -> Result<Json<Cart>> {
    let cart = state
        .cart_service()
        .add(user.id, body.product_id, body.quantity)
        .await?;
    Ok(Json(cart))
}

/// Replace a cart line's quantity (removal is a separate operation).
#[instrument(skip(state, user), fields(user = %user.id))]
pub async fn update_item(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(item_id): Path<CartItemId>,
    Json(body): Json<UpdateCartItemRequest>,
) -> Result<Json<Cart>> {
    let cart = state
        .cart_service()
        .update_quantity(user.id, item_id, body.quantity)
        .await?;
    Ok(Json(cart))
}

/// Remove a cart line.
#[instrument(skip(state, user), fields(user = %user.id))]
pub async fn remove_item(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(item_id): Path<CartItemId>,
) -> Result<Json<Cart>> {
    let cart = state.cart_service().remove(user.id, item_id).await?;
    Ok(Json(cart))
}

/// Clear the cart, keeping the (logical) cart itself.
#[instrument(skip(state, user), fields(user = %user.id))]
pub async fn clear(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Cart>> {
    let cart = state.cart_service().clear(user.id).await?;
    Ok(Json(cart))
}
