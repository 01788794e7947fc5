//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                        - Liveness check
//! GET    /health/ready                  - Readiness check (storage ping)
//! GET    /uploads/{file}                - Static catalog assets (ServeDir)
//!
//! # Products
//! GET    /api/products                  - All products incl. hidden (admin)
//! POST   /api/products                  - Create product (admin, multipart)
//! GET    /api/products/visible          - Visible products (public)
//! GET    /api/products/{id}             - Product detail (public)
//! PUT    /api/products/{id}             - Update product (admin, multipart)
//! DELETE /api/products/{id}             - Delete product + assets (admin)
//! PATCH  /api/products/{id}/hide        - Hide product (admin)
//! PATCH  /api/products/{id}/unhide      - Unhide product (admin)
//! POST   /api/products/{id}/stock       - Adjust stock by delta (admin)
//!
//! # Cart (authenticated)
//! GET    /api/cart                      - Current cart (empty if none)
//! POST   /api/cart                      - Add item (merge-on-add)
//! PUT    /api/cart/{itemId}             - Update line quantity
//! DELETE /api/cart/{itemId}             - Remove line
//! DELETE /api/cart                      - Clear cart
//!
//! # Checkout (authenticated)
//! POST   /api/checkout                  - Place order
//! GET    /api/checkout                  - Own orders, newest first
//! GET    /api/checkout/{id}             - Order detail (owner or admin)
//! PATCH  /api/checkout/{id}             - Cancel pending order
//!
//! # Addresses (authenticated)
//! GET    /api/addresses                 - Own addresses, default first
//! POST   /api/addresses                 - Add address
//! PUT    /api/addresses/{id}            - Update address
//! DELETE /api/addresses/{id}            - Delete address
//! PATCH  /api/addresses/{id}/default    - Set default address
//! ```

pub mod addresses;
pub mod cart;
pub mod orders;
pub mod products;

use axum::Router;

use crate::state::AppState;

/// Create all `/api` routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/products", products::routes())
        .nest("/api/cart", cart::routes())
        .nest("/api/checkout", orders::routes())
        .nest("/api/addresses", addresses::routes())
}
