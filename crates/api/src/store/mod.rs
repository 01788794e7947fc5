//! Storage seam for the durable collections.
//!
//! Each collection is owned by a trait so the service layer never touches a
//! concrete backend:
//!
//! - [`CatalogStore`] - products and their asset references
//! - [`StockLedger`] - per-product available-quantity counters
//! - [`CartStore`] - one cart per user, merge-on-add line items
//! - [`AddressBook`] - saved addresses with the single-default invariant
//! - [`OrderLedger`] - immutable orders and their status machine
//!
//! Two backends exist: [`postgres`] (production) and [`memory`] (development
//! and tests). Compound invariants live *inside* the backend so each can use
//! its natural atomicity: the `PostgreSQL` backend wraps checkout and
//! cancellation in one transaction with conditional decrements; the memory
//! backend runs them under a single write lock, validating every line before
//! committing any.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use maplemart_core::{AddressId, CartItemId, OrderId, OrderStatus, ProductId, UserId};
use thiserror::Error;

use crate::models::{Address, Cart, NewAddress, NewProduct, Order, OrderDraft, Product, ProductPatch};

/// Errors from the storage layer itself.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the store is corrupted or invalid.
    #[error("data corruption: {0}")]
    Corrupt(String),
}

/// Errors from stock counter mutations.
#[derive(Debug, Error)]
pub enum StockError {
    /// The product id does not resolve.
    #[error("product not found")]
    NotFound,

    /// Fewer units available than requested.
    #[error("insufficient stock: only {available} available")]
    Insufficient {
        /// Units available at the time of the attempt.
        available: i32,
    },

    /// Underlying storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors from committing a checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The order contained no line items.
    #[error("no order items")]
    EmptyOrder,

    /// A line referenced a product that does not exist.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// A line asked for more units than are available. No other line's
    /// decrement survives this error.
    #[error("not enough stock for {title}: only {available} available")]
    InsufficientStock {
        product_id: ProductId,
        title: String,
        available: i32,
    },

    /// Underlying storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors from cancelling an order.
#[derive(Debug, Error)]
pub enum CancelError {
    /// The order id does not resolve.
    #[error("order not found")]
    NotFound,

    /// The requester is neither the owner nor an admin. Raised by the
    /// service layer before the store is touched.
    #[error("not authorized to cancel this order")]
    Forbidden,

    /// The order has already left `pending`.
    #[error("order cannot be cancelled as it is already {0}")]
    InvalidTransition(OrderStatus),

    /// Underlying storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Product catalog persistence.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Persist a new product, assigning the next id from the store's atomic
    /// sequence.
    async fn create(&self, product: NewProduct) -> Result<Product, StoreError>;

    /// Fetch a product by id.
    async fn get(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// List products ordered by id, optionally restricted to visible ones.
    async fn list(&self, only_visible: bool) -> Result<Vec<Product>, StoreError>;

    /// Apply a partial update. Returns `None` if the id does not resolve.
    async fn update(&self, id: ProductId, patch: ProductPatch)
    -> Result<Option<Product>, StoreError>;

    /// Toggle the visibility flag. Returns `None` if the id does not resolve.
    async fn set_visibility(
        &self,
        id: ProductId,
        visible: bool,
    ) -> Result<Option<Product>, StoreError>;

    /// Remove a product, returning the deleted record so its asset files can
    /// be released. Returns `None` if the id does not resolve.
    async fn delete(&self, id: ProductId) -> Result<Option<Product>, StoreError>;
}

/// Per-product available-quantity counters.
///
/// Both operations are atomic read-modify-writes on the product row, so
/// concurrent reservations against the same product cannot lose updates.
#[async_trait]
pub trait StockLedger: Send + Sync {
    /// Atomically decrement availability by `qty` and return the new count.
    ///
    /// Fails with [`StockError::Insufficient`] (leaving the counter
    /// untouched) when fewer than `qty` units are available.
    async fn reserve(&self, id: ProductId, qty: i32) -> Result<i32, StockError>;

    /// Atomically increment availability by `qty` and return the new count.
    ///
    /// Callers must invoke this at most once per cancelled reservation.
    async fn restore(&self, id: ProductId, qty: i32) -> Result<i32, StockError>;
}

/// Per-user cart persistence. All operations are scoped to one user's cart.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// The user's cart; an empty cart (never an error) when none exists yet.
    async fn get(&self, user: UserId) -> Result<Cart, StoreError>;

    /// Merge `qty` units of a product into the cart: increments the existing
    /// line's quantity or appends a new line.
    async fn add(&self, user: UserId, product: ProductId, qty: i32) -> Result<Cart, StoreError>;

    /// Replace a line's quantity. Returns `None` if the item is not in this
    /// user's cart.
    async fn update_quantity(
        &self,
        user: UserId,
        item: CartItemId,
        qty: i32,
    ) -> Result<Option<Cart>, StoreError>;

    /// Remove a line. Returns `None` if the item is not in this user's cart.
    async fn remove(&self, user: UserId, item: CartItemId) -> Result<Option<Cart>, StoreError>;

    /// Remove every line, keeping the (logical) cart itself.
    async fn clear(&self, user: UserId) -> Result<Cart, StoreError>;
}

/// Saved-address persistence.
///
/// Any operation that sets a default demotes the user's other addresses in
/// the same transaction, so no window with two defaults is observable.
#[async_trait]
pub trait AddressBook: Send + Sync {
    /// The user's addresses, default first, then most recently created.
    async fn list(&self, user: UserId) -> Result<Vec<Address>, StoreError>;

    /// Fetch an address by id (any owner; callers check ownership).
    async fn get(&self, id: AddressId) -> Result<Option<Address>, StoreError>;

    /// Persist a new address for the user.
    async fn create(&self, user: UserId, address: NewAddress) -> Result<Address, StoreError>;

    /// Replace an address's fields. Returns `None` if the id does not
    /// resolve.
    async fn update(&self, id: AddressId, address: NewAddress)
    -> Result<Option<Address>, StoreError>;

    /// Promote an address to the user's default, demoting all others.
    /// Returns `None` if the id does not resolve.
    async fn set_default(&self, id: AddressId) -> Result<Option<Address>, StoreError>;

    /// Delete an address. Returns `false` if the id does not resolve.
    async fn delete(&self, id: AddressId) -> Result<bool, StoreError>;
}

/// Order persistence and its status machine.
#[async_trait]
pub trait OrderLedger: Send + Sync {
    /// Commit a checkout: reserve stock for every line as an all-or-nothing
    /// batch, persist the order as `pending`, and clear the user's cart.
    ///
    /// When any line fails its reservation, no other line's decrement is
    /// committed and the error names the offending product.
    async fn create(&self, draft: OrderDraft) -> Result<Order, CheckoutError>;

    /// Cancel a `pending` order: restore every line's stock exactly once and
    /// set the status to `cancelled`, atomically.
    async fn cancel(&self, id: OrderId) -> Result<Order, CancelError>;

    /// Fetch an order by id (any owner; callers check visibility).
    async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// The user's orders, newest first.
    async fn list_for_user(&self, user: UserId) -> Result<Vec<Order>, StoreError>;
}

/// Bundle of store handles shared through the application state.
#[derive(Clone)]
pub struct Stores {
    pub catalog: Arc<dyn CatalogStore>,
    pub stock: Arc<dyn StockLedger>,
    pub carts: Arc<dyn CartStore>,
    pub addresses: Arc<dyn AddressBook>,
    pub orders: Arc<dyn OrderLedger>,
}

impl Stores {
    /// Stores backed by `PostgreSQL`.
    #[must_use]
    pub fn postgres(pool: sqlx::PgPool) -> Self {
        Self {
            catalog: Arc::new(postgres::PgCatalog::new(pool.clone())),
            stock: Arc::new(postgres::PgStock::new(pool.clone())),
            carts: Arc::new(postgres::PgCarts::new(pool.clone())),
            addresses: Arc::new(postgres::PgAddresses::new(pool.clone())),
            orders: Arc::new(postgres::PgOrders::new(pool)),
        }
    }

    /// Stores backed by process memory (development and tests).
    #[must_use]
    pub fn memory() -> Self {
        let shared = memory::MemoryStores::new();
        Self {
            catalog: Arc::new(shared.clone()),
            stock: Arc::new(shared.clone()),
            carts: Arc::new(shared.clone()),
            addresses: Arc::new(shared.clone()),
            orders: Arc::new(shared),
        }
    }
}
