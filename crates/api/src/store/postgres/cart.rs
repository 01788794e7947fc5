//! Cart repository.

use async_trait::async_trait;
use maplemart_core::{CartItemId, ProductId, UserId};
use sqlx::{PgExecutor, PgPool};

use crate::models::{Cart, CartItem};
use crate::store::{CartStore, StoreError};

/// Internal row type for cart line queries.
#[derive(Debug, sqlx::FromRow)]
struct CartItemRow {
    id: i32,
    product_id: i32,
    quantity: i32,
}

impl From<CartItemRow> for CartItem {
    fn from(row: CartItemRow) -> Self {
        Self {
            id: CartItemId::new(row.id),
            product_id: ProductId::new(row.product_id),
            quantity: row.quantity,
        }
    }
}

/// Fetch a user's full cart, oldest line first.
async fn fetch_cart<'e, E: PgExecutor<'e>>(executor: E, user: UserId) -> Result<Cart, StoreError> {
    let rows: Vec<CartItemRow> = sqlx::query_as(
        "SELECT id, product_id, quantity FROM cart_items WHERE user_id = $1 ORDER BY id",
    )
    .bind(user)
    .fetch_all(executor)
    .await?;
    Ok(Cart {
        user_id: user,
        items: rows.into_iter().map(Into::into).collect(),
    })
}

/// Repository for per-user carts.
pub struct PgCarts {
    pool: PgPool,
}

impl PgCarts {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CartStore for PgCarts {
    async fn get(&self, user: UserId) -> Result<Cart, StoreError> {
        fetch_cart(&self.pool, user).await
    }

    async fn add(&self, user: UserId, product: ProductId, qty: i32) -> Result<Cart, StoreError> {
        // Merge-on-add: the (user_id, product_id) unique constraint turns a
        // repeated add into a quantity increment.
        sqlx::query(
            "INSERT INTO cart_items (user_id, product_id, quantity) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id, product_id) \
             DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity",
        )
        .bind(user)
        .bind(product)
        .bind(qty)
        .execute(&self.pool)
        .await?;
        fetch_cart(&self.pool, user).await
    }

    async fn update_quantity(
        &self,
        user: UserId,
        item: CartItemId,
        qty: i32,
    ) -> Result<Option<Cart>, StoreError> {
        let result = sqlx::query(
            "UPDATE cart_items SET quantity = $3 WHERE id = $1 AND user_id = $2",
        )
        .bind(item)
        .bind(user)
        .bind(qty)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(fetch_cart(&self.pool, user).await?))
    }

    async fn remove(&self, user: UserId, item: CartItemId) -> Result<Option<Cart>, StoreError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
            .bind(item)
            .bind(user)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(fetch_cart(&self.pool, user).await?))
    }

    async fn clear(&self, user: UserId) -> Result<Cart, StoreError> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user)
            .execute(&self.pool)
            .await?;
        Ok(Cart::empty(user))
    }
}
