//! Order ledger repository.
//!
//! Checkout and cancellation each run in a single transaction, so the stock
//! decrements and the order row become durable together; a failed line rolls
//! the whole batch back and no partial decrement is ever observable.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use maplemart_core::{OrderId, OrderStatus, PaymentMethod, UserId};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::{Order, OrderDraft, OrderLine, OrderTotals, ShippingAddress};
use crate::store::{CancelError, CheckoutError, OrderLedger, StoreError};

/// Internal row type for order queries.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    user_id: i32,
    lines: Json<Vec<OrderLine>>,
    shipping_address: Json<ShippingAddress>,
    payment_method: String,
    items_price: Decimal,
    tax_price: Decimal,
    shipping_price: Decimal,
    total_price: Decimal,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = OrderStatus::from_str(&row.status)
            .map_err(|e| StoreError::Corrupt(format!("order {}: {e}", row.id)))?;
        let payment_method = PaymentMethod::from_str(&row.payment_method)
            .map_err(|e| StoreError::Corrupt(format!("order {}: {e}", row.id)))?;
        Ok(Self {
            id: OrderId::new(row.id),
            user_id: UserId::new(row.user_id),
            lines: row.lines.0,
            shipping_address: row.shipping_address.0,
            payment_method,
            totals: OrderTotals {
                items_price: row.items_price,
                tax_price: row.tax_price,
                shipping_price: row.shipping_price,
                total_price: row.total_price,
            },
            status,
            created_at: row.created_at,
        })
    }
}

const ORDER_COLUMNS: &str = "id, user_id, lines, shipping_address, payment_method, items_price, \
     tax_price, shipping_price, total_price, status, created_at";

/// Reserve stock for every draft line inside `tx`, failing without side
/// effects (the transaction rolls back) when any line cannot be satisfied.
async fn reserve_lines(
    tx: &mut Transaction<'_, Postgres>,
    lines: &[OrderLine],
) -> Result<(), CheckoutError> {
    for line in lines {
        let reserved: Option<(i32,)> = sqlx::query_as(
            "UPDATE products SET stock = stock - $2, updated_at = now() \
             WHERE id = $1 AND stock >= $2 \
             RETURNING stock",
        )
        .bind(line.product_id)
        .bind(line.quantity)
        .fetch_optional(&mut **tx)
        .await
        .map_err(StoreError::from)?;

        if reserved.is_some() {
            continue;
        }

        let product: Option<(String, i32)> =
            sqlx::query_as("SELECT title, stock FROM products WHERE id = $1")
                .bind(line.product_id)
                .fetch_optional(&mut **tx)
                .await
                .map_err(StoreError::from)?;
        return Err(match product {
            Some((title, available)) => CheckoutError::InsufficientStock {
                product_id: line.product_id,
                title,
                available,
            },
            None => CheckoutError::ProductNotFound(line.product_id),
        });
    }
    Ok(())
}

/// Repository for placed orders.
pub struct PgOrders {
    pool: PgPool,
}

impl PgOrders {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderLedger for PgOrders {
    async fn create(&self, draft: OrderDraft) -> Result<Order, CheckoutError> {
        if draft.lines.is_empty() {
            return Err(CheckoutError::EmptyOrder);
        }

        let mut tx = self.pool.begin().await.map_err(StoreError::from)?;

        reserve_lines(&mut tx, &draft.lines).await?;

        let sql = format!(
            "INSERT INTO orders (user_id, lines, shipping_address, payment_method, items_price, \
             tax_price, shipping_price, total_price, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending') \
             RETURNING {ORDER_COLUMNS}"
        );
        let row: OrderRow = sqlx::query_as(&sql)
            .bind(draft.user_id)
            .bind(Json(&draft.lines))
            .bind(Json(&draft.shipping_address))
            .bind(draft.payment_method.as_str())
            .bind(draft.totals.items_price)
            .bind(draft.totals.tax_price)
            .bind(draft.totals.shipping_price)
            .bind(draft.totals.total_price)
            .fetch_one(&mut *tx)
            .await
            .map_err(StoreError::from)?;

        // Clearing the cart rides in the same transaction; a crash can at
        // worst leave a stale cart, never a half-reserved order.
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(draft.user_id)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::from)?;

        tx.commit().await.map_err(StoreError::from)?;
        Ok(row.try_into()?)
    }

    async fn cancel(&self, id: OrderId) -> Result<Order, CancelError> {
        let mut tx = self.pool.begin().await.map_err(StoreError::from)?;

        // The conditional transition guarantees the restore below runs at
        // most once per order, no matter how many cancels race.
        let sql = format!(
            "UPDATE orders SET status = 'cancelled' WHERE id = $1 AND status = 'pending' \
             RETURNING {ORDER_COLUMNS}"
        );
        let row: Option<OrderRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(StoreError::from)?;

        let Some(row) = row else {
            let status: Option<(String,)> =
                sqlx::query_as("SELECT status FROM orders WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(StoreError::from)?;
            return Err(match status {
                Some((status,)) => {
                    let status = OrderStatus::from_str(&status)
                        .map_err(|e| StoreError::Corrupt(format!("order {id}: {e}")))?;
                    CancelError::InvalidTransition(status)
                }
                None => CancelError::NotFound,
            });
        };

        let order: Order = row.try_into()?;
        for line in &order.lines {
            // A product deleted since the order was placed has no counter
            // left to restore.
            sqlx::query("UPDATE products SET stock = stock + $2, updated_at = now() WHERE id = $1")
                .bind(line.product_id)
                .bind(line.quantity)
                .execute(&mut *tx)
                .await
                .map_err(StoreError::from)?;
        }

        tx.commit().await.map_err(StoreError::from)?;
        Ok(order)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let row: Option<OrderRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn list_for_user(&self, user: UserId) -> Result<Vec<Order>, StoreError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        let rows: Vec<OrderRow> = sqlx::query_as(&sql).bind(user).fetch_all(&self.pool).await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }
}
