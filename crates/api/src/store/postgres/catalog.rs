//! Product catalog and stock counter repositories.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use maplemart_core::ProductId;
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;

use crate::models::{DetailBlock, KeyBenefit, NewProduct, Product, ProductAsset, ProductPatch};
use crate::store::{CatalogStore, StockError, StockLedger, StoreError};

/// Internal row type for product queries.
#[derive(Debug, sqlx::FromRow)]
pub(super) struct ProductRow {
    id: i32,
    title: String,
    description: String,
    categories: Json<Vec<String>>,
    original_price: Decimal,
    current_price: Decimal,
    tax_rate: Decimal,
    in_stock: bool,
    visible: bool,
    stock: i32,
    main_images: Json<Vec<ProductAsset>>,
    gallery: Json<Vec<ProductAsset>>,
    key_benefits: Json<Vec<KeyBenefit>>,
    detail_blocks: Json<Vec<DetailBlock>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            title: row.title,
            description: row.description,
            categories: row.categories.0,
            original_price: row.original_price,
            current_price: row.current_price,
            tax_rate: row.tax_rate,
            in_stock: row.in_stock,
            visible: row.visible,
            stock: row.stock,
            main_images: row.main_images.0,
            gallery: row.gallery.0,
            key_benefits: row.key_benefits.0,
            detail_blocks: row.detail_blocks.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub(super) const PRODUCT_COLUMNS: &str = "id, title, description, categories, original_price, \
     current_price, tax_rate, in_stock, visible, stock, main_images, gallery, key_benefits, \
     detail_blocks, created_at, updated_at";

/// Repository for catalog entries.
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    /// Create a new catalog repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for PgCatalog {
    async fn create(&self, product: NewProduct) -> Result<Product, StoreError> {
        let sql = format!(
            "INSERT INTO products (title, description, categories, original_price, current_price, \
             tax_rate, in_stock, stock, main_images, gallery, key_benefits, detail_blocks) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING {PRODUCT_COLUMNS}"
        );
        let row: ProductRow = sqlx::query_as(&sql)
            .bind(&product.title)
            .bind(&product.description)
            .bind(Json(&product.categories))
            .bind(product.original_price)
            .bind(product.current_price)
            .bind(product.tax_rate)
            .bind(product.in_stock)
            .bind(product.stock)
            .bind(Json(&product.main_images))
            .bind(Json(&product.gallery))
            .bind(Json(&product.key_benefits))
            .bind(Json(&product.detail_blocks))
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        let row: Option<ProductRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn list(&self, only_visible: bool) -> Result<Vec<Product>, StoreError> {
        let sql = if only_visible {
            format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE visible ORDER BY id")
        } else {
            format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id")
        };
        let rows: Vec<ProductRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update(
        &self,
        id: ProductId,
        patch: ProductPatch,
    ) -> Result<Option<Product>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let select = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE");
        let Some(row) = sqlx::query_as::<_, ProductRow>(&select)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        let updated = patch.apply(row.into(), Utc::now());
        sqlx::query(
            "UPDATE products SET title = $2, description = $3, categories = $4, \
             original_price = $5, current_price = $6, tax_rate = $7, in_stock = $8, \
             main_images = $9, gallery = $10, key_benefits = $11, detail_blocks = $12, \
             updated_at = $13 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(&updated.title)
        .bind(&updated.description)
        .bind(Json(&updated.categories))
        .bind(updated.original_price)
        .bind(updated.current_price)
        .bind(updated.tax_rate)
        .bind(updated.in_stock)
        .bind(Json(&updated.main_images))
        .bind(Json(&updated.gallery))
        .bind(Json(&updated.key_benefits))
        .bind(Json(&updated.detail_blocks))
        .bind(updated.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(updated))
    }

    async fn set_visibility(
        &self,
        id: ProductId,
        visible: bool,
    ) -> Result<Option<Product>, StoreError> {
        let sql = format!(
            "UPDATE products SET visible = $2, updated_at = now() WHERE id = $1 \
             RETURNING {PRODUCT_COLUMNS}"
        );
        let row: Option<ProductRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(visible)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn delete(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let sql = format!("DELETE FROM products WHERE id = $1 RETURNING {PRODUCT_COLUMNS}");
        let row: Option<ProductRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }
}

/// Repository for stock counters.
///
/// Both mutations are single conditional statements, so the read-modify-write
/// is linearizable per product row.
pub struct PgStock {
    pool: PgPool,
}

impl PgStock {
    /// Create a new stock ledger repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StockLedger for PgStock {
    async fn reserve(&self, id: ProductId, qty: i32) -> Result<i32, StockError> {
        let reserved: Option<(i32,)> = sqlx::query_as(
            "UPDATE products SET stock = stock - $2, updated_at = now() \
             WHERE id = $1 AND stock >= $2 \
             RETURNING stock",
        )
        .bind(id)
        .bind(qty)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from)?;

        if let Some((stock,)) = reserved {
            return Ok(stock);
        }

        // The conditional update matched nothing: either the product is gone
        // or there was not enough stock.
        let available: Option<(i32,)> = sqlx::query_as("SELECT stock FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from)?;
        match available {
            Some((stock,)) => Err(StockError::Insufficient { available: stock }),
            None => Err(StockError::NotFound),
        }
    }

    async fn restore(&self, id: ProductId, qty: i32) -> Result<i32, StockError> {
        let restored: Option<(i32,)> = sqlx::query_as(
            "UPDATE products SET stock = stock + $2, updated_at = now() \
             WHERE id = $1 \
             RETURNING stock",
        )
        .bind(id)
        .bind(qty)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from)?;
        restored.map(|(stock,)| stock).ok_or(StockError::NotFound)
    }
}
