//! Catalog administration service.
//!
//! Owns the multi-asset upload transaction: a create or update either links
//! every staged file into the product record, or discards every staged file
//! and surfaces the validation error. Deleting a product releases all of its
//! referenced files best-effort.

use std::sync::Arc;

use maplemart_core::ProductId;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::warn;

use super::assets::{AssetStaging, DetailBlockInput, KeyBenefitInput, link_new, link_update};
use super::blobs::{BlobError, BlobStore};
use crate::models::{NewProduct, Product, ProductPatch};
use crate::store::{CatalogStore, StockError, StockLedger, StoreError};

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The product id does not resolve.
    #[error("product not found")]
    NotFound,

    /// The current price is not strictly below the original price.
    #[error("current price must be less than original price")]
    InvalidPrice { original: Decimal, current: Decimal },

    /// An asset group has the wrong number of files.
    #[error("expected {expected} files for {field}, got {actual}")]
    InvalidAssetCount {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Underlying storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Blob storage failure while staging.
    #[error(transparent)]
    Blob(#[from] BlobError),
}

/// Structured payload of a catalog create request.
#[derive(Debug, Clone)]
pub struct ProductForm {
    pub title: String,
    pub description: String,
    pub categories: Vec<String>,
    pub original_price: Decimal,
    pub current_price: Decimal,
    pub tax_rate: Decimal,
    pub in_stock: bool,
    pub stock: i32,
    pub key_benefits: Vec<KeyBenefitInput>,
    pub detail_blocks: Vec<DetailBlockInput>,
}

/// Structured payload of a catalog update request; `None` keeps the stored
/// value.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdateForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub categories: Option<Vec<String>>,
    pub original_price: Option<Decimal>,
    pub current_price: Option<Decimal>,
    pub tax_rate: Option<Decimal>,
    pub in_stock: Option<bool>,
    pub key_benefits: Option<Vec<KeyBenefitInput>>,
    pub detail_blocks: Option<Vec<DetailBlockInput>>,
}

/// Service for catalog administration.
pub struct CatalogService {
    catalog: Arc<dyn CatalogStore>,
    stock: Arc<dyn StockLedger>,
    blobs: Arc<dyn BlobStore>,
}

impl CatalogService {
    /// Create the service over its collaborators.
    #[must_use]
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        stock: Arc<dyn StockLedger>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            catalog,
            stock,
            blobs,
        }
    }

    /// List products, optionally restricted to visible ones.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn list(&self, only_visible: bool) -> Result<Vec<Product>, CatalogError> {
        Ok(self.catalog.list(only_visible).await?)
    }

    /// Fetch one product.
    ///
    /// # Errors
    ///
    /// `NotFound` if the id does not resolve.
    pub async fn get(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.catalog.get(id).await?.ok_or(CatalogError::NotFound)
    }

    /// Create a product from a validated payload and its staged uploads.
    ///
    /// Every staged file is linked on success; on any failure every staged
    /// file is discarded before the error is returned.
    ///
    /// # Errors
    ///
    /// `InvalidAssetCount` / `InvalidPrice` from validation, or a storage
    /// failure.
    pub async fn create(
        &self,
        form: ProductForm,
        staging: AssetStaging,
    ) -> Result<Product, CatalogError> {
        let linked = match link_new(
            form.original_price,
            form.current_price,
            &form.key_benefits,
            &form.detail_blocks,
            &staging,
        ) {
            Ok(linked) => linked,
            Err(e) => {
                staging.discard().await;
                return Err(e);
            }
        };

        let product = NewProduct {
            title: form.title,
            description: form.description,
            categories: form.categories,
            original_price: form.original_price,
            current_price: form.current_price,
            tax_rate: form.tax_rate,
            in_stock: form.in_stock,
            stock: form.stock,
            main_images: linked.main_images,
            gallery: linked.gallery,
            key_benefits: linked.key_benefits,
            detail_blocks: linked.detail_blocks,
        };

        match self.catalog.create(product).await {
            Ok(created) => Ok(created),
            Err(e) => {
                // Staged files are never linked to a failed commit.
                staging.discard().await;
                Err(e.into())
            }
        }
    }

    /// Update a product, replacing asset fields that were re-uploaded.
    ///
    /// Previously linked files of a replaced field are deleted only after
    /// the new set has validated and persisted.
    ///
    /// # Errors
    ///
    /// `NotFound`, `InvalidPrice`, `InvalidAssetCount`, or a storage failure.
    pub async fn update(
        &self,
        id: ProductId,
        form: ProductUpdateForm,
        staging: AssetStaging,
    ) -> Result<Product, CatalogError> {
        let existing = match self.catalog.get(id).await {
            Ok(Some(existing)) => existing,
            Ok(None) => {
                staging.discard().await;
                return Err(CatalogError::NotFound);
            }
            Err(e) => {
                staging.discard().await;
                return Err(e.into());
            }
        };

        let original = form.original_price.unwrap_or(existing.original_price);
        let current = form.current_price.unwrap_or(existing.current_price);
        if current >= original {
            staging.discard().await;
            return Err(CatalogError::InvalidPrice { original, current });
        }

        let plan = match link_update(
            &existing,
            form.key_benefits.as_deref(),
            form.detail_blocks.as_deref(),
            &staging,
        ) {
            Ok(plan) => plan,
            Err(e) => {
                staging.discard().await;
                return Err(e);
            }
        };

        let patch = ProductPatch {
            title: form.title,
            description: form.description,
            categories: form.categories,
            original_price: form.original_price,
            current_price: form.current_price,
            tax_rate: form.tax_rate,
            in_stock: form.in_stock,
            main_images: plan.main_images,
            gallery: plan.gallery,
            key_benefits: plan.key_benefits,
            detail_blocks: plan.detail_blocks,
        };
        let replaced_files = plan.replaced_files;

        match self.catalog.update(id, patch).await {
            Ok(Some(updated)) => {
                // The new set is live; release the files it displaced.
                self.release_files(&replaced_files).await;
                Ok(updated)
            }
            Ok(None) => {
                staging.discard().await;
                Err(CatalogError::NotFound)
            }
            Err(e) => {
                staging.discard().await;
                Err(e.into())
            }
        }
    }

    /// Delete a product and release every file it referenced.
    ///
    /// # Errors
    ///
    /// `NotFound` if the id does not resolve.
    pub async fn delete(&self, id: ProductId) -> Result<Product, CatalogError> {
        let deleted = self
            .catalog
            .delete(id)
            .await?
            .ok_or(CatalogError::NotFound)?;
        self.release_files(&deleted.asset_files()).await;
        Ok(deleted)
    }

    /// Toggle a product's visibility flag.
    ///
    /// # Errors
    ///
    /// `NotFound` if the id does not resolve.
    pub async fn set_visibility(
        &self,
        id: ProductId,
        visible: bool,
    ) -> Result<Product, CatalogError> {
        self.catalog
            .set_visibility(id, visible)
            .await?
            .ok_or(CatalogError::NotFound)
    }

    /// Adjust a product's available quantity by a signed delta, returning the
    /// new count. Negative deltas reserve; positive deltas restore.
    ///
    /// # Errors
    ///
    /// `StockError::Insufficient` when a negative delta exceeds availability.
    pub async fn adjust_stock(&self, id: ProductId, delta: i32) -> Result<i32, StockError> {
        if delta < 0 {
            self.stock.reserve(id, -delta).await
        } else {
            self.stock.restore(id, delta).await
        }
    }

    /// Best-effort deletion of no-longer-referenced files.
    async fn release_files(&self, files: &[String]) {
        for file in files {
            if let Err(e) = self.blobs.delete(file).await {
                warn!(blob = %file, error = %e, "failed to delete released asset");
            }
        }
    }
}
