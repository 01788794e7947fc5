//! Catalog route handlers.
//!
//! Create and update are multipart requests carrying both the structured
//! payload (text fields, some of them JSON) and the uploaded asset files.
//! Files are staged as they arrive; the catalog service links all of them or
//! discards all of them.

use std::collections::HashMap;
use std::str::FromStr;

use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use maplemart_core::ProductId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{ApiError, Result};
use crate::middleware::RequireAdmin;
use crate::models::Product;
use crate::services::assets::{AssetField, AssetStaging, DetailBlockInput, KeyBenefitInput};
use crate::services::catalog::{ProductForm, ProductUpdateForm};
use crate::state::AppState;
use crate::store::StockError;

/// Upload ceiling per request (matches the asset caps: 4+10+4+10 files).
const MAX_UPLOAD_BYTES: usize = 40 * 1024 * 1024;

/// Create the product routes router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_all).post(create))
        .route("/visible", get(list_visible))
        .route("/{id}", get(show).put(update).delete(remove))
        .route("/{id}/hide", patch(hide))
        .route("/{id}/unhide", patch(unhide))
        .route("/{id}/stock", post(adjust_stock))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

// =============================================================================
// Multipart Parsing
// =============================================================================

/// Drain a multipart stream: files go into the staging set, text fields into
/// a map. The caller discards the staging set if this (or anything after it)
/// fails.
async fn read_multipart(
    multipart: &mut Multipart,
    staging: &mut AssetStaging,
) -> Result<HashMap<String, String>> {
    let mut fields = HashMap::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::invalid_input(format!("invalid multipart payload: {e}")))?
    {
        let Some(name) = field.name().map(ToOwned::to_owned) else {
            continue;
        };

        if let Some(asset_field) = AssetField::from_multipart(&name) {
            let file_name = field.file_name().unwrap_or("upload").to_owned();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_owned();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::invalid_input(format!("failed to read {name}: {e}")))?
                .to_vec();
            staging
                .stage(asset_field, &file_name, &content_type, bytes)
                .await?;
        } else if field.file_name().is_some() {
            return Err(ApiError::invalid_input(format!(
                "Unexpected file field: {name}"
            )));
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| ApiError::invalid_input(format!("failed to read {name}: {e}")))?;
            fields.insert(name, value);
        }
    }
    Ok(fields)
}

fn required_text(fields: &HashMap<String, String>, name: &str) -> Result<String> {
    fields
        .get(name)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| ApiError::invalid_input(format!("{name} is required")))
}

fn parse_decimal(raw: &str, name: &str) -> Result<Decimal> {
    Decimal::from_str(raw.trim())
        .map_err(|_| ApiError::invalid_input(format!("{name} must be a decimal number")))
}

fn optional_decimal(fields: &HashMap<String, String>, name: &str) -> Result<Option<Decimal>> {
    fields
        .get(name)
        .filter(|s| !s.trim().is_empty())
        .map(|raw| parse_decimal(raw, name))
        .transpose()
}

fn parse_categories(raw: &str) -> Vec<String> {
    // Either a JSON array or a comma-separated list.
    serde_json::from_str::<Vec<String>>(raw).unwrap_or_else(|_| {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect()
    })
}

fn parse_benefits(raw: &str) -> Result<Vec<KeyBenefitInput>> {
    serde_json::from_str(raw).map_err(|_| ApiError::invalid_input("Invalid key benefits format"))
}

fn parse_details(raw: &str) -> Result<Vec<DetailBlockInput>> {
    serde_json::from_str(raw)
        .map_err(|_| ApiError::invalid_input("Invalid product details format"))
}

fn parse_create_form(fields: &HashMap<String, String>) -> Result<ProductForm> {
    let title = required_text(fields, "title")?;
    let original_price = parse_decimal(&required_text(fields, "originalPrice")?, "originalPrice")?;
    let current_price = parse_decimal(&required_text(fields, "currentPrice")?, "currentPrice")?;
    let tax_rate = optional_decimal(fields, "taxRate")?.unwrap_or(Decimal::ZERO);

    let stock = match fields.get("countInStock").map(|s| s.trim()) {
        Some(raw) if !raw.is_empty() => raw
            .parse::<i32>()
            .map_err(|_| ApiError::invalid_input("countInStock must be an integer"))?,
        _ => 0,
    };

    Ok(ProductForm {
        title,
        description: fields.get("description").cloned().unwrap_or_default(),
        categories: fields
            .get("categories")
            .map(|raw| parse_categories(raw))
            .unwrap_or_default(),
        original_price,
        current_price,
        tax_rate,
        in_stock: fields.get("inStock").is_none_or(|raw| raw == "true"),
        stock,
        key_benefits: parse_benefits(fields.get("keyBenefits").map_or("[]", String::as_str))?,
        detail_blocks: parse_details(fields.get("productDetails").map_or("[]", String::as_str))?,
    })
}

fn parse_update_form(fields: &HashMap<String, String>) -> Result<ProductUpdateForm> {
    Ok(ProductUpdateForm {
        title: fields.get("title").filter(|s| !s.is_empty()).cloned(),
        description: fields.get("description").cloned(),
        categories: fields.get("categories").map(|raw| parse_categories(raw)),
        original_price: optional_decimal(fields, "originalPrice")?,
        current_price: optional_decimal(fields, "currentPrice")?,
        tax_rate: optional_decimal(fields, "taxRate")?,
        in_stock: fields.get("inStock").map(|raw| raw == "true"),
        key_benefits: fields
            .get("keyBenefits")
            .map(|raw| parse_benefits(raw))
            .transpose()?,
        detail_blocks: fields
            .get("productDetails")
            .map(|raw| parse_details(raw))
            .transpose()?,
    })
}

// =============================================================================
// Handlers
// =============================================================================

/// Create a product from a multipart payload (admin).
#[instrument(skip_all, fields(admin = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Product>)> {
    let mut staging = AssetStaging::new(state.blobs());

    // Any boundary failure discards everything staged so far.
    let form = match read_multipart(&mut multipart, &mut staging).await {
        Ok(fields) => match parse_create_form(&fields) {
            Ok(form) => form,
            Err(e) => {
                staging.discard().await;
                return Err(e);
            }
        },
        Err(e) => {
            staging.discard().await;
            return Err(e);
        }
    };

    let product = state.catalog_service().create(form, staging).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Update a product from a multipart payload (admin).
#[instrument(skip_all, fields(admin = %admin.id, product = %id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    mut multipart: Multipart,
) -> Result<Json<Product>> {
    let mut staging = AssetStaging::new(state.blobs());

    let form = match read_multipart(&mut multipart, &mut staging).await {
        Ok(fields) => match parse_update_form(&fields) {
            Ok(form) => form,
            Err(e) => {
                staging.discard().await;
                return Err(e);
            }
        },
        Err(e) => {
            staging.discard().await;
            return Err(e);
        }
    };

    let product = state.catalog_service().update(id, form, staging).await?;
    Ok(Json(product))
}

/// All products, including hidden ones (admin).
#[instrument(skip_all)]
pub async fn list_all(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<Product>>> {
    let products = state.catalog_service().list(false).await?;
    Ok(Json(products))
}

/// Visible products (public storefront listing).
#[instrument(skip_all)]
pub async fn list_visible(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    let products = state.catalog_service().list(true).await?;
    Ok(Json(products))
}

/// Product detail (public).
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    let product = state.catalog_service().get(id).await?;
    Ok(Json(product))
}

/// Response for a successful delete.
#[derive(Debug, Serialize)]
struct DeletedResponse {
    message: &'static str,
}

/// Delete a product and release its asset files (admin).
#[instrument(skip_all, fields(admin = %admin.id, product = %id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<Json<DeletedResponse>> {
    state.catalog_service().delete(id).await?;
    Ok(Json(DeletedResponse {
        message: "Product deleted successfully",
    }))
}

/// Hide a product from the storefront (admin).
#[instrument(skip_all, fields(admin = %admin.id, product = %id))]
pub async fn hide(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    let product = state.catalog_service().set_visibility(id, false).await?;
    Ok(Json(product))
}

/// Unhide a product (admin).
#[instrument(skip_all, fields(admin = %admin.id, product = %id))]
pub async fn unhide(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    let product = state.catalog_service().set_visibility(id, true).await?;
    Ok(Json(product))
}

/// Stock adjustment request body.
#[derive(Debug, Deserialize)]
pub struct StockAdjustRequest {
    /// Signed change: positive restocks, negative reserves.
    pub delta: i32,
}

/// Stock adjustment response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockResponse {
    pub product_id: ProductId,
    pub count_in_stock: i32,
}

/// Adjust a product's available quantity by a signed delta (admin).
#[instrument(skip_all, fields(admin = %admin.id, product = %id))]
pub async fn adjust_stock(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    Json(body): Json<StockAdjustRequest>,
) -> Result<Json<StockResponse>> {
    if body.delta == 0 {
        return Err(ApiError::invalid_input("delta must be non-zero"));
    }

    let service = state.catalog_service();
    // Resolve first so conflict errors can name the product.
    let product = service.get(id).await?;
    let stock = service
        .adjust_stock(id, body.delta)
        .await
        .map_err(|e| match e {
            StockError::NotFound => ApiError::NotFound("product not found".to_owned()),
            StockError::Insufficient { available } => ApiError::InsufficientStock {
                product_id: id,
                title: product.title.clone(),
                available,
            },
            StockError::Store(inner) => inner.into(),
        })?;

    Ok(Json(StockResponse {
        product_id: id,
        count_in_stock: stock,
    }))
}
