//! Address book route handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, put};
use axum::{Json, Router};
use maplemart_core::AddressId;
use serde::Serialize;
use tracing::instrument;

use crate::error::{ApiError, Result};
use crate::middleware::RequireAuth;
use crate::models::{Address, NewAddress};
use crate::state::AppState;

/// Create the address routes router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", put(update).delete(remove))
        .route("/{id}/default", patch(set_default))
}

/// Reject an address payload with blank required fields.
///
/// Country is optional (it has a default); everything else must be present.
fn validate_address(address: &NewAddress) -> Result<()> {
    let required = [
        ("firstName", &address.first_name),
        ("lastName", &address.last_name),
        ("street", &address.street),
        ("city", &address.city),
        ("state", &address.state),
        ("zipCode", &address.zip_code),
        ("phone", &address.phone),
    ];
    for (name, value) in required {
        if value.trim().is_empty() {
            return Err(ApiError::invalid_input(format!("{name} is required")));
        }
    }
    Ok(())
}

/// The caller's addresses, default first, then most recently created.
#[instrument(skip(state, user), fields(user = %user.id))]
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Address>>> {
    let addresses = state.address_service().list(user.id).await?;
    Ok(Json(addresses))
}

/// Save a new address; `isDefault: true` demotes the caller's other
/// addresses in the same transaction.
#[instrument(skip(state, user, body), fields(user = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<NewAddress>,
) -> Result<(StatusCode, Json<Address>)> {
    validate_address(&body)?;
    let address = state.address_service().create(user.id, body).await?;
    Ok((StatusCode::CREATED, Json(address)))
}

/// Replace an owned address's fields.
#[instrument(skip(state, user, body), fields(user = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
    Json(body): Json<NewAddress>,
) -> Result<Json<Address>> {
    validate_address(&body)?;
    let address = state.address_service().update(id, user.id, body).await?;
    Ok(Json(address))
}

/// Response for a successful delete.
#[derive(Debug, Serialize)]
struct DeletedResponse {
    message: &'static str,
}

/// Delete an owned address.
#[instrument(skip(state, user), fields(user = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
) -> Result<Json<DeletedResponse>> {
    state.address_service().delete(id, user.id).await?;
    Ok(Json(DeletedResponse {
        message: "Address removed successfully",
    }))
}

/// Promote an owned address to the caller's default.
#[instrument(skip(state, user), fields(user = %user.id))]
pub async fn set_default(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
) -> Result<Json<Address>> {
    let address = state.address_service().set_default(id, user.id).await?;
    Ok(Json(address))
}
