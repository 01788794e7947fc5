//! Unified error handling with Sentry integration.
//!
//! Every route handler returns `Result<T, ApiError>`. Responses carry a
//! structured JSON body `{"error": <kind>, "message": <text>}`; internal
//! failures are captured to Sentry and the client only sees a generic
//! message, never storage or IO details.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use maplemart_core::{OrderStatus, ProductId};
use serde::Serialize;
use thiserror::Error;

use crate::services::addresses::AddressError;
use crate::services::cart::CartError;
use crate::services::catalog::CatalogError;
use crate::services::checkout::OrderAccessError;
use crate::store::{CancelError, CheckoutError, StoreError};

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Entity id does not resolve.
    #[error("{0}")]
    NotFound(String),

    /// Entity exists but the caller lacks ownership or role.
    #[error("{0}")]
    Forbidden(String),

    /// No authenticated identity on the request.
    #[error("Not authorized to access this route")]
    Unauthorized,

    /// Malformed or rule-violating input not covered by a specific variant.
    #[error("{0}")]
    InvalidInput(String),

    /// A quantity below 1.
    #[error("quantity must be at least 1, got {0}")]
    InvalidQuantity(i32),

    /// Current price not strictly below original price.
    #[error("current price must be less than original price")]
    InvalidPrice,

    /// An asset group with the wrong number of files.
    #[error("expected {expected} files for {field}, got {actual}")]
    InvalidAssetCount {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A checkout with no line items.
    #[error("no order items")]
    EmptyOrder,

    /// A line asked for more units than are available.
    #[error("not enough stock for {title}: only {available} available")]
    InsufficientStock {
        product_id: ProductId,
        title: String,
        available: i32,
    },

    /// An order status transition that the state machine forbids.
    #[error("order cannot be cancelled as it is already {0}")]
    InvalidTransition(OrderStatus),

    /// Storage or IO failure; details are logged, not returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Convenience constructor for boundary validation failures.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Stable machine-readable kind for the JSON body.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Forbidden(_) => "forbidden",
            Self::Unauthorized => "unauthorized",
            Self::InvalidInput(_) => "invalid_input",
            Self::InvalidQuantity(_) => "invalid_quantity",
            Self::InvalidPrice => "invalid_price",
            Self::InvalidAssetCount { .. } => "invalid_asset_count",
            Self::EmptyOrder => "empty_order",
            Self::InsufficientStock { .. } => "insufficient_stock",
            Self::InvalidTransition(_) => "invalid_transition",
            Self::Internal(_) => "internal",
        }
    }

    const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::InvalidInput(_)
            | Self::InvalidQuantity(_)
            | Self::InvalidPrice
            | Self::InvalidAssetCount { .. }
            | Self::EmptyOrder => StatusCode::BAD_REQUEST,
            Self::InsufficientStock { .. } | Self::InvalidTransition(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error body returned to clients.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry; business errors are expected.
        if matches!(self, Self::Internal(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();
        // Don't expose internal error details to clients.
        let message = match &self {
            Self::Internal(_) => "Internal server error".to_owned(),
            _ => self.to_string(),
        };

        (
            status,
            Json(ErrorBody {
                error: self.kind(),
                message,
            }),
        )
            .into_response()
    }
}

/// Result type alias for `ApiError`.
pub type Result<T> = std::result::Result<T, ApiError>;

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<CartError> for ApiError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::InvalidProduct(_) => Self::InvalidInput(err.to_string()),
            CartError::InvalidQuantity(qty) => Self::InvalidQuantity(qty),
            CartError::ItemNotFound(_) => Self::NotFound(err.to_string()),
            CartError::Store(inner) => inner.into(),
        }
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::EmptyOrder => Self::EmptyOrder,
            CheckoutError::ProductNotFound(_) => Self::NotFound(err.to_string()),
            CheckoutError::InsufficientStock {
                product_id,
                title,
                available,
            } => Self::InsufficientStock {
                product_id,
                title,
                available,
            },
            CheckoutError::Store(inner) => inner.into(),
        }
    }
}

impl From<CancelError> for ApiError {
    fn from(err: CancelError) -> Self {
        match err {
            CancelError::NotFound => Self::NotFound(err.to_string()),
            CancelError::Forbidden => Self::Forbidden(err.to_string()),
            CancelError::InvalidTransition(status) => Self::InvalidTransition(status),
            CancelError::Store(inner) => inner.into(),
        }
    }
}

impl From<OrderAccessError> for ApiError {
    fn from(err: OrderAccessError) -> Self {
        match err {
            OrderAccessError::NotFound => Self::NotFound(err.to_string()),
            OrderAccessError::Forbidden => Self::Forbidden(err.to_string()),
            OrderAccessError::Store(inner) => inner.into(),
        }
    }
}

impl From<AddressError> for ApiError {
    fn from(err: AddressError) -> Self {
        match err {
            AddressError::NotFound => Self::NotFound(err.to_string()),
            AddressError::Forbidden => Self::Forbidden(err.to_string()),
            AddressError::Store(inner) => inner.into(),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound => Self::NotFound(err.to_string()),
            CatalogError::InvalidPrice { .. } => Self::InvalidPrice,
            CatalogError::InvalidAssetCount {
                field,
                expected,
                actual,
            } => Self::InvalidAssetCount {
                field,
                expected,
                actual,
            },
            CatalogError::Store(inner) => inner.into(),
            CatalogError::Blob(inner) => Self::Internal(inner.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_status(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn status_codes_follow_the_taxonomy() {
        assert_eq!(
            response_status(ApiError::NotFound("order not found".to_owned())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            response_status(ApiError::Forbidden("nope".to_owned())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            response_status(ApiError::Unauthorized),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            response_status(ApiError::InvalidQuantity(0)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            response_status(ApiError::EmptyOrder),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            response_status(ApiError::InsufficientStock {
                product_id: ProductId::new(1),
                title: "Kettle".to_owned(),
                available: 2,
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            response_status(ApiError::InvalidTransition(OrderStatus::Cancelled)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            response_status(ApiError::Internal("db down".to_owned())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn messages_carry_actionable_context() {
        let err = ApiError::InsufficientStock {
            product_id: ProductId::new(7),
            title: "Kettle".to_owned(),
            available: 3,
        };
        assert_eq!(
            err.to_string(),
            "not enough stock for Kettle: only 3 available"
        );

        let err = ApiError::InvalidAssetCount {
            field: "mainImages",
            expected: 4,
            actual: 3,
        };
        assert_eq!(err.to_string(), "expected 4 files for mainImages, got 3");

        let err = ApiError::InvalidTransition(OrderStatus::Cancelled);
        assert_eq!(
            err.to_string(),
            "order cannot be cancelled as it is already cancelled"
        );
    }

    #[test]
    fn internal_details_never_reach_the_client() {
        let err = ApiError::Internal("connection refused at 10.0.0.3:5432".to_owned());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        // The body is built from the generic message only.
        let err = ApiError::Internal("secret detail".to_owned());
        assert_eq!(err.kind(), "internal");
    }
}
