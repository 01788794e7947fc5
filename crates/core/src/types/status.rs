//! Status, role, and payment enums.

use serde::{Deserialize, Serialize};

/// Lifecycle status of an order.
///
/// Orders are created as `Pending`. The only transition the core performs is
/// `Pending -> Cancelled`; `Paid` and `Fulfilled` are written by external
/// fulfillment tooling and are terminal from the core's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Fulfilled,
    Cancelled,
}

impl OrderStatus {
    /// Whether an order in this status may still be cancelled.
    #[must_use]
    pub const fn can_cancel(self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Whether this status ends the order's lifecycle.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Paid => write!(f, "paid"),
            Self::Fulfilled => write!(f, "fulfilled"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "fulfilled" => Ok(Self::Fulfilled),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// Accepted payment methods for checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentMethod {
    CreditCard,
    Paypal,
    Upi,
}

impl PaymentMethod {
    /// Wire representation (`credit-card`, `paypal`, `upi`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreditCard => "credit-card",
            Self::Paypal => "paypal",
            Self::Upi => "upi",
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credit-card" => Ok(Self::CreditCard),
            "paypal" => Ok(Self::Paypal),
            "upi" => Ok(Self::Upi),
            _ => Err(format!("invalid payment method: {s}")),
        }
    }
}

/// Role attached to an authenticated identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Regular shopper; may only touch their own cart, orders, and addresses.
    Customer,
    /// Store staff; may manage the catalog and read any order.
    Admin,
}

impl UserRole {
    /// Whether this role grants store administration rights.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

/// Media kind of a stored catalog asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Image,
    Video,
}

impl AssetKind {
    /// Classify an uploaded file by its MIME content type.
    #[must_use]
    pub fn from_content_type(content_type: &str) -> Self {
        if content_type.starts_with("video") {
            Self::Video
        } else {
            Self::Image
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn only_pending_orders_can_cancel() {
        assert!(OrderStatus::Pending.can_cancel());
        assert!(!OrderStatus::Paid.can_cancel());
        assert!(!OrderStatus::Fulfilled.can_cancel());
        assert!(!OrderStatus::Cancelled.can_cancel());
    }

    #[test]
    fn order_status_round_trips_through_str() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Paid,
            OrderStatus::Fulfilled,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(OrderStatus::from_str(&status.to_string()), Ok(status));
        }
        assert!(OrderStatus::from_str("shipped").is_err());
    }

    #[test]
    fn payment_method_uses_kebab_case_wire_names() {
        let json = serde_json::to_string(&PaymentMethod::CreditCard).unwrap();
        assert_eq!(json, "\"credit-card\"");
        let back: PaymentMethod = serde_json::from_str("\"upi\"").unwrap();
        assert_eq!(back, PaymentMethod::Upi);
        assert_eq!(PaymentMethod::from_str("paypal"), Ok(PaymentMethod::Paypal));
    }

    #[test]
    fn asset_kind_classifies_by_mime_prefix() {
        assert_eq!(AssetKind::from_content_type("video/mp4"), AssetKind::Video);
        assert_eq!(AssetKind::from_content_type("image/png"), AssetKind::Image);
        assert_eq!(
            AssetKind::from_content_type("application/octet-stream"),
            AssetKind::Image
        );
    }

    #[test]
    fn roles_grant_admin_rights_correctly() {
        assert!(UserRole::Admin.is_admin());
        assert!(!UserRole::Customer.is_admin());
    }
}
