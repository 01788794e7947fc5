//! Saved shipping address model.
//!
//! Each address belongs to exactly one user; at most one address per user
//! carries `is_default = true`. The stores enforce the invariant by demoting
//! every other address of the user in the same transaction that promotes a
//! new default.

use chrono::{DateTime, Utc};
use maplemart_core::{AddressId, UserId};
use serde::{Deserialize, Serialize};

/// A saved address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    pub phone: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields for creating or fully updating an address.
///
/// Structural presence of the name/street/city/state/zip/phone fields is the
/// boundary validator's job; this type only adds the `is_default` intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAddress {
    pub first_name: String,
    pub last_name: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    #[serde(default = "default_country")]
    pub country: String,
    pub phone: String,
    #[serde(default)]
    pub is_default: bool,
}

fn default_country() -> String {
    "India".to_owned()
}
