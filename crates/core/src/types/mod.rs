//! Core type definitions.

pub mod email;
pub mod id;
pub mod status;

pub use email::{Email, EmailError};
pub use id::{AddressId, CartItemId, OrderId, ProductId, UserId};
pub use status::{AssetKind, OrderStatus, PaymentMethod, UserRole};
