//! Business services sitting between the HTTP handlers and the stores.
//!
//! Each service owns one of the consistency cores: cart line aggregation,
//! stock-aware checkout and cancellation, the single-default address
//! invariant, and the accept-all-or-discard-all catalog asset transaction.

pub mod addresses;
pub mod assets;
pub mod blobs;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod notify;
