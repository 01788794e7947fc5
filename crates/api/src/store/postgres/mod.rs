//! `PostgreSQL` storage backend.
//!
//! One repository per durable collection, all over a shared [`PgPool`].
//! Structured sub-documents (asset lists, key benefits, detail blocks, order
//! line snapshots, shipping addresses) are stored as JSONB columns, mirroring
//! the document layout the data model describes. Compound operations run in
//! a single transaction; stock mutations are conditional single-statement
//! updates so concurrent checkouts against the same product cannot lose
//! updates.
//!
//! # Migrations
//!
//! Schema migrations live in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p maplemart-cli -- migrate
//! ```

mod address;
mod cart;
mod catalog;
mod order;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub use address::PgAddresses;
pub use cart::PgCarts;
pub use catalog::{PgCatalog, PgStock};
pub use order::PgOrders;

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
