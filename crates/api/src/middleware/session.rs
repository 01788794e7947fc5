//! Session layer configuration.
//!
//! `PostgreSQL`-backed sessions in postgres mode; the in-process store in
//! memory mode. Both layers are configured identically otherwise.

use sqlx::PgPool;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "maplemart_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

fn configure<Store: SessionStore + Clone>(store: Store) -> SessionManagerLayer<Store> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Create the session layer over the `PostgreSQL` store.
///
/// The backing table is created by [`migrate_session_store`].
#[must_use]
pub fn postgres_session_layer(pool: &PgPool) -> SessionManagerLayer<PostgresStore> {
    configure(PostgresStore::new(pool.clone()))
}

/// Run the session store's own schema migration (idempotent).
///
/// # Errors
///
/// Returns an error if the migration cannot be applied.
pub async fn migrate_session_store(pool: &PgPool) -> Result<(), sqlx::Error> {
    PostgresStore::new(pool.clone()).migrate().await
}

/// Create the session layer over the in-process store (memory backend).
#[must_use]
pub fn memory_session_layer() -> SessionManagerLayer<MemoryStore> {
    configure(MemoryStore::default())
}
