//! Request middleware: authenticated identity, sessions, rate limiting.

pub mod auth;
pub mod rate_limit;
pub mod session;

pub use auth::{CurrentUser, RequireAdmin, RequireAuth};
