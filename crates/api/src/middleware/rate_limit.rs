//! Rate limiting middleware using governor and `tower_governor`.
//!
//! Replaces the hand-rolled per-IP request map a naive implementation would
//! keep (and periodically sweep) with governor's keyed token buckets. The
//! `SmartIpKeyExtractor` prefers standard proxy headers and falls back to the
//! peer address, so the server must be started with connect info.

use std::sync::Arc;

use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::GovernorLayer;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::SmartIpKeyExtractor;

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<SmartIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Create the rate limiter for `/api` routes: ~60 requests per minute per IP.
///
/// Configuration: 1 token replenished per second, burst of 30.
///
/// # Panics
///
/// Will not panic: `per_second(1)` and `burst_size(30)` are always accepted
/// by `GovernorConfigBuilder`.
#[must_use]
pub fn api_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(SmartIpKeyExtractor)
        .per_second(1)
        .burst_size(30)
        .finish()
        .expect("rate limiter config with per_second(1) and burst_size(30) is valid");
    GovernorLayer::new(Arc::new(config))
}
