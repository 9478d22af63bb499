//! Axum middleware layers applied to the router.
//!
//! Includes request tracing, timeout enforcement, response compression and a
//! request body size limit.

use std::time::Duration;

/// Default per-request timeout applied to all routes.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Largest accepted request body. Secret payloads are small key-value maps.
pub const MAX_BODY_BYTES: usize = 64 * 1024;
