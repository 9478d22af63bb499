//! Axum HTTP server, routing, and middleware.
//!
//! # Responsibilities
//! - Define the Axum router with all routes and shared middleware.
//! - Resolve the caller's owner id from the configured header.
//! - Map storage and codec errors onto opaque HTTP error bodies.
//! - Inject shared application state (`AppState`) into handlers.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod owner;
pub mod router;
pub mod state;
