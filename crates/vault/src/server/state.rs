//! Shared application state injected into every Axum handler.

use std::{sync::Arc, time::Instant};

use crate::crypto::FieldCodec;
use crate::storage::SecretStore;

/// Application state shared across all request handlers.
///
/// All fields are cheaply cloneable (`Arc`-wrapped or already `Arc`-backed) so
/// that Axum can clone the state for each request without copying expensive data.
#[derive(Clone)]
pub struct AppState {
    /// Owner-scoped project and secret storage.
    pub store: SecretStore,
    /// Name of the HTTP header carrying the caller's owner id.
    pub owner_header_name: Arc<String>,
    /// Process start, for the uptime reported by `/api/health`.
    pub started_at: Instant,
}

impl AppState {
    /// Create a new [`AppState`] with the provided store and header name.
    pub fn new(store: SecretStore, owner_header_name: String) -> Self {
        Self {
            store,
            owner_header_name: Arc::new(owner_header_name),
            started_at: Instant::now(),
        }
    }
}

impl Default for AppState {
    /// Creates a default [`AppState`] with an empty store and no key, suitable for tests.
    fn default() -> Self {
        Self::new(SecretStore::in_memory(FieldCodec::disabled()), "X-Owner-Id".into())
    }
}
