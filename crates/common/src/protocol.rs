//! Request and response types of the public HTTP API.
//!
//! Field names are camelCase on the wire. Secret values only ever appear in
//! plaintext in [`CreateSecretRequest`], [`UpdateSecretRequest`] and
//! [`DecryptedSecretResponse`]; every other shape carries field names only.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

/// Request body for `POST /api/projects`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Request body for `PATCH /api/projects/:id`. Absent fields are left as-is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A project together with summaries of the secrets it holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Distinct platforms of the project's secrets, in first-seen order.
    pub platforms: Vec<String>,
    pub secrets: Vec<SecretResponse>,
    pub secret_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Secrets
// ---------------------------------------------------------------------------

/// Request body for `POST /api/secrets`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSecretRequest {
    pub name: String,
    /// Credential kind, e.g. `"API Key"` or `"Client Secret"`.
    #[serde(rename = "type")]
    pub kind: String,
    pub platform: String,
    pub project_id: Uuid,
    /// Field name → plaintext value. Encrypted before it is stored.
    pub values: BTreeMap<String, String>,
}

/// Request body for `PATCH /api/secrets/:id`.
///
/// When `values` is present it replaces the whole stored mapping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSecretRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub values: Option<BTreeMap<String, String>>,
}

/// A secret without its values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretResponse {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub platform: String,
    pub project_id: Uuid,
    /// Names of the stored fields, sorted.
    pub fields: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Response body for `GET /api/secrets/:id`: the secret with plaintext values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecryptedSecretResponse {
    #[serde(flatten)]
    pub secret: SecretResponse,
    pub decrypted_values: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"bad_request"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Health checks
// ---------------------------------------------------------------------------

/// Response body for `GET /api/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `"healthy"` or `"unhealthy"`.
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub uptime_secs: u64,
    pub version: String,
    /// Whether an encryption key is loaded.
    pub encryption_ready: bool,
}

/// Response body for `GET /api/ready` and `GET /api/live`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
        }
    }
}
