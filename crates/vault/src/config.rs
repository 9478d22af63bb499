//! Configuration loading and validation for the vault service.
//!
//! All values are read from environment variables at startup. The process will
//! exit with a clear error message if any required variable is missing or invalid.

use anyhow::{Context, Result};
use axum::http::HeaderName;
use serde::Deserialize;

/// Validated vault service configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Passphrase the field encryption key is derived from.
    #[serde(default)]
    pub encryption_key: Option<String>,

    /// Fallback passphrase, used only when `ENCRYPTION_KEY` is unset or blank.
    #[serde(default)]
    pub session_secret: Option<String>,

    /// Port the HTTP server listens on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Header carrying the authenticated caller's id, set by the fronting proxy.
    #[serde(default = "default_owner_header")]
    pub owner_header_name: String,

    /// Accept tokens written by the first-generation service on decrypt.
    ///
    /// Those tokens all share one (key, nonce) pair, so anyone holding two of
    /// them can forge tokens this fallback accepts. It trades authenticity for
    /// compatibility: set `LEGACY_TOKENS=false` once stored values have been
    /// re-encrypted.
    #[serde(default = "default_legacy_tokens")]
    pub legacy_tokens: bool,

    /// OTLP collector endpoint. Spans are only exported when set.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_port() -> u16 {
    5000
}
fn default_owner_header() -> String {
    "X-Owner-Id".into()
}
fn default_legacy_tokens() -> bool {
    true
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if no passphrase is set or any value cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// The passphrase to derive the key from: `ENCRYPTION_KEY` if set and
    /// non-blank, otherwise `SESSION_SECRET`.
    pub fn passphrase(&self) -> Option<&str> {
        [&self.encryption_key, &self.session_secret]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|s| !s.trim().is_empty())
    }

    /// The OTLP endpoint, if one is configured.
    pub fn otlp_endpoint(&self) -> Option<&str> {
        self.otel_exporter_otlp_endpoint
            .as_deref()
            .filter(|s| !s.trim().is_empty())
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        if self.passphrase().is_none() {
            anyhow::bail!("ENCRYPTION_KEY or SESSION_SECRET environment variable is required");
        }
        if self.port == 0 {
            anyhow::bail!("PORT must be > 0");
        }
        HeaderName::from_bytes(self.owner_header_name.as_bytes())
            .context("OWNER_HEADER_NAME must be a valid HTTP header name")?;
        Ok(())
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("Config")
            .field("encryption_key", &redact(&self.encryption_key))
            .field("session_secret", &redact(&self.session_secret))
            .field("port", &self.port)
            .field("owner_header_name", &self.owner_header_name)
            .field("legacy_tokens", &self.legacy_tokens)
            .field("otel_exporter_otlp_endpoint", &self.otel_exporter_otlp_endpoint)
            .field("log_level", &self.log_level)
            .finish()
    }
}
