//! Structured logging and optional OpenTelemetry span export.
//!
//! # Telemetry invariants
//!
//! - **No secret values, tokens, passphrases or key material** in any span
//!   attribute or log field. Ids and field names are fine.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`); `RUST_LOG`
//!   overrides it.

pub mod init;

pub use init::init_telemetry;
