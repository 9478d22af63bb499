//! Error type shared by the vault service and its protocol types.

use thiserror::Error;

/// Caller-facing error of the vault API.
///
/// Variants map to HTTP status codes returned to callers:
/// - [`ServiceError::BadRequest`] → 400
/// - [`ServiceError::Unauthorized`] → 401
/// - [`ServiceError::NotFound`] → 404
/// - [`ServiceError::EncryptionFailure`] → 500
/// - [`ServiceError::Unavailable`] → 503
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request was malformed or failed validation.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// No caller identity was supplied.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The resource does not exist or belongs to another owner.
    #[error("not found: {0}")]
    NotFound(String),

    /// Encryption or decryption of stored values failed.
    ///
    /// The message is fixed by the caller and never names the cause.
    #[error("encryption failure: {0}")]
    EncryptionFailure(String),

    /// The service cannot handle the request yet, e.g. no key is loaded.
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

impl ServiceError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::BadRequest(_) => 400,
            ServiceError::Unauthorized(_) => 401,
            ServiceError::NotFound(_) => 404,
            ServiceError::EncryptionFailure(_) => 500,
            ServiceError::Unavailable(_) => 503,
        }
    }

    /// Returns the machine-readable code used in the error body.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::BadRequest(_) => "bad_request",
            ServiceError::Unauthorized(_) => "unauthorized",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::EncryptionFailure(_) => "internal_error",
            ServiceError::Unavailable(_) => "service_unavailable",
        }
    }

    /// Returns the message that may be shown to the caller.
    pub fn public_message(&self) -> &str {
        match self {
            ServiceError::BadRequest(m)
            | ServiceError::Unauthorized(m)
            | ServiceError::NotFound(m)
            | ServiceError::EncryptionFailure(m)
            | ServiceError::Unavailable(m) => m,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_codes() {
        assert_eq!(ServiceError::BadRequest("x".into()).http_status(), 400);
        assert_eq!(ServiceError::Unauthorized("x".into()).http_status(), 401);
        assert_eq!(ServiceError::NotFound("x".into()).http_status(), 404);
        assert_eq!(
            ServiceError::EncryptionFailure("x".into()).http_status(),
            500
        );
        assert_eq!(ServiceError::Unavailable("x".into()).http_status(), 503);
    }

    #[test]
    fn encryption_failure_uses_generic_code() {
        let e = ServiceError::EncryptionFailure("failed to decrypt secret values".into());
        assert_eq!(e.code(), "internal_error");
    }

    #[test]
    fn display_includes_message() {
        let e = ServiceError::BadRequest("at least one value is required".into());
        assert!(e.to_string().contains("at least one value is required"));
        assert_eq!(e.public_message(), "at least one value is required");
    }
}
