//! Conversion of service errors into HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::{protocol::ErrorResponse, ServiceError};
use tracing::error;

use crate::crypto::CodecError;
use crate::storage::StorageError;

/// Handler error: a [`ServiceError`] rendered as `{ code, message }`.
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorResponse::new(self.0.code(), self.0.public_message());
        (status, Json(body)).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        Self(e)
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        let service = match e {
            StorageError::ProjectNotFound => ServiceError::NotFound("project not found".into()),
            StorageError::SecretNotFound => ServiceError::NotFound("secret not found".into()),
            StorageError::Validation(msg) => ServiceError::BadRequest(msg),
            StorageError::Codec(CodecError::Configuration) => {
                error!("request needs encryption but no passphrase is configured");
                ServiceError::Unavailable("encryption is not configured".into())
            }
            StorageError::Codec(CodecError::Encryption) => {
                ServiceError::EncryptionFailure("failed to encrypt secret values".into())
            }
            StorageError::Codec(CodecError::Decryption) => {
                ServiceError::EncryptionFailure("failed to decrypt secret values".into())
            }
        };
        Self(service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decryption_failure_is_an_opaque_500() {
        let resp = ApiError::from(StorageError::Codec(CodecError::Decryption)).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn not_found_and_validation_statuses() {
        assert_eq!(
            ApiError::from(StorageError::SecretNotFound).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(StorageError::Validation("x".into()))
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn missing_key_is_unavailable() {
        let resp = ApiError::from(StorageError::Codec(CodecError::Configuration)).into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
