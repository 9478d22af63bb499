//! Caller identity extractor.
//!
//! Authentication happens upstream; the fronting proxy forwards the
//! authenticated user id in the configured owner header.

use axum::{extract::FromRequestParts, http::request::Parts};
use common::ServiceError;

use super::{error::ApiError, state::AppState};

/// The id of the user making the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner(pub String);

#[axum::async_trait]
impl FromRequestParts<AppState> for Owner {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = state.owner_header_name.as_str();
        let value = parts
            .headers
            .get(header)
            .ok_or_else(|| ServiceError::Unauthorized(format!("missing {header} header")))?;
        let id = value
            .to_str()
            .map_err(|_| {
                ServiceError::Unauthorized(format!("{header} header contains non-ASCII characters"))
            })?
            .trim();
        if id.is_empty() {
            return Err(ServiceError::Unauthorized(format!("{header} header is empty")).into());
        }
        Ok(Self(id.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(req: Request<()>) -> Result<Owner, ApiError> {
        let (mut parts, _) = req.into_parts();
        Owner::from_request_parts(&mut parts, &AppState::default()).await
    }

    #[tokio::test]
    async fn reads_owner_header() {
        let req = Request::builder().header("X-Owner-Id", " user-42 ").body(()).unwrap();
        assert_eq!(extract(req).await.unwrap(), Owner("user-42".into()));
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let req = Request::builder().body(()).unwrap();
        let err = extract(req).await.unwrap_err();
        assert_eq!(err.0.http_status(), 401);
    }

    #[tokio::test]
    async fn blank_header_is_unauthorized() {
        let req = Request::builder().header("X-Owner-Id", "  ").body(()).unwrap();
        assert!(extract(req).await.is_err());
    }
}
