//! Axum request handlers for all service endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use common::protocol::{
    CreateProjectRequest, CreateSecretRequest, DecryptedSecretResponse, ErrorResponse,
    HealthResponse, ProjectResponse, SecretResponse, StatusResponse, UpdateProjectRequest,
    UpdateSecretRequest,
};
use uuid::Uuid;

use super::{error::ApiError, owner::Owner, state::AppState};
use crate::storage::ProjectWithSecrets;

type ApiResult<T> = Result<T, ApiError>;

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

/// `GET /api/projects`: the caller's projects, most recently updated first.
pub async fn list_projects(
    State(state): State<AppState>,
    Owner(owner): Owner,
) -> Json<Vec<ProjectResponse>> {
    let projects = state
        .store
        .list_projects(&owner)
        .into_iter()
        .map(ProjectWithSecrets::into_response)
        .collect();
    Json(projects)
}

/// `POST /api/projects`
pub async fn create_project(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Json(req): Json<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<ProjectResponse>)> {
    let project = state.store.create_project(req, &owner)?;
    let view = ProjectWithSecrets {
        project,
        secrets: Vec::new(),
    };
    Ok((StatusCode::CREATED, Json(view.into_response())))
}

/// `GET /api/projects/:id`
pub async fn get_project(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ProjectResponse>> {
    let view = state.store.get_project(id, &owner)?;
    Ok(Json(view.into_response()))
}

/// `PATCH /api/projects/:id`
pub async fn update_project(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateProjectRequest>,
) -> ApiResult<Json<ProjectResponse>> {
    let view = state.store.update_project(id, req, &owner)?;
    Ok(Json(view.into_response()))
}

/// `DELETE /api/projects/:id`: removes the project and all of its secrets.
pub async fn delete_project(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.store.delete_project(id, &owner)?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Secrets
// ---------------------------------------------------------------------------

/// `POST /api/secrets`: encrypt and store a new secret.
///
/// The response lists field names only; values are never echoed back.
pub async fn create_secret(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Json(req): Json<CreateSecretRequest>,
) -> ApiResult<(StatusCode, Json<SecretResponse>)> {
    let secret = state.store.create_secret(req, &owner)?;
    Ok((StatusCode::CREATED, Json(secret.to_response())))
}

/// `GET /api/secrets/:id`: the secret with decrypted values.
///
/// Any undecryptable field fails the whole request with an opaque 500.
pub async fn get_secret(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DecryptedSecretResponse>> {
    let secret = state.store.get_secret(id, &owner)?;
    Ok(Json(secret.into_response()))
}

/// `PATCH /api/secrets/:id`
pub async fn update_secret(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateSecretRequest>,
) -> ApiResult<Json<SecretResponse>> {
    let secret = state.store.update_secret(id, req, &owner)?;
    Ok(Json(secret.to_response()))
}

/// `DELETE /api/secrets/:id`
pub async fn delete_secret(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.store.delete_secret(id, &owner)?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Health checks
// ---------------------------------------------------------------------------

/// `GET /api/health`: returns `200 OK` when an encryption key is loaded,
/// `503 Service Unavailable` otherwise.
pub async fn health(State(state): State<AppState>) -> Response {
    let encryption_ready = state.store.codec().is_configured();
    let (status_code, status_str) = if encryption_ready {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    let body = HealthResponse {
        status: status_str.into(),
        timestamp: Utc::now(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        version: env!("CARGO_PKG_VERSION").into(),
        encryption_ready,
    };
    (status_code, Json(body)).into_response()
}

/// `GET /api/ready`: readiness probe.
pub async fn ready(State(state): State<AppState>) -> Response {
    if state.store.codec().is_configured() {
        (StatusCode::OK, Json(StatusResponse::new("ready"))).into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(StatusResponse::new("not ready"))).into_response()
    }
}

/// `GET /api/live`: liveness probe; always `200` while the process runs.
pub async fn live() -> Json<StatusResponse> {
    Json(StatusResponse::new("alive"))
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, routing::get, Router};
    use tower::ServiceExt;

    fn test_router(state: AppState) -> Router {
        Router::new()
            .route("/api/health", get(health))
            .route("/api/ready", get(ready))
            .route("/api/live", get(live))
            .route("/api/projects", get(list_projects))
            .with_state(state)
    }

    async fn get_status(app: Router, uri: &str) -> StatusCode {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        app.oneshot(req).await.unwrap().status()
    }

    #[tokio::test]
    async fn health_returns_503_without_key() {
        let app = test_router(AppState::default());
        assert_eq!(get_status(app, "/api/health").await, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn ready_returns_503_without_key() {
        let app = test_router(AppState::default());
        assert_eq!(get_status(app, "/api/ready").await, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn live_is_always_ok() {
        let app = test_router(AppState::default());
        assert_eq!(get_status(app, "/api/live").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn projects_require_owner_header() {
        let app = test_router(AppState::default());
        assert_eq!(get_status(app, "/api/projects").await, StatusCode::UNAUTHORIZED);
    }
}
