use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use tracing::{info, warn};

use crate::api::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{DeploymentOutcome, DeploymentRequest};

/// Deploy an application
///
/// POST /api/apps
///
/// A failed saga is reported as 422 with the outcome as body, so callers
/// always receive `{success, message}`.
pub async fn deploy(
    State(state): State<AppState>,
    payload: Result<Json<DeploymentRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<DeploymentOutcome>)> {
    let Json(request) = payload.map_err(|e| AppError::bad_request(&e.body_text()))?;
    request
        .validate()
        .map_err(|message| AppError::bad_request(&message))?;

    info!(app_code = %request.app_code, image = %request.image, "Deploying application");

    let outcome = state.deployment_manager().deploy(&request).await;
    if outcome.success {
        info!(app_code = %request.app_code, "Application deployed");
        Ok((StatusCode::OK, Json(outcome)))
    } else {
        warn!(app_code = %request.app_code, message = %outcome.message, "Deployment failed");
        Ok((StatusCode::UNPROCESSABLE_ENTITY, Json(outcome)))
    }
}

/// Delete an application
///
/// DELETE /api/apps/:app_code
pub async fn delete(
    State(state): State<AppState>,
    Path(app_code): Path<String>,
) -> AppResult<(StatusCode, Json<DeploymentOutcome>)> {
    if app_code.trim().is_empty() {
        return Err(AppError::bad_request("appCode is required"));
    }

    let outcome = state.deployment_manager().delete(&app_code).await;
    let status = if outcome.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };
    Ok((status, Json(outcome)))
}
