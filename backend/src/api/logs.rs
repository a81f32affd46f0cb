use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::error::{AppError, AppResult};
use crate::models::ContainerStatusRecord;

/// Containers of the pod, as reported by the status read
#[derive(Debug, Deserialize)]
pub struct ContainerLogsRequest {
    pub containers: Vec<ContainerStatusRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerLogsResponse {
    pub pod_name: String,
    pub logs: String,
}

/// Get the logs of every container in a pod
///
/// POST /api/pods/:pod_name/logs
pub async fn container_logs(
    State(state): State<AppState>,
    Path(pod_name): Path<String>,
    payload: Result<Json<ContainerLogsRequest>, JsonRejection>,
) -> AppResult<Json<ContainerLogsResponse>> {
    let Json(request) = payload.map_err(|e| AppError::bad_request(&e.body_text()))?;

    let logs = state
        .log_collector()
        .get_container_logs(&pod_name, &request.containers)
        .await;

    Ok(Json(ContainerLogsResponse { pod_name, logs }))
}
