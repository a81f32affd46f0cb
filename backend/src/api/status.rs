use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::api::AppState;
use crate::error::AppResult;
use crate::models::{AggregatedStatus, ListFilter, StatusFilters, WorkloadSummary};

/// Label selectors for the status read, one per resource kind
#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    pub pod_selector: Option<String>,
    pub deployment_selector: Option<String>,
    pub service_selector: Option<String>,
}

impl From<StatusQuery> for StatusFilters {
    fn from(query: StatusQuery) -> Self {
        let filter = |selector: Option<String>| ListFilter {
            label_selector: selector,
            field_selector: None,
        };
        StatusFilters {
            pods: filter(query.pod_selector),
            deployments: filter(query.deployment_selector),
            services: filter(query.service_selector),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DeploymentsQuery {
    pub label_selector: Option<String>,
}

/// Get pod, deployment and service status for all applications
///
/// GET /api/status
pub async fn all_status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> AppResult<Json<AggregatedStatus>> {
    let filters = StatusFilters::from(query);
    let status = state.status_aggregator().get_all_status(&filters).await?;
    Ok(Json(status))
}

/// List deployments
///
/// GET /api/deployments
pub async fn deployments(
    State(state): State<AppState>,
    Query(query): Query<DeploymentsQuery>,
) -> AppResult<Json<Vec<WorkloadSummary>>> {
    let filter = ListFilter {
        label_selector: query.label_selector,
        field_selector: None,
    };
    let summaries = state.status_aggregator().get_deployments(&filter).await?;
    Ok(Json(summaries))
}
