//! Deployment manager for application deployments
//!
//! Deploying an application is a two-step saga: create the workload, then
//! the NodePort service exposing it. If the second step fails the workload
//! is deleted again, so a failed deploy never leaves a half-exposed app.

use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use super::client::ResourceClient;
use super::resources::build_manifests;
use crate::config::ClusterDefaults;
use crate::models::{DeploymentOutcome, DeploymentRequest};

/// Progress of one deploy call
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SagaStage {
    NotStarted,
    WorkloadCreated,
    Exposed,
    RolledBack,
}

/// Deploys and tears down applications
pub struct DeploymentManager {
    client: Arc<dyn ResourceClient>,
    defaults: ClusterDefaults,
}

impl DeploymentManager {
    pub fn new(client: Arc<dyn ResourceClient>, defaults: ClusterDefaults) -> Self {
        Self { client, defaults }
    }

    /// Deploy an application: workload first, then its exposure service
    #[instrument(skip(self, request), fields(app_code = %request.app_code))]
    pub async fn deploy(&self, request: &DeploymentRequest) -> DeploymentOutcome {
        if let Err(message) = request.validate() {
            warn!(%message, "Rejected deployment request");
            return record(DeploymentOutcome::failed(message));
        }

        let manifests = build_manifests(request, &self.defaults);
        let workload = manifests.workload_name().to_string();
        let mut stage = SagaStage::NotStarted;

        match manifests.to_yaml() {
            Ok(yaml) => debug!(%stage, manifests = %yaml, "Create deployment start"),
            Err(e) => debug!(%stage, error = %e, "Create deployment start"),
        }

        if let Err(e) = self.client.create_deployment(&manifests.deployment).await {
            error!(%stage, error = %e, "Create deployment failed");
            return record(DeploymentOutcome::failed(e.to_string()));
        }
        stage = SagaStage::WorkloadCreated;
        info!(%stage, "Create deployment success");

        if let Err(e) = self.client.create_service(&manifests.service).await {
            error!(%stage, error = %e, "Create service failed, rolling back deployment");
            self.compensate(&workload).await;
            stage = SagaStage::RolledBack;
            info!(%stage, "Deploy rolled back");
            return record(DeploymentOutcome::failed(e.to_string()));
        }
        stage = SagaStage::Exposed;
        info!(%stage, "Deploy done");

        record(DeploymentOutcome::succeeded())
    }

    /// Delete the workload created by an aborted deploy. Failures are only
    /// logged: the create error already explains the outcome.
    async fn compensate(&self, workload: &str) {
        metrics::increment_counter!("shipyard_rollback_total");
        if let Err(e) = self.client.delete_deployment(workload).await {
            warn!(workload, error = %e, "Rollback delete failed");
        }
    }

    /// Tear down an application: service first, then the workload
    ///
    /// Objects that are already gone count as deleted. Both deletes are
    /// always attempted.
    #[instrument(skip(self))]
    pub async fn delete(&self, app_code: &str) -> DeploymentOutcome {
        info!("Deleting application");
        let mut errors = Vec::new();

        match self.client.delete_service(app_code).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => debug!("Service already deleted"),
            Err(e) => {
                warn!(error = %e, "Delete service failed");
                errors.push(format!("delete service: {}", e));
            }
        }

        match self.client.delete_deployment(app_code).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => debug!("Deployment already deleted"),
            Err(e) => {
                warn!(error = %e, "Delete deployment failed");
                errors.push(format!("delete deployment: {}", e));
            }
        }

        if errors.is_empty() {
            info!("Application deleted");
            DeploymentOutcome::succeeded()
        } else {
            DeploymentOutcome::failed(errors.join("; "))
        }
    }
}

fn record(outcome: DeploymentOutcome) -> DeploymentOutcome {
    let result = if outcome.success { "success" } else { "failure" };
    metrics::increment_counter!("shipyard_deploy_total", "result" => result);
    outcome
}
