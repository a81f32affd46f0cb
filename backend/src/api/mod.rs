pub mod deploy;
pub mod health;
pub mod logs;
pub mod metrics;
pub mod response;
pub mod status;

use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use crate::config::Config;
use crate::k8s::{DeploymentManager, LogCollector, ResourceClient, StatusAggregator};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub client: Arc<dyn ResourceClient>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(config: Config, client: Arc<dyn ResourceClient>) -> Self {
        Self {
            config,
            client,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub fn deployment_manager(&self) -> DeploymentManager {
        DeploymentManager::new(self.client.clone(), self.config.cluster.clone())
    }

    pub fn status_aggregator(&self) -> StatusAggregator {
        StatusAggregator::new(self.client.clone(), &self.config.cluster)
    }

    pub fn log_collector(&self) -> LogCollector {
        LogCollector::new(self.client.clone(), self.config.log_output)
    }
}
