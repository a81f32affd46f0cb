//! Cluster API boundary
//!
//! [`ResourceClient`] is the set of remote operations the deploy saga, the
//! status aggregator and the log collector need. [`K8sClient`] implements it
//! on top of `kube::Client`; tests substitute their own implementations.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Pod, Service};
use kube::{
    api::{Api, DeleteParams, ListParams, LogParams, PostParams},
    Client, Config,
};
use tracing::{debug, info, instrument};

use super::error::ClusterError;
use crate::config::LogLimits;
use crate::models::ListFilter;

pub type ClusterResult<T> = Result<T, ClusterError>;

/// Per-kind remote operations against the orchestration API
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResourceClient: Send + Sync {
    async fn create_deployment(&self, deployment: &Deployment) -> ClusterResult<()>;

    async fn delete_deployment(&self, name: &str) -> ClusterResult<()>;

    async fn list_deployments(&self, filter: &ListFilter) -> ClusterResult<Vec<Deployment>>;

    async fn create_service(&self, service: &Service) -> ClusterResult<()>;

    async fn delete_service(&self, name: &str) -> ClusterResult<()>;

    async fn list_services(&self, filter: &ListFilter) -> ClusterResult<Vec<Service>>;

    async fn list_pods(&self, filter: &ListFilter) -> ClusterResult<Vec<Pod>>;

    /// Raw log text of one container, bounded by `limits`
    async fn pod_logs(
        &self,
        pod_name: &str,
        container_name: &str,
        limits: &LogLimits,
    ) -> ClusterResult<String>;
}

/// Wrapper around kube::Client scoped to one namespace
#[derive(Clone)]
pub struct K8sClient {
    client: Client,
    namespace: String,
}

impl K8sClient {
    /// Create a new K8sClient using the default kubeconfig or in-cluster config
    #[instrument(skip_all, fields(namespace = %namespace))]
    pub async fn new(namespace: &str) -> anyhow::Result<Self> {
        let config = Config::infer().await?;
        let client = Client::try_from(config)?;

        info!("Connected to Kubernetes cluster");

        Ok(Self {
            client,
            namespace: namespace.to_string(),
        })
    }

    fn deployments(&self) -> Api<Deployment> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    fn services(&self) -> Api<Service> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    fn pods(&self) -> Api<Pod> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    /// Check if cluster is reachable
    pub async fn health_check(&self) -> ClusterResult<String> {
        let version = self.client.apiserver_version().await?;
        debug!(version = %version.git_version, "Kubernetes cluster is healthy");
        Ok(version.git_version)
    }
}

/// Translate a [`ListFilter`] into kube list parameters
pub fn list_params(filter: &ListFilter) -> ListParams {
    let mut params = ListParams::default();
    if let Some(labels) = filter.label_selector.as_deref().filter(|s| !s.is_empty()) {
        params = params.labels(labels);
    }
    if let Some(fields) = filter.field_selector.as_deref().filter(|s| !s.is_empty()) {
        params = params.fields(fields);
    }
    params
}

/// Translate [`LogLimits`] into kube log parameters for one container
pub fn log_params(container_name: &str, limits: &LogLimits) -> LogParams {
    LogParams {
        container: Some(container_name.to_string()),
        since_seconds: Some(limits.since_seconds),
        tail_lines: Some(limits.tail_lines),
        ..Default::default()
    }
}

#[async_trait]
impl ResourceClient for K8sClient {
    #[instrument(skip(self, deployment), fields(name = %deployment.metadata.name.as_deref().unwrap_or("unknown")))]
    async fn create_deployment(&self, deployment: &Deployment) -> ClusterResult<()> {
        self.deployments()
            .create(&PostParams::default(), deployment)
            .await?;
        info!("Created deployment");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_deployment(&self, name: &str) -> ClusterResult<()> {
        self.deployments()
            .delete(name, &DeleteParams::background())
            .await?;
        info!(name, "Deleted deployment");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_deployments(&self, filter: &ListFilter) -> ClusterResult<Vec<Deployment>> {
        let list = self.deployments().list(&list_params(filter)).await?;
        Ok(list.items)
    }

    #[instrument(skip(self, service), fields(name = %service.metadata.name.as_deref().unwrap_or("unknown")))]
    async fn create_service(&self, service: &Service) -> ClusterResult<()> {
        self.services()
            .create(&PostParams::default(), service)
            .await?;
        info!("Created service");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_service(&self, name: &str) -> ClusterResult<()> {
        self.services()
            .delete(name, &DeleteParams::default())
            .await?;
        info!(name, "Deleted service");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_services(&self, filter: &ListFilter) -> ClusterResult<Vec<Service>> {
        let list = self.services().list(&list_params(filter)).await?;
        Ok(list.items)
    }

    #[instrument(skip(self))]
    async fn list_pods(&self, filter: &ListFilter) -> ClusterResult<Vec<Pod>> {
        let list = self.pods().list(&list_params(filter)).await?;
        Ok(list.items)
    }

    #[instrument(skip(self))]
    async fn pod_logs(
        &self,
        pod_name: &str,
        container_name: &str,
        limits: &LogLimits,
    ) -> ClusterResult<String> {
        let logs = self
            .pods()
            .logs(pod_name, &log_params(container_name, limits))
            .await?;
        Ok(logs)
    }
}
