//! In-memory cluster used by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Pod, Service};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use shipyard_backend::config::LogLimits;
use shipyard_backend::k8s::{ClusterError, ClusterResult, ResourceClient};
use shipyard_backend::models::ListFilter;

/// Failure to inject into the next matching call
#[derive(Debug, Clone)]
pub struct Injected {
    pub code: u16,
    pub message: String,
}

impl Injected {
    pub fn new(code: u16, message: &str) -> Self {
        Self {
            code,
            message: message.to_string(),
        }
    }

    fn error(&self) -> ClusterError {
        ClusterError::api(self.code, "Injected", self.message.clone())
    }
}

#[derive(Default)]
pub struct FakeState {
    pub deployments: BTreeMap<String, Deployment>,
    pub services: BTreeMap<String, Service>,
    pub pods: Vec<Pod>,
    pub logs: BTreeMap<(String, String), String>,
    pub calls: Vec<String>,
    pub fail_create_deployment: Option<Injected>,
    pub fail_create_service: Option<Injected>,
    pub fail_delete_deployment: Option<Injected>,
    pub fail_list_deployments: Option<Injected>,
    pub fail_list_services: Option<Injected>,
}

/// Cluster double that keeps created objects in memory and records calls
#[derive(Clone, Default)]
pub struct FakeCluster {
    pub state: Arc<Mutex<FakeState>>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<F: FnOnce(&mut FakeState)>(&self, f: F) {
        f(&mut self.state.lock().unwrap());
    }

    pub fn has_deployment(&self, name: &str) -> bool {
        self.state.lock().unwrap().deployments.contains_key(name)
    }

    pub fn has_service(&self, name: &str) -> bool {
        self.state.lock().unwrap().services.contains_key(name)
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }
}

fn name_of(meta: &k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta) -> String {
    meta.name.clone().unwrap_or_default()
}

fn not_found(kind: &str, name: &str) -> ClusterError {
    ClusterError::api(404, "NotFound", format!("{} \"{}\" not found", kind, name))
}

#[async_trait]
impl ResourceClient for FakeCluster {
    async fn create_deployment(&self, deployment: &Deployment) -> ClusterResult<()> {
        let mut state = self.state.lock().unwrap();
        let name = name_of(&deployment.metadata);
        state.calls.push(format!("create_deployment:{}", name));
        if let Some(injected) = &state.fail_create_deployment {
            return Err(injected.error());
        }
        if state.deployments.contains_key(&name) {
            return Err(ClusterError::api(409, "AlreadyExists", format!("deployments.apps \"{}\" already exists", name)));
        }
        state.deployments.insert(name, deployment.clone());
        Ok(())
    }

    async fn delete_deployment(&self, name: &str) -> ClusterResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("delete_deployment:{}", name));
        if let Some(injected) = &state.fail_delete_deployment {
            return Err(injected.error());
        }
        state
            .deployments
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| not_found("deployments.apps", name))
    }

    async fn list_deployments(&self, _filter: &ListFilter) -> ClusterResult<Vec<Deployment>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("list_deployments".to_string());
        if let Some(injected) = &state.fail_list_deployments {
            return Err(injected.error());
        }
        Ok(state.deployments.values().cloned().collect())
    }

    async fn create_service(&self, service: &Service) -> ClusterResult<()> {
        let mut state = self.state.lock().unwrap();
        let name = name_of(&service.metadata);
        state.calls.push(format!("create_service:{}", name));
        if let Some(injected) = &state.fail_create_service {
            return Err(injected.error());
        }
        state.services.insert(name, service.clone());
        Ok(())
    }

    async fn delete_service(&self, name: &str) -> ClusterResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("delete_service:{}", name));
        state
            .services
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| not_found("services", name))
    }

    async fn list_services(&self, _filter: &ListFilter) -> ClusterResult<Vec<Service>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("list_services".to_string());
        if let Some(injected) = &state.fail_list_services {
            return Err(injected.error());
        }
        Ok(state.services.values().cloned().collect())
    }

    async fn list_pods(&self, _filter: &ListFilter) -> ClusterResult<Vec<Pod>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("list_pods".to_string());
        Ok(state.pods.clone())
    }

    async fn pod_logs(
        &self,
        pod_name: &str,
        container_name: &str,
        _limits: &LogLimits,
    ) -> ClusterResult<String> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(format!("pod_logs:{}/{}", pod_name, container_name));
        state
            .logs
            .get(&(pod_name.to_string(), container_name.to_string()))
            .cloned()
            .ok_or_else(|| not_found("pods", pod_name))
    }
}

/// Wraps another client, holds every call open for `latency` and records
/// the highest number of calls in flight at once
pub struct InFlightCluster<C> {
    inner: C,
    latency: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl<C: ResourceClient> InFlightCluster<C> {
    pub fn new(inner: C, latency: Duration) -> Self {
        Self {
            inner,
            latency,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn track<T, F>(&self, call: F) -> ClusterResult<T>
    where
        F: std::future::Future<Output = ClusterResult<T>>,
    {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        let result = call.await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[async_trait]
impl<C: ResourceClient> ResourceClient for InFlightCluster<C> {
    async fn create_deployment(&self, deployment: &Deployment) -> ClusterResult<()> {
        self.track(self.inner.create_deployment(deployment)).await
    }

    async fn delete_deployment(&self, name: &str) -> ClusterResult<()> {
        self.track(self.inner.delete_deployment(name)).await
    }

    async fn list_deployments(&self, filter: &ListFilter) -> ClusterResult<Vec<Deployment>> {
        self.track(self.inner.list_deployments(filter)).await
    }

    async fn create_service(&self, service: &Service) -> ClusterResult<()> {
        self.track(self.inner.create_service(service)).await
    }

    async fn delete_service(&self, name: &str) -> ClusterResult<()> {
        self.track(self.inner.delete_service(name)).await
    }

    async fn list_services(&self, filter: &ListFilter) -> ClusterResult<Vec<Service>> {
        self.track(self.inner.list_services(filter)).await
    }

    async fn list_pods(&self, filter: &ListFilter) -> ClusterResult<Vec<Pod>> {
        self.track(self.inner.list_pods(filter)).await
    }

    async fn pod_logs(
        &self,
        pod_name: &str,
        container_name: &str,
        limits: &LogLimits,
    ) -> ClusterResult<String> {
        self.track(self.inner.pod_logs(pod_name, container_name, limits))
            .await
    }
}
