//! Application status aggregation
//!
//! Lists pods, deployments and services concurrently and folds each listing
//! into a map keyed by the application it belongs to.

use k8s_openapi::api::apps::v1::{Deployment, DeploymentCondition};
use k8s_openapi::api::core::v1::{ContainerState, ContainerStatus, Pod, PodCondition, Service};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::client::{ClusterResult, ResourceClient};
use crate::config::ClusterDefaults;
use crate::models::{
    AggregatedStatus, ConditionRecord, ContainerRunState, ContainerStatusRecord,
    ExposureStatusRecord, ListFilter, PodPhase, PodStatusRecord, StatusFilters,
    WorkloadStatusRecord, WorkloadSummary,
};

/// Reads cluster state for deployed applications
pub struct StatusAggregator {
    client: Arc<dyn ResourceClient>,
    app_label: String,
}

impl StatusAggregator {
    pub fn new(client: Arc<dyn ResourceClient>, defaults: &ClusterDefaults) -> Self {
        Self {
            client,
            app_label: defaults.app_label.clone(),
        }
    }

    /// Get pod, deployment and service status in one read
    ///
    /// The three list calls run concurrently and are all awaited; if any of
    /// them failed the whole read fails.
    #[instrument(skip(self))]
    pub async fn get_all_status(&self, filters: &StatusFilters) -> ClusterResult<AggregatedStatus> {
        let (pods, deployments, services) = tokio::join!(
            self.client.list_pods(&filters.pods),
            self.client.list_deployments(&filters.deployments),
            self.client.list_services(&filters.services),
        );

        let pods = pods.inspect_err(|e| warn!(error = %e, "Listing pods failed"))?;
        let deployments =
            deployments.inspect_err(|e| warn!(error = %e, "Listing deployments failed"))?;
        let services = services.inspect_err(|e| warn!(error = %e, "Listing services failed"))?;

        let status = AggregatedStatus {
            pod_status_map: reduce_pods(&pods, &self.app_label),
            deployment_status_map: reduce_deployments(&deployments),
            service_status_map: reduce_services(&services),
        };

        info!(
            pods = status.pod_status_map.len(),
            deployments = status.deployment_status_map.len(),
            services = status.service_status_map.len(),
            "Aggregated application status"
        );
        Ok(status)
    }

    /// List deployments as compact summaries
    ///
    /// A non-success status from the API server is treated as "no
    /// deployments"; only transport failures are returned as errors.
    #[instrument(skip(self))]
    pub async fn get_deployments(&self, filter: &ListFilter) -> ClusterResult<Vec<WorkloadSummary>> {
        let deployments = match self.client.list_deployments(filter).await {
            Ok(items) => items,
            Err(e) if e.status_code().is_some() => {
                warn!(error = %e, code = ?e.status_code(), "Deployment listing returned non-success status");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        Ok(deployments.iter().filter_map(summarize_deployment).collect())
    }
}

/// Pods keyed by application label. Pods without a name or without the
/// label are skipped.
pub fn reduce_pods(pods: &[Pod], app_label: &str) -> HashMap<String, PodStatusRecord> {
    let mut map = HashMap::with_capacity(pods.len());

    for pod in pods {
        let Some(pod_name) = pod.metadata.name.clone() else {
            warn!("Skipping pod without a name");
            continue;
        };
        let Some(app) = pod
            .metadata
            .labels
            .as_ref()
            .and_then(|l| l.get(app_label))
            .cloned()
        else {
            warn!(pod_name = %pod_name, label = app_label, "Skipping pod without application label");
            continue;
        };

        let status = pod.status.as_ref();
        let phase = status
            .and_then(|s| s.phase.as_deref())
            .map(PodPhase::from)
            .unwrap_or_default();
        let conditions = status
            .and_then(|s| s.conditions.as_ref())
            .map(|cs| cs.iter().map(pod_condition).collect())
            .unwrap_or_default();
        let containers = status
            .and_then(|s| s.container_statuses.as_ref())
            .map(|cs| cs.iter().map(container_status).collect())
            .unwrap_or_default();

        let record = PodStatusRecord {
            pod_name,
            phase,
            conditions,
            containers,
        };
        if let Some(previous) = map.insert(app.clone(), record) {
            debug!(app = %app, replaced = %previous.pod_name, "Several pods for one application, keeping the last");
        }
    }

    map
}

/// Deployments keyed by name
pub fn reduce_deployments(deployments: &[Deployment]) -> HashMap<String, WorkloadStatusRecord> {
    let mut map = HashMap::with_capacity(deployments.len());

    for deployment in deployments {
        let Some(name) = deployment.metadata.name.clone() else {
            warn!("Skipping deployment without a name");
            continue;
        };
        let conditions = deployment
            .status
            .as_ref()
            .and_then(|s| s.conditions.as_ref())
            .map(|cs| cs.iter().map(deployment_condition).collect())
            .unwrap_or_default();

        map.insert(
            name.clone(),
            WorkloadStatusRecord {
                deployment_name: name,
                conditions,
            },
        );
    }

    map
}

/// Services keyed by name, carrying the node port of their first port.
/// Services without ports or without an assigned node port are skipped.
pub fn reduce_services(services: &[Service]) -> HashMap<String, ExposureStatusRecord> {
    let mut map = HashMap::with_capacity(services.len());

    for service in services {
        let Some(name) = service.metadata.name.clone() else {
            warn!("Skipping service without a name");
            continue;
        };
        let node_port = service
            .spec
            .as_ref()
            .and_then(|s| s.ports.as_ref())
            .and_then(|ports| ports.first())
            .and_then(|p| p.node_port);

        match node_port {
            Some(node_port) => {
                map.insert(name, ExposureStatusRecord { node_port });
            }
            None => warn!(service = %name, "Skipping service without a node port"),
        }
    }

    map
}

fn summarize_deployment(deployment: &Deployment) -> Option<WorkloadSummary> {
    let name = deployment.metadata.name.clone()?;
    let status = deployment.status.as_ref();

    Some(WorkloadSummary {
        name,
        creation_timestamp: deployment.metadata.creation_timestamp.as_ref().map(|t| t.0),
        replicas: deployment
            .spec
            .as_ref()
            .and_then(|s| s.replicas)
            .or_else(|| status.and_then(|s| s.replicas)),
        available_replicas: status.and_then(|s| s.available_replicas),
    })
}

fn pod_condition(c: &PodCondition) -> ConditionRecord {
    ConditionRecord {
        type_: c.type_.clone(),
        status: c.status.clone(),
        reason: c.reason.clone(),
        message: c.message.clone(),
        last_transition_time: c.last_transition_time.as_ref().map(|t| t.0),
    }
}

fn deployment_condition(c: &DeploymentCondition) -> ConditionRecord {
    ConditionRecord {
        type_: c.type_.clone(),
        status: c.status.clone(),
        reason: c.reason.clone(),
        message: c.message.clone(),
        last_transition_time: c.last_transition_time.as_ref().map(|t| t.0),
    }
}

fn container_status(c: &ContainerStatus) -> ContainerStatusRecord {
    ContainerStatusRecord {
        name: c.name.clone(),
        image: c.image.clone(),
        ready: c.ready,
        restart_count: c.restart_count,
        state: c.state.as_ref().map(run_state).unwrap_or_default(),
    }
}

fn run_state(state: &ContainerState) -> ContainerRunState {
    if let Some(running) = &state.running {
        ContainerRunState::Running {
            started_at: running.started_at.as_ref().map(|t| t.0),
        }
    } else if let Some(terminated) = &state.terminated {
        ContainerRunState::Terminated {
            exit_code: terminated.exit_code,
            reason: terminated.reason.clone(),
        }
    } else if let Some(waiting) = &state.waiting {
        ContainerRunState::Waiting {
            reason: waiting.reason.clone(),
        }
    } else {
        ContainerRunState::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::k8s::client::MockResourceClient;
    use crate::k8s::ClusterError;
    use k8s_openapi::api::apps::v1::{DeploymentSpec, DeploymentStatus};
    use k8s_openapi::api::core::v1::{
        ContainerStateRunning, ContainerStateTerminated, PodStatus, ServicePort, ServiceSpec,
    };
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn pod(name: &str, app: Option<&str>, phase: &str) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                labels: app.map(|a| [("app".to_string(), a.to_string())].into_iter().collect()),
                ..Default::default()
            },
            status: Some(PodStatus {
                phase: Some(phase.to_string()),
                conditions: Some(vec![PodCondition {
                    type_: "PodScheduled".to_string(),
                    status: "True".to_string(),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn deployment(name: &str) -> Deployment {
        Deployment {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            spec: Some(DeploymentSpec {
                replicas: Some(3),
                ..Default::default()
            }),
            status: Some(DeploymentStatus {
                replicas: Some(2),
                available_replicas: Some(1),
                ..Default::default()
            }),
        }
    }

    fn service(name: &str, node_port: Option<i32>) -> Service {
        Service {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            spec: Some(ServiceSpec {
                ports: Some(vec![ServicePort {
                    port: 8080,
                    node_port,
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn aggregator(mock: MockResourceClient) -> StatusAggregator {
        StatusAggregator::new(Arc::new(mock), &ClusterDefaults::default())
    }

    #[test]
    fn test_reduce_pods_keys_by_app_label() {
        let pods = vec![
            pod("svc-a-7d9f-abcde", Some("svc-a"), "Running"),
            pod("svc-b-5c4b-fghij", Some("svc-b"), "Pending"),
            pod("orphan", None, "Running"),
        ];

        let map = reduce_pods(&pods, "app");

        assert_eq!(map.len(), 2);
        let a = &map["svc-a"];
        assert_eq!(a.pod_name, "svc-a-7d9f-abcde");
        assert_eq!(a.phase, PodPhase::Running);
        assert_eq!(a.conditions[0].type_, "PodScheduled");
        assert!(a.containers.is_empty());
        assert_eq!(map["svc-b"].phase, PodPhase::Pending);
    }

    #[test]
    fn test_reduce_pods_duplicate_key_keeps_one_entry() {
        let pods = vec![
            pod("svc-a-1", Some("svc-a"), "Running"),
            pod("svc-a-2", Some("svc-a"), "Running"),
        ];

        let map = reduce_pods(&pods, "app");

        assert_eq!(map.len(), 1);
        assert_eq!(map["svc-a"].pod_name, "svc-a-2");
    }

    #[test]
    fn test_container_states_are_mapped() {
        let mut p = pod("svc-a-1", Some("svc-a"), "Running");
        p.status.as_mut().unwrap().container_statuses = Some(vec![
            ContainerStatus {
                name: "web".to_string(),
                ready: true,
                state: Some(ContainerState {
                    running: Some(ContainerStateRunning::default()),
                    ..Default::default()
                }),
                ..Default::default()
            },
            ContainerStatus {
                name: "migrate".to_string(),
                state: Some(ContainerState {
                    terminated: Some(ContainerStateTerminated {
                        exit_code: 0,
                        reason: Some("Completed".to_string()),
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            },
        ]);

        let map = reduce_pods(&[p], "app");
        let containers = &map["svc-a"].containers;

        assert_eq!(containers.len(), 2);
        assert!(containers[0].state.is_running());
        assert_eq!(
            containers[1].state,
            ContainerRunState::Terminated {
                exit_code: 0,
                reason: Some("Completed".to_string())
            }
        );
    }

    #[test]
    fn test_reduce_deployments_defaults_conditions() {
        let map = reduce_deployments(&[deployment("svc-a")]);

        assert_eq!(map["svc-a"].deployment_name, "svc-a");
        assert!(map["svc-a"].conditions.is_empty());
    }

    #[test]
    fn test_reduce_services_skips_missing_node_port() {
        let mut no_ports = service("svc-c", None);
        no_ports.spec.as_mut().unwrap().ports = Some(vec![]);

        let map = reduce_services(&[
            service("svc-a", Some(30080)),
            service("svc-b", None),
            no_ports,
        ]);

        assert_eq!(map.len(), 1);
        assert_eq!(map["svc-a"].node_port, 30080);
    }

    #[tokio::test]
    async fn test_get_all_status_merges_three_listings() {
        let mut mock = MockResourceClient::new();
        mock.expect_list_pods()
            .times(1)
            .returning(|_| Ok(vec![pod("svc-a-1", Some("svc-a"), "Running")]));
        mock.expect_list_deployments()
            .times(1)
            .returning(|_| Ok(vec![deployment("svc-a")]));
        mock.expect_list_services()
            .times(1)
            .returning(|_| Ok(vec![service("svc-a", Some(30080))]));

        let status = aggregator(mock)
            .get_all_status(&StatusFilters::default())
            .await
            .unwrap();

        assert!(status.pod_status_map.contains_key("svc-a"));
        assert!(status.deployment_status_map.contains_key("svc-a"));
        assert_eq!(status.service_status_map["svc-a"].node_port, 30080);
    }

    #[tokio::test]
    async fn test_get_all_status_fails_when_one_listing_fails() {
        let mut mock = MockResourceClient::new();
        mock.expect_list_pods()
            .times(1)
            .returning(|_| Ok(vec![pod("svc-a-1", Some("svc-a"), "Running")]));
        mock.expect_list_deployments()
            .times(1)
            .returning(|_| Ok(vec![deployment("svc-a")]));
        mock.expect_list_services()
            .times(1)
            .returning(|_| Err(ClusterError::api(500, "InternalError", "services unavailable")));

        let result = aggregator(mock).get_all_status(&StatusFilters::default()).await;

        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "services unavailable");
    }

    #[tokio::test]
    async fn test_get_all_status_passes_filters_per_kind() {
        let mut mock = MockResourceClient::new();
        mock.expect_list_pods()
            .withf(|f| f.label_selector.as_deref() == Some("app=svc-a"))
            .returning(|_| Ok(vec![]));
        mock.expect_list_deployments()
            .withf(|f| f.label_selector.is_none())
            .returning(|_| Ok(vec![]));
        mock.expect_list_services()
            .withf(|f| f.field_selector.as_deref() == Some("metadata.name=svc-a"))
            .returning(|_| Ok(vec![]));

        let filters = StatusFilters {
            pods: ListFilter::labels("app=svc-a"),
            deployments: ListFilter::default(),
            services: ListFilter {
                label_selector: None,
                field_selector: Some("metadata.name=svc-a".to_string()),
            },
        };

        let status = aggregator(mock).get_all_status(&filters).await.unwrap();
        assert_eq!(status, AggregatedStatus::default());
    }

    #[tokio::test]
    async fn test_get_deployments_summaries() {
        let mut mock = MockResourceClient::new();
        mock.expect_list_deployments()
            .returning(|_| Ok(vec![deployment("svc-a"), deployment("svc-b")]));

        let summaries = aggregator(mock)
            .get_deployments(&ListFilter::default())
            .await
            .unwrap();

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].name, "svc-a");
        assert_eq!(summaries[0].replicas, Some(3));
        assert_eq!(summaries[0].available_replicas, Some(1));
        assert!(summaries[0].creation_timestamp.is_none());
    }

    #[tokio::test]
    async fn test_get_deployments_non_success_status_is_empty() {
        let mut mock = MockResourceClient::new();
        mock.expect_list_deployments()
            .returning(|_| Err(ClusterError::api(403, "Forbidden", "deployments is forbidden")));

        let summaries = aggregator(mock)
            .get_deployments(&ListFilter::default())
            .await
            .unwrap();

        assert!(summaries.is_empty());
    }

    #[tokio::test]
    async fn test_get_deployments_transport_error_propagates() {
        let mut mock = MockResourceClient::new();
        mock.expect_list_deployments().returning(|_| {
            Err(ClusterError::Transport(kube::Error::ReadEvents(
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused"),
            )))
        });

        let err = aggregator(mock)
            .get_deployments(&ListFilter::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ClusterError::Transport(_)));
        assert_eq!(err.status_code(), None);
    }
}
