//! Kubernetes resource builders for Shipyard
//!
//! Turns a [`DeploymentRequest`] plus the cluster defaults into the
//! Deployment / NodePort Service pair created by the deploy saga.

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, HTTPGetAction, PodSpec, PodTemplateSpec, Probe,
    ResourceRequirements, Service, ServicePort, ServiceSpec,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::ClusterDefaults;
use crate::models::{DeploymentRequest, HealthCheck};

pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
pub const MANAGED_BY_VALUE: &str = "shipyard";
pub const DEPLOY_MODE_ANNOTATION: &str = "shipyard.io/deploy-mode";

/// Manifests for one application, owned by a single deploy call
#[derive(Debug, Clone, Serialize)]
pub struct ResourceManifestPair {
    pub deployment: Deployment,
    pub service: Service,
}

impl ResourceManifestPair {
    /// Name shared by the workload and the service
    pub fn workload_name(&self) -> &str {
        self.deployment.metadata.name.as_deref().unwrap_or_default()
    }

    /// Render both manifests as a multi-document YAML string
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        let deployment = serde_yaml::to_string(&self.deployment)?;
        let service = serde_yaml::to_string(&self.service)?;
        Ok(format!("{}---\n{}", deployment, service))
    }
}

/// Labels put on every object belonging to an application
pub fn app_labels(defaults: &ClusterDefaults, app_code: &str) -> BTreeMap<String, String> {
    [
        (defaults.app_label.clone(), app_code.to_string()),
        (MANAGED_BY_LABEL.to_string(), MANAGED_BY_VALUE.to_string()),
    ]
    .into_iter()
    .collect()
}

/// Labels used to select the application's pods
fn selector_labels(defaults: &ClusterDefaults, app_code: &str) -> BTreeMap<String, String> {
    [(defaults.app_label.clone(), app_code.to_string())]
        .into_iter()
        .collect()
}

/// Build the workload and exposure manifests for a request
pub fn build_manifests(
    request: &DeploymentRequest,
    defaults: &ClusterDefaults,
) -> ResourceManifestPair {
    ResourceManifestPair {
        deployment: create_deployment_spec(request, defaults),
        service: create_service(request, defaults),
    }
}

/// Create the Deployment running the application container
pub fn create_deployment_spec(request: &DeploymentRequest, defaults: &ClusterDefaults) -> Deployment {
    let labels = app_labels(defaults, &request.app_code);
    let selector = selector_labels(defaults, &request.app_code);

    Deployment {
        metadata: ObjectMeta {
            name: Some(request.app_code.clone()),
            namespace: Some(defaults.namespace.clone()),
            labels: Some(labels.clone()),
            annotations: Some(
                [(
                    DEPLOY_MODE_ANNOTATION.to_string(),
                    request.deploy_mode.to_string(),
                )]
                .into_iter()
                .collect(),
            ),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(defaults.replicas),
            selector: LabelSelector {
                match_labels: Some(selector),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![create_app_container(request, defaults)],
                    restart_policy: Some("Always".to_string()),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn create_app_container(request: &DeploymentRequest, defaults: &ClusterDefaults) -> Container {
    let port = i32::from(request.port);
    let probe = request
        .health_check
        .as_ref()
        .map(|check| build_http_probe(check, port));

    let env: Vec<EnvVar> = request
        .env
        .iter()
        .map(|e| EnvVar {
            name: e.name.clone(),
            value: Some(e.value.clone()),
            ..Default::default()
        })
        .collect();

    Container {
        name: request.app_code.clone(),
        image: Some(request.image.clone()),
        image_pull_policy: Some(request.image_pull_policy.to_string()),
        ports: Some(vec![ContainerPort {
            container_port: port,
            name: Some(defaults.port_name.clone()),
            protocol: Some("TCP".to_string()),
            ..Default::default()
        }]),
        env: if env.is_empty() { None } else { Some(env) },
        resources: Some(build_resource_requirements(defaults)),
        liveness_probe: probe.clone(),
        readiness_probe: probe,
        ..Default::default()
    }
}

fn build_http_probe(check: &HealthCheck, port: i32) -> Probe {
    Probe {
        http_get: Some(HTTPGetAction {
            path: Some(check.path.clone()),
            port: IntOrString::Int(port),
            scheme: Some("HTTP".to_string()),
            ..Default::default()
        }),
        initial_delay_seconds: Some(check.initial_delay_seconds),
        period_seconds: Some(check.period_seconds),
        timeout_seconds: Some(check.timeout_seconds),
        failure_threshold: Some(check.failure_threshold),
        ..Default::default()
    }
}

fn build_resource_requirements(defaults: &ClusterDefaults) -> ResourceRequirements {
    let requests = [
        ("cpu".to_string(), Quantity(defaults.cpu_request.clone())),
        ("memory".to_string(), Quantity(defaults.memory_request.clone())),
    ]
    .into_iter()
    .collect();
    let limits = [
        ("cpu".to_string(), Quantity(defaults.cpu_limit.clone())),
        ("memory".to_string(), Quantity(defaults.memory_limit.clone())),
    ]
    .into_iter()
    .collect();

    ResourceRequirements {
        limits: Some(limits),
        requests: Some(requests),
        ..Default::default()
    }
}

/// Create a NodePort Service publishing the application port outside the
/// cluster. The node port itself is left for the cluster to assign.
pub fn create_service(request: &DeploymentRequest, defaults: &ClusterDefaults) -> Service {
    let port = i32::from(request.port);

    Service {
        metadata: ObjectMeta {
            name: Some(request.app_code.clone()),
            namespace: Some(defaults.namespace.clone()),
            labels: Some(app_labels(defaults, &request.app_code)),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            selector: Some(selector_labels(defaults, &request.app_code)),
            ports: Some(vec![ServicePort {
                name: Some(defaults.port_name.clone()),
                port,
                target_port: Some(IntOrString::Int(port)),
                protocol: Some("TCP".to_string()),
                node_port: None,
                ..Default::default()
            }]),
            type_: Some("NodePort".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}
