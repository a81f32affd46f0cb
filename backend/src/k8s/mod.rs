//! Kubernetes integration module for Shipyard
//!
//! This module handles all interactions with the cluster:
//! - Building Deployment and NodePort Service manifests for an application
//! - Deploying applications as a two-step saga with rollback
//! - Aggregating pod, deployment and service status per application
//! - Collecting container logs for a pod

mod client;
mod deployment;
mod error;
mod logs;
mod resources;
mod status;

pub use client::{ClusterResult, K8sClient, ResourceClient};
pub use deployment::{DeploymentManager, SagaStage};
pub use error::ClusterError;
pub use logs::{format_window, LogCollector, LOG_PLACEHOLDER};
pub use resources::{
    app_labels, build_manifests, create_deployment_spec, create_service, ResourceManifestPair,
};
pub use status::{reduce_deployments, reduce_pods, reduce_services, StatusAggregator};
