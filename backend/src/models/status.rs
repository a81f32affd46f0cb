use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::Display;

/// Pod lifecycle phase as reported by the cluster
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Display, PartialEq, Eq, Default)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    #[default]
    Unknown,
}

impl From<&str> for PodPhase {
    fn from(phase: &str) -> Self {
        match phase {
            "Pending" => PodPhase::Pending,
            "Running" => PodPhase::Running,
            "Succeeded" => PodPhase::Succeeded,
            "Failed" => PodPhase::Failed,
            _ => PodPhase::Unknown,
        }
    }
}

/// A pod scheduling condition or a workload rollout condition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConditionRecord {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,
}

/// Runtime state of a single container
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub enum ContainerRunState {
    #[serde(rename_all = "camelCase")]
    Running {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        started_at: Option<DateTime<Utc>>,
    },
    #[serde(rename_all = "camelCase")]
    Waiting {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Terminated {
        exit_code: i32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    #[default]
    Unknown,
}

impl ContainerRunState {
    pub fn is_running(&self) -> bool {
        matches!(self, ContainerRunState::Running { .. })
    }

    /// Short label used in log reports
    pub fn label(&self) -> &'static str {
        match self {
            ContainerRunState::Running { .. } => "running",
            ContainerRunState::Waiting { .. } => "waiting",
            ContainerRunState::Terminated { .. } => "terminated",
            ContainerRunState::Unknown => "unknown",
        }
    }
}

/// Image pull and container creation status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerStatusRecord {
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub ready: bool,
    #[serde(default)]
    pub restart_count: i32,
    #[serde(default)]
    pub state: ContainerRunState,
}

impl ContainerStatusRecord {
    pub fn new(name: impl Into<String>, state: ContainerRunState) -> Self {
        Self {
            name: name.into(),
            image: String::new(),
            ready: state.is_running(),
            restart_count: 0,
            state,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodStatusRecord {
    pub pod_name: String,
    pub phase: PodPhase,
    pub conditions: Vec<ConditionRecord>,
    /// Empty until the container runtime has reported
    pub containers: Vec<ContainerStatusRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadStatusRecord {
    pub deployment_name: String,
    pub conditions: Vec<ConditionRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExposureStatusRecord {
    pub node_port: i32,
}

/// Cluster state keyed per application
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedStatus {
    /// Keyed by the application label of each pod
    pub pod_status_map: HashMap<String, PodStatusRecord>,
    /// Keyed by workload name
    pub deployment_status_map: HashMap<String, WorkloadStatusRecord>,
    /// Keyed by service name
    pub service_status_map: HashMap<String, ExposureStatusRecord>,
}

/// Compact listing entry for one workload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadSummary {
    pub name: String,
    pub creation_timestamp: Option<DateTime<Utc>>,
    /// Desired replica count
    pub replicas: Option<i32>,
    pub available_replicas: Option<i32>,
}

/// Selector applied to one list call
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ListFilter {
    #[serde(default)]
    pub label_selector: Option<String>,
    #[serde(default)]
    pub field_selector: Option<String>,
}

impl ListFilter {
    pub fn labels(selector: impl Into<String>) -> Self {
        Self {
            label_selector: Some(selector.into()),
            field_selector: None,
        }
    }
}

/// Per-kind filters for a status read
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct StatusFilters {
    #[serde(default)]
    pub pods: ListFilter,
    #[serde(default)]
    pub deployments: ListFilter,
    #[serde(default)]
    pub services: ListFilter,
}
