use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Maximum length of a DNS-1123 label, which is what Kubernetes accepts as
/// a Deployment / Service name.
const MAX_APP_CODE_LEN: usize = 63;

/// Image pull policy for the application container
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Display, EnumString, PartialEq, Eq, Default)]
pub enum ImagePullPolicy {
    Always,
    #[default]
    IfNotPresent,
    Never,
}

/// How the deployment was triggered
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Display, EnumString, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeployMode {
    #[default]
    Automatic,
    Manual,
}

/// HTTP health check applied to the application container
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheck {
    #[serde(default = "default_health_path")]
    pub path: String,
    #[serde(default = "default_initial_delay")]
    pub initial_delay_seconds: i32,
    #[serde(default = "default_period")]
    pub period_seconds: i32,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: i32,
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: i32,
}

fn default_health_path() -> String {
    "/".to_string()
}

fn default_initial_delay() -> i32 {
    10
}

fn default_period() -> i32 {
    10
}

fn default_timeout() -> i32 {
    1
}

fn default_failure_threshold() -> i32 {
    3
}

impl Default for HealthCheck {
    fn default() -> Self {
        Self {
            path: default_health_path(),
            initial_delay_seconds: default_initial_delay(),
            period_seconds: default_period(),
            timeout_seconds: default_timeout(),
            failure_threshold: default_failure_threshold(),
        }
    }
}

/// Environment variable passed to the application container
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnvVarSpec {
    pub name: String,
    pub value: String,
}

/// Request to deploy one application to the cluster
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRequest {
    /// Unique application identifier, used as the workload and service name
    pub app_code: String,
    pub image: String,
    pub port: u16,
    #[serde(default)]
    pub image_pull_policy: ImagePullPolicy,
    #[serde(default)]
    pub health_check: Option<HealthCheck>,
    #[serde(default)]
    pub deploy_mode: DeployMode,
    #[serde(default)]
    pub env: Vec<EnvVarSpec>,
}

impl DeploymentRequest {
    pub fn new(app_code: impl Into<String>, image: impl Into<String>, port: u16) -> Self {
        Self {
            app_code: app_code.into(),
            image: image.into(),
            port,
            image_pull_policy: ImagePullPolicy::default(),
            health_check: None,
            deploy_mode: DeployMode::default(),
            env: Vec::new(),
        }
    }

    /// Check the fields the cluster would otherwise reject
    pub fn validate(&self) -> Result<(), String> {
        if self.app_code.is_empty() {
            return Err("appCode is required".to_string());
        }
        if !is_dns_label(&self.app_code) {
            return Err(format!(
                "appCode '{}' must be a lowercase DNS label (a-z, 0-9, '-', at most {} characters)",
                self.app_code, MAX_APP_CODE_LEN
            ));
        }
        if self.image.trim().is_empty() {
            return Err("image is required".to_string());
        }
        if self.port == 0 {
            return Err("port must be between 1 and 65535".to_string());
        }
        Ok(())
    }
}

fn is_dns_label(name: &str) -> bool {
    name.len() <= MAX_APP_CODE_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !name.starts_with('-')
        && !name.ends_with('-')
}

/// Result of one deploy or delete call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeploymentOutcome {
    pub success: bool,
    /// Empty on success
    pub message: String,
}

impl DeploymentOutcome {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            message: String::new(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
