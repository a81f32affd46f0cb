use anyhow::{bail, Result};
use serde::Deserialize;

/// Prefix of every environment variable read into [`Config`]
pub const ENV_PREFIX: &str = "SHIPYARD";

/// Backend configuration, read from the environment (and `.env`)
///
/// Keys carry the `SHIPYARD_` prefix and nested keys use a double
/// underscore, e.g. `SHIPYARD_CLUSTER__NAMESPACE=apps` or
/// `SHIPYARD_LOG_OUTPUT__TAIL_LINES=200`.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub cluster: ClusterDefaults,

    #[serde(default)]
    pub log_output: LogLimits,
}

/// Cluster-wide defaults used to turn a deployment request into manifests
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ClusterDefaults {
    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default = "default_replicas")]
    pub replicas: i32,

    /// Label carrying the application code on every managed object
    #[serde(default = "default_app_label")]
    pub app_label: String,

    #[serde(default = "default_cpu_request")]
    pub cpu_request: String,

    #[serde(default = "default_cpu_limit")]
    pub cpu_limit: String,

    #[serde(default = "default_memory_request")]
    pub memory_request: String,

    #[serde(default = "default_memory_limit")]
    pub memory_limit: String,

    #[serde(default = "default_port_name")]
    pub port_name: String,
}

/// Window and size limits for container log fetches
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct LogLimits {
    #[serde(default = "default_since_seconds")]
    pub since_seconds: i64,

    #[serde(default = "default_tail_lines")]
    pub tail_lines: i64,
}

fn default_port() -> u16 {
    8080
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_replicas() -> i32 {
    1
}

fn default_app_label() -> String {
    "app".to_string()
}

fn default_cpu_request() -> String {
    "100m".to_string()
}

fn default_cpu_limit() -> String {
    "500m".to_string()
}

fn default_memory_request() -> String {
    "128Mi".to_string()
}

fn default_memory_limit() -> String {
    "512Mi".to_string()
}

fn default_port_name() -> String {
    "http".to_string()
}

fn default_since_seconds() -> i64 {
    3600
}

fn default_tail_lines() -> i64 {
    500
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Self::from_environment(None)
    }

    /// Build from the process environment, or from `vars` when given
    fn from_environment(vars: Option<config::Map<String, String>>) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(vars),
            )
            .build()?;

        let settings: Config = config.try_deserialize()?;
        settings.validate()?;

        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cluster.namespace.is_empty() {
            bail!("cluster namespace must not be empty");
        }
        if self.cluster.app_label.is_empty() {
            bail!("cluster app label must not be empty");
        }
        if self.cluster.replicas < 1 {
            bail!("cluster replicas must be at least 1, got {}", self.cluster.replicas);
        }
        if self.log_output.since_seconds <= 0 || self.log_output.tail_lines <= 0 {
            bail!(
                "log output limits must be positive (since_seconds={}, tail_lines={})",
                self.log_output.since_seconds,
                self.log_output.tail_lines
            );
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            cluster: ClusterDefaults::default(),
            log_output: LogLimits::default(),
        }
    }
}

impl Default for ClusterDefaults {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            replicas: default_replicas(),
            app_label: default_app_label(),
            cpu_request: default_cpu_request(),
            cpu_limit: default_cpu_limit(),
            memory_request: default_memory_request(),
            memory_limit: default_memory_limit(),
            port_name: default_port_name(),
        }
    }
}

impl Default for LogLimits {
    fn default() -> Self {
        Self {
            since_seconds: default_since_seconds(),
            tail_lines: default_tail_lines(),
        }
    }
}
