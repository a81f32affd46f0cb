//! Container log collection

use futures::future::join_all;
use std::sync::Arc;
use tracing::{instrument, warn};

use super::client::ResourceClient;
use super::error::ClusterError;
use crate::config::LogLimits;
use crate::models::ContainerStatusRecord;

/// Body rendered when a container has no logs to show
pub const LOG_PLACEHOLDER: &str = "-";

/// Outcome of the log fetch for one container
#[derive(Debug)]
enum LogFetch {
    Fetched(String),
    NotRunning(&'static str),
    Failed(ClusterError),
}

/// Fetches and formats logs for the containers of a pod
pub struct LogCollector {
    client: Arc<dyn ResourceClient>,
    limits: LogLimits,
}

impl LogCollector {
    pub fn new(client: Arc<dyn ResourceClient>, limits: LogLimits) -> Self {
        Self { client, limits }
    }

    /// Build a log report with one block per supplied container, in order
    ///
    /// Only running containers are fetched, concurrently. Containers that are
    /// not running, or whose fetch failed, get a placeholder block.
    #[instrument(skip(self, containers), fields(containers = containers.len()))]
    pub async fn get_container_logs(
        &self,
        pod_name: &str,
        containers: &[ContainerStatusRecord],
    ) -> String {
        let fetches = containers.iter().map(|container| async move {
            if !container.state.is_running() {
                return LogFetch::NotRunning(container.state.label());
            }
            match self
                .client
                .pod_logs(pod_name, &container.name, &self.limits)
                .await
            {
                Ok(body) => LogFetch::Fetched(body),
                Err(e) => {
                    warn!(container = %container.name, error = %e, "Log fetch failed");
                    metrics::increment_counter!("shipyard_log_fetch_failures_total");
                    LogFetch::Failed(e)
                }
            }
        });
        let results = join_all(fetches).await;

        containers
            .iter()
            .zip(results)
            .map(|(container, fetch)| self.render_block(&container.name, fetch))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn render_block(&self, container_name: &str, fetch: LogFetch) -> String {
        let body = match fetch {
            LogFetch::Fetched(body) if body.is_empty() => LOG_PLACEHOLDER.to_string(),
            LogFetch::Fetched(body) => body,
            LogFetch::NotRunning(state) => {
                format!("{} (container is {}, logs not fetched)", LOG_PLACEHOLDER, state)
            }
            LogFetch::Failed(e) => format!("{} (failed to fetch logs: {})", LOG_PLACEHOLDER, e),
        };

        format!(
            "Container {} logs (last {}, at most {} lines):\n{}",
            container_name,
            format_window(self.limits.since_seconds),
            self.limits.tail_lines,
            body
        )
    }
}

/// Render a retention window in the largest whole unit
pub fn format_window(seconds: i64) -> String {
    if seconds > 0 && seconds % 3600 == 0 {
        format!("{}h", seconds / 3600)
    } else if seconds > 0 && seconds % 60 == 0 {
        format!("{}m", seconds / 60)
    } else {
        format!("{}s", seconds)
    }
}
