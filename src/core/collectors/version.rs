use std::sync::Arc;

use tokio::process::Command;
use tracing::{debug, warn};

use super::{error::CollectorError, traits::DataProducer, types::CollectorResult};
use crate::config::metrics::MetricsConfig;

/// Reported when the version command fails or writes to stderr.
pub const UNKNOWN_VERSION: &str = "Unknown";

/// Asks the control panel for its version by running the configured command.
///
/// The first non-blank line of the command's stdout, trimmed, is the version
/// as long as nothing was written to stderr. Anything else, including a launch failure, yields
/// [`UNKNOWN_VERSION`]. The exit status is not consulted.
pub struct VersionCollector {
    config: Arc<MetricsConfig>,
}

impl VersionCollector {
    pub fn new(config: Arc<MetricsConfig>) -> Self {
        Self { config }
    }

    async fn run(&self) -> CollectorResult<String> {
        let (program, args) = self
            .config
            .sources
            .version_command
            .split_first()
            .ok_or_else(|| CollectorError::Other("empty version command".to_string()))?;

        let output = Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| CollectorError::CommandExecution {
                command: program.clone(),
                source,
            })?;

        if !output.stderr.is_empty() {
            debug!(
                "'{}' wrote to stderr: {}",
                program,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Ok(UNKNOWN_VERSION.to_string());
        }

        // `cpanel -V` prints e.g. `11.110.0 (build 4)`. Only the first
        // non-blank line is kept so trailing banners never reach the label.
        let stdout = String::from_utf8_lossy(&output.stdout);
        let version = stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or(UNKNOWN_VERSION);
        Ok(version.to_string())
    }
}

#[async_trait::async_trait]
impl DataProducer for VersionCollector {
    type Output = String;

    fn name(&self) -> &'static str {
        "version"
    }

    async fn produce(&self) -> CollectorResult<Self::Output> {
        match self.run().await {
            Ok(version) => Ok(version),
            Err(e) => {
                warn!("Version lookup failed: {}", e);
                Ok(UNKNOWN_VERSION.to_string())
            }
        }
    }
}
