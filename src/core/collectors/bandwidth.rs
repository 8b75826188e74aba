use std::{path::Path, sync::Arc};

use tokio::{
    fs::File,
    io::{AsyncBufReadExt, BufReader},
};
use tracing::{debug, trace};

use super::{
    error::CollectorError,
    scanner::list_regular_files_or_empty,
    traits::DataProducer,
    types::{BandwidthMap, CollectorResult},
};
use crate::config::metrics::MetricsConfig;

/// Reads the cached bandwidth usage of every non-blacklisted account.
///
/// Each file in the bandwidth cache holds one integer on its first line.
/// Accounts whose file cannot be read or parsed are left out of the map
/// rather than reported as zero.
pub struct BandwidthCollector {
    config: Arc<MetricsConfig>,
}

impl BandwidthCollector {
    pub fn new(config: Arc<MetricsConfig>) -> Self {
        Self { config }
    }
}

#[async_trait::async_trait]
impl DataProducer for BandwidthCollector {
    type Output = BandwidthMap;

    fn name(&self) -> &'static str {
        "bandwidth"
    }

    async fn produce(&self) -> CollectorResult<Self::Output> {
        let dir = &self.config.sources.bandwidth_dir;
        let mut usage = BandwidthMap::new();

        for account in list_regular_files_or_empty(dir).await {
            if self.config.is_blacklisted(&account) {
                continue;
            }
            // A bad file drops only that account from the map
            match read_usage(&dir.join(&account)).await {
                Ok(value) => {
                    usage.insert(account, value);
                }
                Err(e) => trace!("Skipping bandwidth for {}: {}", account, e),
            }
        }

        debug!("Bandwidth: {} accounts", usage.len());
        Ok(usage)
    }
}

/// Reads one cache file, named after the account it belongs to.
///
/// Format: the first line is the usage as a signed integer, e.g. `12345\n`.
/// Anything after the first line is ignored.
async fn read_usage(path: &Path) -> CollectorResult<i64> {
    let file = File::open(path)
        .await
        .map_err(|source| CollectorError::file(path, source))?;

    // Only the first line is pulled in, however large the file is
    let mut line = String::new();
    BufReader::new(file)
        .read_line(&mut line)
        .await
        .map_err(|source| CollectorError::file(path, source))?;

    // Surrounding whitespace and the line ending are dropped before parsing.
    // An empty file leaves `line` empty and fails here as well
    line.trim()
        .parse::<i64>()
        .map_err(|e| CollectorError::ParseError {
            metric: "bandwidth".to_string(),
            location: path.display().to_string(),
            reason: e.to_string(),
        })
}
