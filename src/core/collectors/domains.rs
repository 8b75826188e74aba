use std::{path::Path, sync::Arc};

use tokio::{fs::File, io::AsyncReadExt};
use tracing::{debug, warn};

use super::{error::CollectorError, traits::DataProducer, types::CollectorResult};
use crate::config::metrics::MetricsConfig;

/// Counts domains in the domain registry file (`/etc/userdomains`).
///
/// The file has one line per domain plus one header line, so the count is the
/// number of lines minus one. An unreadable file counts as zero domains.
pub struct DomainCollector {
    config: Arc<MetricsConfig>,
}

impl DomainCollector {
    pub fn new(config: Arc<MetricsConfig>) -> Self {
        Self { config }
    }
}

#[async_trait::async_trait]
impl DataProducer for DomainCollector {
    type Output = u64;

    fn name(&self) -> &'static str {
        "domains"
    }

    async fn produce(&self) -> CollectorResult<Self::Output> {
        let path = &self.config.sources.domains_file;
        let domains = match count_lines(path).await {
            // The first line is the `*: nobody` header, not a domain
            Ok(lines) => lines.saturating_sub(1),
            Err(e) => {
                warn!("{}, counting zero domains", e);
                0
            }
        };

        debug!("Domains: {}", domains);
        Ok(domains)
    }
}

/// Counts lines, including a final line with no trailing newline.
///
/// `/etc/userdomains` looks like:
///
/// ```text
/// *: nobody
/// alice.example: alice
/// bob.example: bob
/// ```
///
/// Only line breaks are counted; the contents of each line are not parsed.
async fn count_lines(path: &Path) -> CollectorResult<u64> {
    let mut file = File::open(path)
        .await
        .map_err(|source| CollectorError::file(path, source))?;

    let mut buf = vec![0u8; 64 * 1024];
    let mut lines = 0u64;
    let mut last = None;

    loop {
        let n = file
            .read(&mut buf)
            .await
            .map_err(|source| CollectorError::file(path, source))?;
        if n == 0 {
            break;
        }
        lines += memchr::memchr_iter(b'\n', &buf[..n]).count() as u64;
        // Remember how the data ends to spot an unterminated last line
        last = Some(buf[n - 1]);
    }

    // `a\nb` holds two lines but only one newline
    if matches!(last, Some(b) if b != b'\n') {
        lines += 1;
    }
    Ok(lines)
}
