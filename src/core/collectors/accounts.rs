use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, trace};

use super::{
    records::{matches_marker, SUSPENDED_MARKER},
    scanner::list_regular_files_or_empty,
    traits::DataProducer,
    types::CollectorResult,
};
use crate::config::metrics::MetricsConfig;

/// Account counts by suspension state. Blacklisted accounts are in
/// neither count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccountClassification {
    /// Accounts without the suspension marker, including unreadable ones.
    pub active: u64,
    /// Accounts whose file contains `SUSPENDED=1`.
    pub suspended: u64,
}

impl AccountClassification {
    pub fn active_count(&self) -> u64 {
        self.active
    }

    pub fn suspended_count(&self) -> u64 {
        self.suspended
    }

    /// Always `active_count() + suspended_count()`.
    pub fn total_count(&self) -> u64 {
        self.active_count() + self.suspended_count()
    }
}

/// Classifies every account file in the accounts directory as active or
/// suspended.
///
/// A file that cannot be read never matches the marker and is therefore
/// counted as active.
pub struct AccountCollector {
    config: Arc<MetricsConfig>,
}

impl AccountCollector {
    pub fn new(config: Arc<MetricsConfig>) -> Self {
        Self { config }
    }
}

#[async_trait::async_trait]
impl DataProducer for AccountCollector {
    type Output = AccountClassification;

    fn name(&self) -> &'static str {
        "accounts"
    }

    async fn produce(&self) -> CollectorResult<Self::Output> {
        let dir = &self.config.sources.accounts_dir;
        let mut out = AccountClassification::default();

        for account in list_regular_files_or_empty(dir).await {
            if self.config.is_blacklisted(&account) {
                continue;
            }
            if matches_marker(&dir.join(&account), SUSPENDED_MARKER, false).await {
                trace!("{} is suspended", account);
                out.suspended += 1;
            } else {
                out.active += 1;
            }
        }

        debug!("Accounts: {} active, {} suspended", out.active, out.suspended);
        Ok(out)
    }
}
