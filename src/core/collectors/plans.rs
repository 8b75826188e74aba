use std::sync::Arc;

use tracing::debug;

use super::{
    records::{extract_field, PLAN_KEY},
    scanner::list_regular_files_or_empty,
    traits::DataProducer,
    types::{CollectorResult, PlanTally},
};
use crate::config::metrics::MetricsConfig;

/// Counts accounts per subscription plan from the `PLAN=` line of each
/// account file.
///
/// Unlike the account classifier this does not consult the blacklist, so a
/// blacklisted account that carries a plan is still tallied.
pub struct PlanCollector {
    config: Arc<MetricsConfig>,
}

impl PlanCollector {
    pub fn new(config: Arc<MetricsConfig>) -> Self {
        Self { config }
    }
}

#[async_trait::async_trait]
impl DataProducer for PlanCollector {
    type Output = PlanTally;

    fn name(&self) -> &'static str {
        "plans"
    }

    async fn produce(&self) -> CollectorResult<Self::Output> {
        let dir = &self.config.sources.accounts_dir;
        let mut tally = PlanTally::new();

        for account in list_regular_files_or_empty(dir).await {
            if let Some(plan) = extract_field(&dir.join(&account), PLAN_KEY).await {
                *tally.entry(plan).or_insert(0) += 1;
            }
        }

        debug!("Plans: {} distinct", tally.len());
        Ok(tally)
    }
}
