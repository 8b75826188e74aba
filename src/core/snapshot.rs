//! Per-poll metric snapshot and the builder that assembles it.
//!
//! The builder fans out to every collector at once and waits for all of them
//! before assembling the snapshot. A collector that fails contributes its
//! empty value; the remaining collectors are unaffected.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use super::{
    collectors::{
        AccountCollector, BandwidthCollector, BandwidthMap, DataProducer, DomainCollector,
        PlanCollector, PlanTally, VersionCollector, UNKNOWN_VERSION,
    },
    sink::{MetricKind, ValueList},
    state::PluginState,
};
use crate::config::metrics::MetricsConfig;

/// Plugin name every value is dispatched under.
pub const PLUGIN_NAME: &str = "cpanel";

/// Everything one poll reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricSnapshot {
    pub active_users: u64,
    pub suspended_users: u64,
    /// Always `active_users + suspended_users`.
    pub total_users: u64,
    pub domains: u64,
    pub version: String,
    pub plans: PlanTally,
    pub bandwidth: BandwidthMap,
    /// Cumulative since process start.
    pub datapoints: u64,
    /// Cumulative since process start.
    pub notifications: u64,
}

impl MetricSnapshot {
    /// Flattens the snapshot into the values dispatched for one poll.
    ///
    /// Order: the four scalar gauges, plans by name, bandwidth by account,
    /// version, then the two counters.
    pub fn to_values(&self) -> Vec<ValueList> {
        let gauge =
            |name: &str, value: f64| ValueList::new(PLUGIN_NAME, name, MetricKind::Gauge, value);
        let counter = |name: &str, value: u64| {
            ValueList::new(PLUGIN_NAME, name, MetricKind::Counter, value as f64)
        };

        let mut values = Vec::with_capacity(7 + self.plans.len() + self.bandwidth.len());
        values.push(gauge("active_users", self.active_users as f64));
        values.push(gauge("suspended_users", self.suspended_users as f64));
        values.push(gauge("total_users", self.total_users as f64));
        values.push(gauge("domains", self.domains as f64));

        values.extend(
            self.plans
                .iter()
                .map(|(plan, count)| gauge("plans", *count as f64).with_instance(plan.clone())),
        );
        values.extend(self.bandwidth.iter().map(|(account, bytes)| {
            gauge("bandwidth", *bytes as f64).with_instance(account.clone())
        }));

        values.push(gauge("version", 1.0).with_instance(self.version.clone()));
        values.push(counter("datapoints", self.datapoints));
        values.push(counter("notifications", self.notifications));
        values
    }
}

/// Assembles a [`MetricSnapshot`] from every collector.
pub struct SnapshotBuilder {
    accounts: AccountCollector,
    plans: PlanCollector,
    bandwidth: BandwidthCollector,
    domains: DomainCollector,
    version: VersionCollector,
    state: Arc<PluginState>,
}

impl SnapshotBuilder {
    pub fn new(config: Arc<MetricsConfig>, state: Arc<PluginState>) -> Self {
        Self {
            accounts: AccountCollector::new(config.clone()),
            plans: PlanCollector::new(config.clone()),
            bandwidth: BandwidthCollector::new(config.clone()),
            domains: DomainCollector::new(config.clone()),
            version: VersionCollector::new(config),
            state,
        }
    }

    /// Runs one collection cycle. Never fails; see the module docs.
    pub async fn build(&self) -> MetricSnapshot {
        let (accounts, plans, bandwidth, domains, version) = tokio::join!(
            collect_or_default(&self.accounts),
            collect_or_default(&self.plans),
            collect_or_default(&self.bandwidth),
            collect_or_default(&self.domains),
            collect_or_default(&self.version),
        );

        let snapshot = MetricSnapshot {
            active_users: accounts.active_count(),
            suspended_users: accounts.suspended_count(),
            total_users: accounts.total_count(),
            domains,
            version: if version.is_empty() {
                UNKNOWN_VERSION.to_string()
            } else {
                version
            },
            plans,
            bandwidth,
            datapoints: self.state.datapoints(),
            notifications: self.state.notifications(),
        };

        debug!(
            "Snapshot: {} users ({} active, {} suspended), {} domains, version {}",
            snapshot.total_users,
            snapshot.active_users,
            snapshot.suspended_users,
            snapshot.domains,
            snapshot.version
        );
        snapshot
    }
}

async fn collect_or_default<P: DataProducer>(producer: &P) -> P::Output {
    match producer.produce().await {
        Ok(output) => output,
        Err(e) => {
            warn!("Failed to collect from '{}': {}", producer.name(), e);
            P::Output::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::{tempdir, TempDir};
    use tracing_test::traced_test;

    use super::*;
    use crate::core::collectors::{CollectorError, CollectorResult};

    fn config_in(root: &TempDir) -> MetricsConfig {
        let mut config = MetricsConfig::default();
        config.sources.accounts_dir = root.path().join("users");
        config.sources.bandwidth_dir = root.path().join("bandwidth.cache");
        config.sources.domains_file = root.path().join("userdomains");
        config.sources.version_command = vec!["sh".into(), "-c".into(), "echo 11.110.0.4".into()];
        config
    }

    fn populate(root: &TempDir) {
        let users = root.path().join("users");
        fs::create_dir(&users).unwrap();
        fs::write(users.join("alice"), "DNS=alice.example\nPLAN=silver\n").unwrap();
        fs::write(users.join("bob"), "SUSPENDED=1\nPLAN=gold\n").unwrap();
        fs::write(users.join("system"), "SUSPENDED=1\n").unwrap();

        let bandwidth = root.path().join("bandwidth.cache");
        fs::create_dir(&bandwidth).unwrap();
        fs::write(bandwidth.join("alice"), "12345\n").unwrap();
        fs::write(bandwidth.join("bob"), "abc").unwrap();
        fs::write(bandwidth.join("system"), "999\n").unwrap();

        fs::write(
            root.path().join("userdomains"),
            "*: nobody\nalice.example: alice\nbob.example: bob\n",
        )
        .unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn builds_snapshot_from_account_state() {
        let root = tempdir().unwrap();
        populate(&root);
        let state = Arc::new(PluginState::new());
        state.record_datapoints(5);
        state.record_notification();

        let builder = SnapshotBuilder::new(Arc::new(config_in(&root)), state);
        let snapshot = builder.build().await;

        assert_eq!(snapshot.active_users, 1);
        assert_eq!(snapshot.suspended_users, 1);
        assert_eq!(snapshot.total_users, 2);
        assert_eq!(snapshot.domains, 2);
        assert_eq!(snapshot.version, "11.110.0.4");
        assert_eq!(
            snapshot.plans,
            PlanTally::from([("gold".to_string(), 1), ("silver".to_string(), 1)])
        );
        assert_eq!(
            snapshot.bandwidth,
            BandwidthMap::from([("alice".to_string(), 12345)])
        );
        assert_eq!(snapshot.datapoints, 5);
        assert_eq!(snapshot.notifications, 1);
    }

    #[tokio::test]
    async fn missing_sources_still_produce_a_snapshot() {
        let root = tempdir().unwrap();
        let mut config = config_in(&root);
        config.sources.version_command = vec!["/nonexistent/cpanel".into()];

        let builder = SnapshotBuilder::new(Arc::new(config), Arc::new(PluginState::new()));
        let snapshot = builder.build().await;

        assert_eq!(
            snapshot,
            MetricSnapshot {
                version: UNKNOWN_VERSION.to_string(),
                ..Default::default()
            }
        );
    }

    #[tokio::test]
    async fn counters_are_read_not_changed() {
        let root = tempdir().unwrap();
        let state = Arc::new(PluginState::new());
        state.record_datapoints(3);
        let builder = SnapshotBuilder::new(Arc::new(config_in(&root)), state.clone());

        builder.build().await;
        builder.build().await;

        assert_eq!(state.datapoints(), 3);
        assert_eq!(state.notifications(), 0);
    }

    struct BrokenProducer;

    #[async_trait::async_trait]
    impl DataProducer for BrokenProducer {
        type Output = u64;

        fn name(&self) -> &'static str {
            "broken"
        }

        async fn produce(&self) -> CollectorResult<u64> {
            Err(CollectorError::Other("disk on fire".into()))
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn failing_collector_contributes_default() {
        assert_eq!(collect_or_default(&BrokenProducer).await, 0);
        assert!(logs_contain("Failed to collect from 'broken'"));
    }

    #[test]
    fn values_follow_dispatch_layout() {
        let snapshot = MetricSnapshot {
            active_users: 1,
            suspended_users: 1,
            total_users: 2,
            domains: 4,
            version: "11.110.0.4".into(),
            plans: PlanTally::from([("silver".to_string(), 1), ("gold".to_string(), 1)]),
            bandwidth: BandwidthMap::from([("alice".to_string(), 12345)]),
            datapoints: 9,
            notifications: 2,
        };

        let values = snapshot.to_values();
        let names: Vec<_> = values.iter().map(|v| v.type_instance.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "active_users",
                "suspended_users",
                "total_users",
                "domains",
                "plans",
                "plans",
                "bandwidth",
                "version",
                "datapoints",
                "notifications",
            ]
        );

        assert_eq!(values[4].plugin_instance.as_deref(), Some("gold"));
        assert_eq!(values[5].plugin_instance.as_deref(), Some("silver"));
        assert_eq!(values[6].plugin_instance.as_deref(), Some("alice"));
        assert_eq!(values[6].values, vec![12345.0]);
        assert_eq!(values[7].plugin_instance.as_deref(), Some("11.110.0.4"));
        assert_eq!(values[7].values, vec![1.0]);
        assert_eq!(values[8].kind, MetricKind::Counter);
        assert_eq!(values[8].values, vec![9.0]);
        assert!(values.iter().all(|v| v.plugin == PLUGIN_NAME));
    }
}
