//! Standalone plugin host.
//!
//! The `Executor` drives a [`Plugin`] the way a metrics daemon would: it
//! polls `read` on a fixed interval, forwards every dispatched record to the
//! configured sink, and echoes those records back through the plugin's
//! `write` and `notification` callbacks.

use std::sync::Arc;

use tokio::time::{sleep, Duration, Instant};
use tracing::{error, info, trace, warn};

use super::{
    plugin::{Plugin, PluginError},
    sink::{Notification, Sink, SinkError, ValueList},
};

/// Sink handed to the plugin during a poll. Delivers to the real sink, then
/// tells the plugin what went through, whether delivery succeeded or not.
struct HostSink<'a> {
    inner: &'a dyn Sink,
    plugin: &'a dyn Plugin,
}

#[async_trait::async_trait]
impl<'a> Sink for HostSink<'a> {
    async fn dispatch(&self, values: &ValueList) -> Result<(), SinkError> {
        let result = self.inner.dispatch(values).await;
        self.plugin.write(values);
        result
    }

    async fn notify(&self, notification: &Notification) -> Result<(), SinkError> {
        let result = self.inner.notify(notification).await;
        self.plugin.notification(notification);
        result
    }
}

/// Executor that polls a plugin on a fixed interval.
pub struct Executor {
    plugin: Arc<dyn Plugin>,
    sink: Arc<dyn Sink>,
    interval: Duration,
}

impl Executor {
    /// Creates a new Executor instance.
    ///
    /// # Arguments
    /// * `plugin` - Plugin to drive; already configured and initialised
    /// * `sink` - Destination for every dispatched record
    /// * `interval` - Time between the starts of two polls
    pub fn new(plugin: Arc<dyn Plugin>, sink: Arc<dyn Sink>, interval: Duration) -> Self {
        Self {
            plugin,
            sink,
            interval,
        }
    }

    /// Runs a single poll to completion.
    pub async fn poll_once(&self) -> Result<(), PluginError> {
        let host = HostSink {
            inner: self.sink.as_ref(),
            plugin: self.plugin.as_ref(),
        };
        self.plugin.read(&host).await
    }

    /// Polls immediately, then once per interval, forever.
    ///
    /// A poll that overruns the interval delays the next one; polls never
    /// overlap.
    pub async fn run(self) -> ! {
        info!(
            "Metrics collection started for '{}' (interval: {}s)",
            self.plugin.name(),
            self.interval.as_secs()
        );

        loop {
            let start = Instant::now();

            if let Err(e) = self.poll_once().await {
                error!("Read failed for '{}': {}", self.plugin.name(), e);
            }

            let elapsed = start.elapsed();
            trace!("Poll took {:?}", elapsed);
            if elapsed < self.interval {
                sleep(self.interval - elapsed).await;
            } else {
                warn!(
                    "Poll took {:?}, longer than the {:?} interval",
                    elapsed, self.interval
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tokio::time::{sleep, Duration};
    use tracing::Instrument;
    use tracing_test::traced_test;

    use super::*;
    use crate::{
        config::metrics::MetricsConfig,
        core::{
            plugin::{ConfigOption, CpanelPlugin},
            sink::{MetricKind, Severity},
        },
    };

    #[derive(Default)]
    struct MockSink {
        publish_count: Mutex<usize>,
        notify_count: Mutex<usize>,
    }

    #[async_trait::async_trait]
    impl Sink for MockSink {
        async fn dispatch(&self, _values: &ValueList) -> Result<(), SinkError> {
            *self.publish_count.lock().unwrap() += 1;
            Ok(())
        }

        async fn notify(&self, _notification: &Notification) -> Result<(), SinkError> {
            *self.notify_count.lock().unwrap() += 1;
            Ok(())
        }
    }

    impl MockSink {
        fn publish_count(&self) -> usize {
            *self.publish_count.lock().unwrap()
        }
    }

    struct DummyPlugin {
        reads: Mutex<usize>,
        writes: Mutex<usize>,
    }

    #[async_trait::async_trait]
    impl Plugin for DummyPlugin {
        fn name(&self) -> &'static str {
            "dummy"
        }

        fn configure(&mut self, _options: &[ConfigOption]) -> Result<(), PluginError> {
            Ok(())
        }

        async fn init(&self) -> Result<(), PluginError> {
            Ok(())
        }

        async fn read(&self, sink: &dyn Sink) -> Result<(), PluginError> {
            *self.reads.lock().unwrap() += 1;
            let _ = sink
                .dispatch(&ValueList::new("dummy", "value", MetricKind::Gauge, 42.0))
                .await;
            Ok(())
        }

        async fn shutdown(&self) -> Result<(), PluginError> {
            Ok(())
        }

        fn write(&self, _values: &ValueList) {
            *self.writes.lock().unwrap() += 1;
        }

        fn notification(&self, _notification: &Notification) {}

        fn log(&self, _severity: Severity, _message: &str) {}
    }

    fn dummy() -> Arc<DummyPlugin> {
        Arc::new(DummyPlugin {
            reads: Mutex::new(0),
            writes: Mutex::new(0),
        })
    }

    #[tokio::test]
    async fn poll_once_echoes_values_back_to_plugin() {
        let plugin = dummy();
        let sink = Arc::new(MockSink::default());
        let executor = Executor::new(plugin.clone(), sink.clone(), Duration::from_secs(1));

        executor.poll_once().await.unwrap();

        assert_eq!(sink.publish_count(), 1);
        assert_eq!(*plugin.writes.lock().unwrap(), 1);
    }

    #[tokio::test]
    #[traced_test]
    async fn executor_polls_immediately_and_repeatedly() {
        let plugin = dummy();
        let sink = Arc::new(MockSink::default());
        let executor = Executor::new(plugin.clone(), sink.clone(), Duration::from_millis(100));

        let handle = tokio::spawn(
            async move {
                executor.run().await;
            }
            .in_current_span(),
        );

        sleep(Duration::from_millis(350)).await;
        handle.abort();

        assert!(*plugin.reads.lock().unwrap() >= 2);
        assert!(logs_contain("Metrics collection started for 'dummy'"));
    }

    #[tokio::test]
    async fn cpanel_plugin_counts_its_own_values_through_the_host() {
        let root = tempfile::tempdir().unwrap();
        let mut config = MetricsConfig::default();
        config.sources.accounts_dir = root.path().join("users");
        config.sources.bandwidth_dir = root.path().join("bandwidth.cache");
        config.sources.domains_file = root.path().join("userdomains");
        config.sources.version_command = vec!["/nonexistent/cpanel".into()];

        let plugin = Arc::new(CpanelPlugin::new(config));
        let sink = Arc::new(MockSink::default());
        let executor = Executor::new(plugin.clone(), sink.clone(), Duration::from_secs(10));

        executor.poll_once().await.unwrap();

        // 4 scalar gauges + version + 2 counters, no plans or bandwidth.
        assert_eq!(sink.publish_count(), 7);
        assert_eq!(plugin.state().datapoints(), 7);
        assert_eq!(plugin.state().notifications(), 1);
        assert_eq!(*sink.notify_count.lock().unwrap(), 1);

        executor.poll_once().await.unwrap();
        assert_eq!(plugin.state().datapoints(), 14);
        assert_eq!(plugin.state().notifications(), 1);
    }
}
