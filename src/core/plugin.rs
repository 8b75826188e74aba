//! Host-facing plugin interface.
//!
//! A metrics host (the standalone [`Executor`](super::executor::Executor) or
//! any other scheduler) drives a [`Plugin`] through a fixed set of callbacks:
//! configure once, init, read on every tick, shutdown at exit. It also feeds
//! back every value and notification it sees through `write` and
//! `notification`, which is what the cumulative counters count.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};
use validator::Validate;

use super::{
    sink::{Notification, Severity, Sink, ValueList},
    snapshot::{SnapshotBuilder, PLUGIN_NAME},
    state::PluginState,
};
use crate::config::metrics::MetricsConfig;

/// Errors surfaced to the host from plugin callbacks.
#[derive(Debug, Error)]
pub enum PluginError {
    /// A configuration option had a value that could not be used.
    #[error("Invalid value {value:?} for option '{key}': {reason}")]
    InvalidOption {
        key: String,
        value: String,
        reason: String,
    },
}

/// One `Key value...` option handed over by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigOption {
    pub key: String,
    pub values: Vec<String>,
}

impl ConfigOption {
    pub fn new(key: impl Into<String>, values: &[&str]) -> Self {
        Self {
            key: key.into(),
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }
}

/// Callbacks a metrics host invokes on a plugin.
#[async_trait::async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &'static str;

    /// Applies host-provided options. Called before `init`.
    fn configure(&mut self, options: &[ConfigOption]) -> Result<(), PluginError>;

    async fn init(&self) -> Result<(), PluginError>;

    /// Collects once and dispatches every value to `sink`.
    async fn read(&self, sink: &dyn Sink) -> Result<(), PluginError>;

    async fn shutdown(&self) -> Result<(), PluginError>;

    /// A value list passed through the host's write chain.
    fn write(&self, values: &ValueList);

    /// A notification passed through the host.
    fn notification(&self, notification: &Notification);

    /// A host log message. Must not log in turn, or the host would loop.
    fn log(&self, severity: Severity, message: &str);
}

/// Plugin reporting cPanel account metrics.
pub struct CpanelPlugin {
    config: Arc<MetricsConfig>,
    state: Arc<PluginState>,
    builder: SnapshotBuilder,
}

impl CpanelPlugin {
    pub fn new(config: MetricsConfig) -> Self {
        Self::with_state(config, Arc::new(PluginState::new()))
    }

    pub fn with_state(config: MetricsConfig, state: Arc<PluginState>) -> Self {
        let config = Arc::new(config);
        let builder = SnapshotBuilder::new(config.clone(), state.clone());
        Self {
            config,
            state,
            builder,
        }
    }

    pub fn state(&self) -> &Arc<PluginState> {
        &self.state
    }

    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    /// Instance label derived from `Frequency`. The frequency has no other
    /// effect; in particular it does not change how often `read` runs.
    pub fn instance_name(&self) -> String {
        format!("{}[frequency={}]", PLUGIN_NAME, self.config.frequency)
    }

    fn startup_notification() -> Notification {
        Notification {
            plugin: PLUGIN_NAME.to_string(),
            kind: "objects".to_string(),
            type_instance: "started".to_string(),
            severity: Severity::Okay,
            message: format!("The {} plugin has just started", PLUGIN_NAME),
        }
    }
}

#[async_trait::async_trait]
impl Plugin for CpanelPlugin {
    fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    fn configure(&mut self, options: &[ConfigOption]) -> Result<(), PluginError> {
        let mut config = (*self.config).clone();

        for option in options {
            if option.key.eq_ignore_ascii_case("Frequency") {
                let raw = option.values.first().cloned().unwrap_or_default();
                let invalid = |reason: String| PluginError::InvalidOption {
                    key: option.key.clone(),
                    value: raw.clone(),
                    reason,
                };
                config.frequency = raw
                    .trim()
                    .parse::<f64>()
                    .map_err(|e| invalid(e.to_string()))?;
                // Same rules as a frequency read from the config file.
                config.validate().map_err(|e| invalid(e.to_string()))?;
            } else {
                warn!("Ignoring unknown option '{}'", option.key);
            }
        }

        self.config = Arc::new(config);
        self.builder = SnapshotBuilder::new(self.config.clone(), self.state.clone());
        Ok(())
    }

    async fn init(&self) -> Result<(), PluginError> {
        info!("Plugin {} initializing...", PLUGIN_NAME);
        debug!("Instance: {}", self.instance_name());
        Ok(())
    }

    async fn read(&self, sink: &dyn Sink) -> Result<(), PluginError> {
        let snapshot = self.builder.build().await;

        for values in snapshot.to_values() {
            if let Err(e) = sink.dispatch(&values).await {
                debug!("Dispatch of '{}' failed: {}", values.type_instance, e);
            }
        }

        if self.config.notify_on_start && self.state.claim_startup_notice() {
            if let Err(e) = sink.notify(&Self::startup_notification()).await {
                debug!("Startup notification failed: {}", e);
            }
        }
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), PluginError> {
        info!("Plugin {} shutting down...", PLUGIN_NAME);
        Ok(())
    }

    fn write(&self, values: &ValueList) {
        self.state.record_datapoints(values.values.len() as u64);
    }

    fn notification(&self, _notification: &Notification) {
        self.state.record_notification();
    }

    fn log(&self, _severity: Severity, _message: &str) {}
}
