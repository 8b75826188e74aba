//! Dispatch records and the sinks that receive them.
//!
//! The plugin never waits for delivery confirmation: a sink error is logged
//! by the caller and otherwise ignored.

use std::io::Write;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Kind of a dispatched value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Gauge,
    Counter,
}

/// One dispatched measurement: (plugin, plugin instance, type, type instance, values).
///
/// The plugin instance carries the dimension (plan name, account name,
/// version string) when there is one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueList {
    pub plugin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin_instance: Option<String>,
    #[serde(rename = "type")]
    pub kind: MetricKind,
    pub type_instance: String,
    pub values: Vec<f64>,
}

impl ValueList {
    pub fn new(plugin: &str, type_instance: &str, kind: MetricKind, value: f64) -> Self {
        Self {
            plugin: plugin.to_string(),
            plugin_instance: None,
            kind,
            type_instance: type_instance.to_string(),
            values: vec![value],
        }
    }

    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.plugin_instance = Some(instance.into());
        self
    }
}

/// Notification severity, numbered as the host numbers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Failure = 1,
    Warning = 2,
    Okay = 4,
}

/// A host notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub plugin: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub type_instance: String,
    pub severity: Severity,
    pub message: String,
}

/// Errors a sink may report back. Callers only log them.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write record: {0}")]
    Io(#[from] std::io::Error),

    #[error("Sink rejected record: {0}")]
    Rejected(String),
}

/// Destination for dispatched values and notifications.
#[async_trait::async_trait]
pub trait Sink: Send + Sync {
    async fn dispatch(&self, values: &ValueList) -> Result<(), SinkError>;

    async fn notify(&self, notification: &Notification) -> Result<(), SinkError>;
}

/// Logs every record through `tracing` at info level.
#[derive(Debug, Default)]
pub struct TracingSink;

#[async_trait::async_trait]
impl Sink for TracingSink {
    async fn dispatch(&self, values: &ValueList) -> Result<(), SinkError> {
        info!(
            plugin = %values.plugin,
            instance = values.plugin_instance.as_deref().unwrap_or(""),
            kind = ?values.kind,
            "{} = {:?}",
            values.type_instance,
            values.values
        );
        Ok(())
    }

    async fn notify(&self, notification: &Notification) -> Result<(), SinkError> {
        info!(
            plugin = %notification.plugin,
            severity = ?notification.severity,
            "{}",
            notification.message
        );
        Ok(())
    }
}

/// Writes every record as one JSON object per line on stdout.
#[derive(Debug, Default)]
pub struct JsonLinesSink;

impl JsonLinesSink {
    fn write_line<T: Serialize>(record: &T) -> Result<(), SinkError> {
        let line = serde_json::to_string(record)?;
        let mut out = std::io::stdout().lock();
        writeln!(out, "{}", line)?;
        out.flush()?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Sink for JsonLinesSink {
    async fn dispatch(&self, values: &ValueList) -> Result<(), SinkError> {
        Self::write_line(values)
    }

    async fn notify(&self, notification: &Notification) -> Result<(), SinkError> {
        Self::write_line(notification)
    }
}
