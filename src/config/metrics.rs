//! Configuration structures for account metrics collection and dispatch.
//!
//! This module defines where account state is read from, which accounts are
//! excluded, how often the standalone host polls, and how emitted values are
//! written out.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Default account name excluded from every classification.
pub const DEFAULT_BLACKLISTED_ACCOUNT: &str = "system";

/// File-system locations and the external command the collectors read from.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SourcesConfig {
    /// Directory holding one `KEY=value` file per account.
    pub accounts_dir: PathBuf,

    /// Directory holding one single-integer file per account.
    pub bandwidth_dir: PathBuf,

    /// Flat file with one header line followed by one line per domain.
    pub domains_file: PathBuf,

    /// Program and arguments that print the control panel version.
    #[validate(length(min = 1, message = "version_command must name a program"))]
    pub version_command: Vec<String>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            accounts_dir: PathBuf::from("/var/cpanel/users"),
            bandwidth_dir: PathBuf::from("/var/cpanel/bandwidth.cache"),
            domains_file: PathBuf::from("/etc/userdomains"),
            version_command: vec!["/usr/local/cpanel/cpanel".into(), "-V".into()],
        }
    }
}

/// How dispatched values are written by the standalone host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OutputFormat {
    /// One `info` log line per value.
    #[serde(rename = "log")]
    #[default]
    Log,
    /// One JSON object per line on stdout.
    #[serde(rename = "json")]
    Json,
}

/// Top-level metrics configuration container.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct MetricsConfig {
    /// Where account state lives.
    #[validate(nested)]
    pub sources: SourcesConfig,

    /// Account names left out of the active/suspended counts and bandwidth.
    pub blacklist: Vec<String>,

    /// Advisory frequency. Only used to name the plugin instance; it does not
    /// change the poll interval.
    #[validate(custom(function = "validate_frequency"))]
    pub frequency: f64,

    /// Seconds between polls in the standalone host.
    #[validate(range(min = 1, message = "Poll interval must be at least 1 second"))]
    pub interval: u64,

    /// Dispatch a one-off "started" notification on the first poll.
    pub notify_on_start: bool,

    /// Output used by the standalone host.
    pub output: OutputFormat,
}

fn validate_frequency(frequency: f64) -> Result<(), ValidationError> {
    if frequency.is_finite() {
        Ok(())
    } else {
        let mut err = ValidationError::new("invalid_frequency");
        err.message = Some("Frequency must be a finite number".into());
        Err(err)
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            sources: SourcesConfig::default(),
            blacklist: vec![DEFAULT_BLACKLISTED_ACCOUNT.to_string()],
            frequency: 1.0,
            interval: 10,
            notify_on_start: true,
            output: OutputFormat::default(),
        }
    }
}

impl MetricsConfig {
    /// Whether `account` is excluded from reporting.
    pub fn is_blacklisted(&self, account: &str) -> bool {
        self.blacklist.iter().any(|name| name == account)
    }
}
