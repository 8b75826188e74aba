use std::{path::PathBuf, process, sync::Arc};

use clap::Parser;
use cpanel_metrics::{
    config::{metrics::OutputFormat, Config},
    core::{
        executor::Executor,
        plugin::{CpanelPlugin, Plugin},
        sink::{JsonLinesSink, Sink, TracingSink},
    },
    logger::LoggerManager,
    print_error,
};
use tokio::time::Duration;
use tracing::{debug, error, info};

/// Collects cPanel account metrics and dispatches them on a fixed interval.
#[derive(Parser, Debug)]
#[command(name = "cpanel-metrics")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Poll once and exit instead of polling forever.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let cfg = Config::new(cli.config.as_deref()).unwrap_or_else(|e| {
        print_error!("{}", e);
        process::exit(1);
    });

    let logger_manager = LoggerManager::new(cfg.logger.clone()).unwrap_or_else(|e| {
        print_error!("Failed to setup Log Manager: {}", e);
        process::exit(1);
    });
    logger_manager.init().unwrap_or_else(|e| {
        print_error!("Failed to init Log Manager: {}", e);
        process::exit(1);
    });

    info!(
        "Starting cpanel-metrics version {}...",
        env!("CARGO_PKG_VERSION")
    );
    info!("Log level: {}", cfg.logger.level);
    debug!("{:#?}", cfg.metrics);

    let plugin = Arc::new(CpanelPlugin::new(cfg.metrics.clone()));
    if let Err(e) = plugin.init().await {
        error!("Plugin init failed: {}", e);
        process::exit(1);
    }

    let sink: Arc<dyn Sink> = match cfg.metrics.output {
        OutputFormat::Log => Arc::new(TracingSink),
        OutputFormat::Json => Arc::new(JsonLinesSink),
    };
    let executor = Executor::new(
        plugin.clone(),
        sink,
        Duration::from_secs(cfg.metrics.interval),
    );

    if cli.once {
        if let Err(e) = executor.poll_once().await {
            error!("Read failed: {}", e);
        }
    } else {
        tokio::select! {
            _ = executor.run() => {
                error!("Executor unexpectedly finished");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }

    if let Err(e) = plugin.shutdown().await {
        error!("Plugin shutdown failed: {}", e);
    }
    info!("Shutdown complete");
}
