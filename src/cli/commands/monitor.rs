//! `cadence monitor` — run the contact-change monitor until interrupted.

use anyhow::{bail, Result};
use clap::Args;

use crate::cli::App;
use crate::services::ContactMonitor;

use super::load_config;

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Override the configured poll interval, in seconds
    #[arg(long)]
    pub poll_interval: Option<u64>,
}

pub async fn execute(
    args: MonitorArgs,
    config_dir: Option<std::path::PathBuf>,
    dry_run: bool,
    _json: bool,
) -> Result<()> {
    let mut config = load_config(config_dir.as_deref())?;
    if let Some(interval) = args.poll_interval {
        config.monitor.poll_interval_secs = interval;
    }
    if !config.monitor.enabled {
        bail!("monitor is disabled in configuration (monitor.enabled = false)");
    }

    let app = App::build(config, dry_run).await?;
    let monitor = ContactMonitor::new(
        app.contact_source.clone(),
        app.orchestrator.clone(),
        app.config.monitor.clone(),
    );
    let handle = monitor.spawn();

    tokio::signal::ctrl_c().await?;
    tracing::info!("Interrupt received, shutting down monitor");
    handle.shutdown().await;
    app.registry.close_all().await;
    Ok(())
}
