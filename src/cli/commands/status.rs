//! `cadence status` — connection pool and circuit breaker status.

use anyhow::Result;
use clap::Args;
use comfy_table::{presets::UTF8_FULL, Table};
use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::cli::App;
use crate::infrastructure::http::PoolStats;

use super::load_config;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Probe the Notion API with a live health check
    #[arg(long)]
    pub probe: bool,
}

#[derive(Debug, Serialize)]
pub struct PoolStatusOutput {
    pub service: String,
    pub base_url: String,
    pub circuit_state: String,
    pub requests: u64,
    pub failures: u64,
    pub retries: u64,
    pub rejected: u64,
}

impl From<&PoolStats> for PoolStatusOutput {
    fn from(stats: &PoolStats) -> Self {
        Self {
            service: stats.service.clone(),
            base_url: stats.base_url.clone(),
            circuit_state: stats.circuit.state.as_str().to_string(),
            requests: stats.metrics.requests,
            failures: stats.metrics.failures,
            retries: stats.metrics.retries,
            rejected: stats.circuit.metrics.rejected,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusOutput {
    pub pools: Vec<PoolStatusOutput>,
    pub notion_healthy: Option<bool>,
}

impl CommandOutput for StatusOutput {
    fn to_human(&self) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec![
            "Service", "Circuit", "Requests", "Failures", "Retries", "Rejected",
        ]);
        for pool in &self.pools {
            table.add_row(vec![
                pool.service.clone(),
                pool.circuit_state.clone(),
                pool.requests.to_string(),
                pool.failures.to_string(),
                pool.retries.to_string(),
                pool.rejected.to_string(),
            ]);
        }
        let mut text = table.to_string();
        if let Some(healthy) = self.notion_healthy {
            let mark = if healthy {
                console::style("healthy").green().to_string()
            } else {
                console::style("unreachable").red().to_string()
            };
            text.push_str(&format!("\nNotion API: {mark}"));
        }
        text
    }
}

pub async fn execute(
    args: StatusArgs,
    config_dir: Option<std::path::PathBuf>,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let config = load_config(config_dir.as_deref())?;
    let app = App::build(config, dry_run).await?;

    let notion_healthy = if args.probe {
        match &app.notion {
            Some(client) => Some(client.check_health().await),
            None => None,
        }
    } else {
        None
    };

    let stats = app.registry.stats().await;
    output(
        &StatusOutput {
            pools: stats.iter().map(PoolStatusOutput::from).collect(),
            notion_healthy,
        },
        json,
    );
    Ok(())
}
