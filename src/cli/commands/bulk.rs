//! `cadence bulk` — process a batch of contact triggers.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use comfy_table::{presets::UTF8_FULL, Table};
use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::cli::App;
use crate::domain::models::ContactTrigger;
use crate::services::BulkMode;

use super::{load_config, read_json};

#[derive(Args, Debug)]
pub struct BulkArgs {
    /// JSON file with an array of contact triggers (`-` for stdin)
    pub file: PathBuf,

    /// Process triggers one at a time instead of concurrently
    #[arg(long)]
    pub sequential: bool,
}

#[derive(Debug, Serialize)]
pub struct BulkSlotOutput {
    pub index: usize,
    pub contact_id: String,
    pub status: String,
    pub workflows: Vec<String>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BulkOutput {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<BulkSlotOutput>,
}

impl CommandOutput for BulkOutput {
    fn to_human(&self) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec!["#", "Contact", "Status", "Workflows", "Error"]);
        for slot in &self.results {
            table.add_row(vec![
                slot.index.to_string(),
                slot.contact_id.clone(),
                slot.status.clone(),
                slot.workflows.join(", "),
                slot.error.clone().unwrap_or_default(),
            ]);
        }
        format!(
            "{table}\n{} processed, {} succeeded, {} failed",
            self.total, self.succeeded, self.failed
        )
    }
}

pub async fn execute(
    args: BulkArgs,
    config_dir: Option<std::path::PathBuf>,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let config = load_config(config_dir.as_deref())?;
    let triggers: Vec<ContactTrigger> = read_json(&args.file)?;

    let mode = if args.sequential {
        BulkMode::Sequential
    } else {
        BulkMode::Parallel
    };

    let app = App::build(config, dry_run).await?;
    let results = app.orchestrator.execute_bulk(&triggers, mode).await;

    let slots: Vec<BulkSlotOutput> = results
        .iter()
        .enumerate()
        .map(|(index, result)| match result {
            Ok(execution) => BulkSlotOutput {
                index,
                contact_id: execution.contact_id.clone(),
                status: format!("{:?}", execution.status).to_lowercase(),
                workflows: execution.workflows.clone(),
                error: None,
            },
            Err(err) => BulkSlotOutput {
                index,
                contact_id: triggers
                    .get(index)
                    .map(|t| t.contact_id.clone())
                    .unwrap_or_default(),
                status: "error".to_string(),
                workflows: Vec::new(),
                error: Some(err.to_string()),
            },
        })
        .collect();

    let failed = slots.iter().filter(|s| s.error.is_some()).count();
    output(
        &BulkOutput {
            total: slots.len(),
            succeeded: slots.len() - failed,
            failed,
            results: slots,
        },
        json,
    );
    Ok(())
}
