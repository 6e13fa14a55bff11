//! `cadence trigger` — process one contact trigger.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::cli::App;
use crate::domain::models::{ContactTrigger, WorkflowExecution};

use super::{load_config, read_json};

#[derive(Args, Debug)]
pub struct TriggerArgs {
    /// JSON file with the contact trigger (`-` for stdin)
    pub file: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct ExecutionOutput {
    pub id: String,
    pub contact_id: String,
    pub contact_email: String,
    pub status: String,
    pub workflows: Vec<String>,
    pub actions_total: usize,
    pub actions_failed: usize,
    pub duration_ms: Option<i64>,
}

impl From<&WorkflowExecution> for ExecutionOutput {
    fn from(execution: &WorkflowExecution) -> Self {
        let outcomes: Vec<_> = execution
            .runs
            .iter()
            .flat_map(|r| r.outcomes.iter())
            .collect();
        Self {
            id: execution.id.to_string(),
            contact_id: execution.contact_id.clone(),
            contact_email: execution.contact_email.clone(),
            status: format!("{:?}", execution.status).to_lowercase(),
            workflows: execution.workflows.clone(),
            actions_total: outcomes.len(),
            actions_failed: outcomes.iter().filter(|o| !o.success).count(),
            duration_ms: execution.duration_ms(),
        }
    }
}

impl CommandOutput for ExecutionOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("Execution {} [{}]", self.id, self.status),
            format!("Contact:   {} <{}>", self.contact_id, self.contact_email),
            format!("Workflows: {}", self.workflows.join(", ")),
            format!(
                "Actions:   {} run, {} failed",
                self.actions_total, self.actions_failed
            ),
        ];
        if let Some(ms) = self.duration_ms {
            lines.push(format!("Duration:  {ms} ms"));
        }
        lines.join("\n")
    }
}

pub async fn execute(
    args: TriggerArgs,
    config_dir: Option<std::path::PathBuf>,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let config = load_config(config_dir.as_deref())?;
    let trigger: ContactTrigger = read_json(&args.file)?;

    let app = App::build(config, dry_run).await?;
    let execution = app.orchestrator.execute_for_contact(&trigger).await?;

    output(&ExecutionOutput::from(&execution), json);
    Ok(())
}
