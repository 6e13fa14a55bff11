//! `cadence workflow` — drive the workflow state machine engine.
//!
//! Definitions come from a JSON file; instances live in the engine's cache
//! for the lifetime of one invocation and in the external mirror between
//! invocations. `show` and `transition` therefore pull the instance back
//! through the mirror before acting on it.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use serde::Serialize;
use uuid::Uuid;

use crate::cli::output::{output, CommandOutput};
use crate::cli::App;
use crate::domain::models::{WorkflowDefinition, WorkflowInstance};
use crate::services::WorkflowEngine;

use super::{load_config, read_json};

#[derive(Args, Debug)]
pub struct WorkflowArgs {
    /// JSON file with an array of workflow definitions
    #[arg(long)]
    pub definitions: PathBuf,

    #[command(subcommand)]
    pub command: WorkflowCommands,
}

#[derive(Subcommand, Debug)]
pub enum WorkflowCommands {
    /// Validate the definitions file
    Validate,
    /// Create an instance of a registered workflow
    Create {
        /// Workflow definition name
        name: String,
        /// Initial data as a JSON object
        #[arg(long)]
        data: Option<String>,
    },
    /// Show an instance, from cache or the mirror
    Show {
        /// Instance id
        id: Uuid,
    },
    /// Transition an instance to a new state
    Transition {
        /// Instance id
        id: Uuid,
        /// Target state
        to: String,
        /// Reason recorded in the history entry
        #[arg(long, default_value = "cli")]
        reason: String,
        /// Acting agent recorded in the history entry
        #[arg(long, default_value = "cli")]
        agent: String,
    },
    /// Remove an instance and archive its mirror record
    Delete {
        /// Instance id
        id: Uuid,
    },
}

#[derive(Debug, Serialize)]
pub struct InstanceOutput {
    pub id: String,
    pub workflow: String,
    pub state: String,
    pub transitions: usize,
    pub updated_at: String,
}

impl From<&WorkflowInstance> for InstanceOutput {
    fn from(instance: &WorkflowInstance) -> Self {
        Self {
            id: instance.id.to_string(),
            workflow: instance.definition_name.clone(),
            state: instance.current_state.clone(),
            transitions: instance.history.len(),
            updated_at: instance.updated_at.to_rfc3339(),
        }
    }
}

impl CommandOutput for InstanceOutput {
    fn to_human(&self) -> String {
        format!(
            "Instance {}\nWorkflow:    {}\nState:       {}\nTransitions: {}\nUpdated:     {}",
            self.id, self.workflow, self.state, self.transitions, self.updated_at
        )
    }
}

#[derive(Debug, Serialize)]
pub struct ValidateOutput {
    pub workflows: Vec<String>,
}

impl CommandOutput for ValidateOutput {
    fn to_human(&self) -> String {
        format!(
            "{} definitions valid: {}",
            self.workflows.len(),
            self.workflows.join(", ")
        )
    }
}

async fn engine_with_definitions(app: &App, path: &PathBuf) -> Result<WorkflowEngine> {
    let definitions: Vec<WorkflowDefinition> = read_json(path)?;
    if definitions.is_empty() {
        bail!("{} contains no workflow definitions", path.display());
    }
    let engine = WorkflowEngine::new(Arc::clone(&app.instance_store));
    for definition in definitions {
        engine.register_workflow(definition).await?;
    }
    Ok(engine)
}

pub async fn execute(
    args: WorkflowArgs,
    config_dir: Option<std::path::PathBuf>,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let config = load_config(config_dir.as_deref())?;
    let app = App::build(config, dry_run).await?;
    let engine = engine_with_definitions(&app, &args.definitions).await?;

    match args.command {
        WorkflowCommands::Validate => {
            output(
                &ValidateOutput {
                    workflows: engine.workflow_names().await,
                },
                json,
            );
        }
        WorkflowCommands::Create { name, data } => {
            let initial_data = match data {
                Some(text) => serde_json::from_str(&text)?,
                None => Default::default(),
            };
            let instance = engine.create_workflow(&name, initial_data).await?;
            output(&InstanceOutput::from(&instance), json);
        }
        WorkflowCommands::Show { id } => {
            let instance = engine.get_workflow(id).await?;
            output(&InstanceOutput::from(&instance), json);
        }
        WorkflowCommands::Transition {
            id,
            to,
            reason,
            agent,
        } => {
            // Pull the instance into the cache from the mirror first; a
            // fresh process starts with an empty cache.
            engine.get_workflow(id).await?;
            let instance = engine
                .transition(id, &to, &reason, &agent, Default::default())
                .await?;
            output(&InstanceOutput::from(&instance), json);
        }
        WorkflowCommands::Delete { id } => {
            engine.get_workflow(id).await?;
            engine.delete_workflow(id).await?;
            println!("Instance {id} deleted");
        }
    }
    Ok(())
}
