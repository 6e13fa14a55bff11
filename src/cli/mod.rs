//! Cadence CLI: argument parsing and command dispatch.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod app;
pub mod commands;
pub mod output;

pub use app::App;

#[derive(Parser, Debug)]
#[command(name = "cadence", version, about = "Multi-entity contact workflow automation")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Emit JSON instead of human-readable output
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration directory (defaults to .cadence)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Use in-memory adapters instead of Notion and the webhook
    #[arg(long, global = true)]
    pub dry_run: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Process a single contact trigger from a JSON file
    Trigger(commands::trigger::TriggerArgs),
    /// Process a JSON array of contact triggers
    Bulk(commands::bulk::BulkArgs),
    /// Run the contact-change monitor until interrupted
    Monitor(commands::monitor::MonitorArgs),
    /// Show connection pool and circuit breaker status
    Status(commands::status::StatusArgs),
    /// Inspect and recommend workflow templates
    Templates(commands::templates::TemplatesArgs),
    /// Drive workflow state machine instances
    Workflow(commands::workflow::WorkflowArgs),
}

/// Print an error consistently and exit non-zero.
pub fn handle_error(err: anyhow::Error, json_mode: bool) {
    if json_mode {
        let payload = serde_json::json!({ "error": format!("{err:#}") });
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&payload).unwrap_or_default()
        );
    } else {
        eprintln!("{} {err:#}", console::style("error:").red().bold());
    }
    std::process::exit(1);
}
