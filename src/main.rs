//! Cadence CLI entry point.

use clap::Parser;

use cadence::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logging config comes from the same layered sources as everything
    // else; fall back to defaults when loading fails so the failure itself
    // gets reported through a working subscriber.
    let logging = cadence::cli::commands::load_config(cli.config.as_deref())
        .map(|c| c.logging)
        .unwrap_or_default();
    let _guard = cadence::infrastructure::logging::init(&logging);

    let result = match cli.command {
        Commands::Trigger(args) => {
            cadence::cli::commands::trigger::execute(args, cli.config, cli.dry_run, cli.json).await
        }
        Commands::Bulk(args) => {
            cadence::cli::commands::bulk::execute(args, cli.config, cli.dry_run, cli.json).await
        }
        Commands::Monitor(args) => {
            cadence::cli::commands::monitor::execute(args, cli.config, cli.dry_run, cli.json).await
        }
        Commands::Status(args) => {
            cadence::cli::commands::status::execute(args, cli.config, cli.dry_run, cli.json).await
        }
        Commands::Templates(args) => cadence::cli::commands::templates::execute(args, cli.json).await,
        Commands::Workflow(args) => {
            cadence::cli::commands::workflow::execute(args, cli.config, cli.dry_run, cli.json).await
        }
    };

    if let Err(err) = result {
        cadence::cli::handle_error(err, cli.json);
    }
}
