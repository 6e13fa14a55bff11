//! `cadence templates` — inspect and recommend workflow templates.

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use comfy_table::{presets::UTF8_FULL, Table};
use serde::Serialize;

use crate::cli::output::{output, truncate, CommandOutput};
use crate::domain::models::BusinessEntity;
use crate::services::TemplateCatalog;

#[derive(Args, Debug)]
pub struct TemplatesArgs {
    #[command(subcommand)]
    pub command: TemplatesCommands,
}

#[derive(Subcommand, Debug)]
pub enum TemplatesCommands {
    /// List templates, optionally filtered by entity
    List {
        /// Entity id (the_7_space, am_consulting, higherself_core)
        #[arg(long)]
        entity: Option<String>,
    },
    /// Recommend a template for a free-text need
    Recommend {
        /// Entity id the recommendation is scoped to
        entity: String,
        /// What you need, in plain words
        need: String,
    },
}

#[derive(Debug, Serialize)]
pub struct TemplateRowOutput {
    pub name: String,
    pub entity: Option<String>,
    pub actions: usize,
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct TemplateListOutput {
    pub templates: Vec<TemplateRowOutput>,
    pub total: usize,
}

impl CommandOutput for TemplateListOutput {
    fn to_human(&self) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec!["Name", "Entity", "Actions", "Description"]);
        for t in &self.templates {
            table.add_row(vec![
                t.name.clone(),
                t.entity.clone().unwrap_or_else(|| "-".to_string()),
                t.actions.to_string(),
                truncate(&t.description, 48),
            ]);
        }
        format!("{table}\n{} templates", self.total)
    }
}

#[derive(Debug, Serialize)]
pub struct RecommendOutput {
    pub entity: String,
    pub need: String,
    pub recommendation: Option<String>,
}

impl CommandOutput for RecommendOutput {
    fn to_human(&self) -> String {
        match &self.recommendation {
            Some(name) => format!("Recommended for {}: {name}", self.entity),
            None => format!("No template of {} matches \"{}\"", self.entity, self.need),
        }
    }
}

fn parse_entity(s: &str) -> Result<BusinessEntity> {
    BusinessEntity::parse(s).ok_or_else(|| {
        anyhow!("unknown entity '{s}' (expected the_7_space, am_consulting, or higherself_core)")
    })
}

pub async fn execute(args: TemplatesArgs, json: bool) -> Result<()> {
    let catalog = TemplateCatalog::builtin();
    match args.command {
        TemplatesCommands::List { entity } => {
            let templates = match entity.as_deref() {
                Some(id) => catalog.for_entity(parse_entity(id)?),
                None => catalog.all(),
            };
            let rows: Vec<TemplateRowOutput> = templates
                .iter()
                .map(|t| TemplateRowOutput {
                    name: t.name.clone(),
                    entity: t.entity.map(|e| e.as_str().to_string()),
                    actions: t.actions.len(),
                    description: t.description.clone(),
                })
                .collect();
            output(
                &TemplateListOutput {
                    total: rows.len(),
                    templates: rows,
                },
                json,
            );
        }
        TemplatesCommands::Recommend { entity, need } => {
            let parsed = parse_entity(&entity)?;
            // Recommendation only needs the catalog, so wire the in-memory
            // stack regardless of configuration.
            let store = std::sync::Arc::new(crate::adapters::memory::MemoryStore::new());
            let automation = std::sync::Arc::new(crate::services::ContactWorkflowAutomation::new(
                catalog,
                store.clone(),
                store.clone(),
                store,
            ));
            let multi = crate::services::MultiEntityWorkflowAutomation::new(automation);
            output(
                &RecommendOutput {
                    entity,
                    recommendation: multi.recommend(parsed, &need),
                    need,
                },
                json,
            );
        }
    }
    Ok(())
}
