//! Application wiring shared by the CLI commands.
//!
//! Dependency construction happens here, once, and everything downstream
//! receives its collaborators explicitly. `--dry-run` swaps every external
//! port for the in-memory adapter so commands can be exercised without a
//! Notion token or webhook.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::adapters::memory::MemoryStore;
use crate::adapters::notion::{NotionClient, NotionWorkflowStore};
use crate::adapters::webhook::WebhookNotifier;
use crate::domain::models::Config;
use crate::domain::ports::{ContactSource, InstanceStore};
use crate::infrastructure::http::PoolRegistry;
use crate::services::{
    ContactWorkflowAutomation, MultiEntityWorkflowAutomation, TemplateCatalog,
    WorkflowOrchestrator,
};

pub struct App {
    pub config: Config,
    pub registry: Arc<PoolRegistry>,
    pub orchestrator: Arc<WorkflowOrchestrator>,
    pub contact_source: Arc<dyn ContactSource>,
    pub instance_store: Arc<dyn InstanceStore>,
    pub notion: Option<Arc<NotionClient>>,
}

impl App {
    pub async fn build(config: Config, dry_run: bool) -> Result<Self> {
        let registry = Arc::new(PoolRegistry::new());

        if dry_run {
            let store = Arc::new(MemoryStore::new());
            let automation = Arc::new(ContactWorkflowAutomation::new(
                TemplateCatalog::builtin(),
                store.clone(),
                store.clone(),
                store.clone(),
            ));
            let orchestrator = Arc::new(WorkflowOrchestrator::new(Arc::new(
                MultiEntityWorkflowAutomation::new(automation),
            )));
            return Ok(Self {
                config,
                registry,
                orchestrator,
                contact_source: store.clone(),
                instance_store: store,
                notion: None,
            });
        }

        let notion = Arc::new(
            NotionClient::connect(&registry, &config.notion, &config.http, &config.circuit)
                .await
                .context("connecting to Notion")?,
        );
        let store = Arc::new(NotionWorkflowStore::new(
            notion.clone(),
            config.notion.clone(),
        ));
        let notifier = Arc::new(
            WebhookNotifier::connect(
                &registry,
                &config.notifications,
                &config.http,
                &config.circuit,
            )
            .await
            .context("configuring webhook notifier")?,
        );

        let automation = Arc::new(ContactWorkflowAutomation::new(
            TemplateCatalog::builtin(),
            store.clone(),
            store.clone(),
            notifier,
        ));
        let orchestrator = Arc::new(WorkflowOrchestrator::new(Arc::new(
            MultiEntityWorkflowAutomation::new(automation),
        )));

        Ok(Self {
            config,
            registry,
            orchestrator,
            contact_source: store.clone(),
            instance_store: store,
            notion: Some(notion),
        })
    }
}
