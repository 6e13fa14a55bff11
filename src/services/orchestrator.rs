//! Workflow orchestrator: execution records and bulk dispatch.
//!
//! The orchestrator is the outermost automation surface. Every processed
//! trigger gets a [`WorkflowExecution`] record, retained in memory and
//! queryable by id; bulk dispatch runs triggers sequentially or in parallel
//! with per-slot error capture, so one bad trigger never hides the results
//! of the others.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ContactTrigger, ExecutionStatus, WorkflowExecution};

use super::entity_automation::MultiEntityWorkflowAutomation;

/// How bulk dispatch schedules its triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BulkMode {
    /// One at a time, in input order.
    Sequential,
    /// All at once; results still come back in input order.
    #[default]
    Parallel,
}

/// The orchestration service.
pub struct WorkflowOrchestrator {
    automation: Arc<MultiEntityWorkflowAutomation>,
    executions: RwLock<HashMap<Uuid, WorkflowExecution>>,
}

impl WorkflowOrchestrator {
    pub fn new(automation: Arc<MultiEntityWorkflowAutomation>) -> Self {
        Self {
            automation,
            executions: RwLock::new(HashMap::new()),
        }
    }

    pub fn automation(&self) -> &Arc<MultiEntityWorkflowAutomation> {
        &self.automation
    }

    /// Process one trigger under a tracked execution record.
    ///
    /// The record is registered as `Running` before dispatch, so concurrent
    /// status queries see in-flight work; the finalized record (status,
    /// outcomes, timing) replaces it when processing ends. A failed
    /// dispatch removes the record and returns the error.
    pub async fn execute_for_contact(
        &self,
        trigger: &ContactTrigger,
    ) -> DomainResult<WorkflowExecution> {
        let mut execution = WorkflowExecution::start(trigger);
        let id = execution.id;
        self.executions.write().await.insert(id, execution.clone());

        match self.automation.process(trigger).await {
            Ok(summary) => {
                execution.finish(summary.runs);
                tracing::info!(
                    execution = %id,
                    contact = %trigger.contact_id,
                    status = ?execution.status,
                    duration_ms = execution.duration_ms(),
                    "Execution finished"
                );
                self.executions.write().await.insert(id, execution.clone());
                Ok(execution)
            }
            Err(err) => {
                tracing::error!(
                    execution = %id,
                    contact = %trigger.contact_id,
                    error = %err,
                    "Execution failed to dispatch"
                );
                self.executions.write().await.remove(&id);
                Err(err)
            }
        }
    }

    /// Process many triggers. The result vector is index-aligned with the
    /// input: slot `i` holds trigger `i`'s execution or its error.
    pub async fn execute_bulk(
        &self,
        triggers: &[ContactTrigger],
        mode: BulkMode,
    ) -> Vec<DomainResult<WorkflowExecution>> {
        tracing::info!(count = triggers.len(), ?mode, "Bulk execution started");
        match mode {
            BulkMode::Sequential => {
                let mut results = Vec::with_capacity(triggers.len());
                for trigger in triggers {
                    results.push(self.execute_for_contact(trigger).await);
                }
                results
            }
            BulkMode::Parallel => {
                join_all(
                    triggers
                        .iter()
                        .map(|trigger| self.execute_for_contact(trigger)),
                )
                .await
            }
        }
    }

    /// Look up an execution record by id.
    pub async fn execution(&self, id: Uuid) -> DomainResult<WorkflowExecution> {
        self.executions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(DomainError::InstanceNotFound(id))
    }

    /// All retained execution records, newest first.
    pub async fn executions(&self) -> Vec<WorkflowExecution> {
        let mut all: Vec<WorkflowExecution> =
            self.executions.read().await.values().cloned().collect();
        all.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        all
    }

    /// Records still marked running.
    pub async fn active_executions(&self) -> Vec<WorkflowExecution> {
        self.executions
            .read()
            .await
            .values()
            .filter(|e| e.status == ExecutionStatus::Running)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStore;
    use crate::domain::models::{BusinessEntity, ContactType, LeadSource};
    use crate::services::contact_automation::ContactWorkflowAutomation;
    use crate::services::templates::TemplateCatalog;
    use std::collections::HashMap as StdHashMap;

    fn orchestrator() -> (WorkflowOrchestrator, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let automation = Arc::new(ContactWorkflowAutomation::new(
            TemplateCatalog::builtin(),
            store.clone(),
            store.clone(),
            store.clone(),
        ));
        let multi = Arc::new(MultiEntityWorkflowAutomation::new(automation));
        (WorkflowOrchestrator::new(multi), store)
    }

    fn trigger(id: &str) -> ContactTrigger {
        ContactTrigger {
            contact_id: id.to_string(),
            email: format!("{id}@example.com"),
            contact_types: vec![ContactType::Artist],
            lead_source: LeadSource::Website,
            trigger_event: "contact_created".to_string(),
            business_entities: vec![BusinessEntity::The7Space],
            metadata: StdHashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_execution_record_retained_and_queryable() {
        let (orchestrator, _) = orchestrator();
        let execution = orchestrator.execute_for_contact(&trigger("c-1")).await.unwrap();
        assert_eq!(execution.status, ExecutionStatus::Completed);
        assert_eq!(execution.workflows, vec!["the7space_artist_welcome"]);

        let fetched = orchestrator.execution(execution.id).await.unwrap();
        assert_eq!(fetched.status, ExecutionStatus::Completed);
        assert!(orchestrator.active_executions().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_dispatch_is_not_retained() {
        let (orchestrator, _) = orchestrator();
        let mut bad = trigger("c-1");
        bad.email = String::new();

        assert!(orchestrator.execute_for_contact(&bad).await.is_err());
        assert!(orchestrator.executions().await.is_empty());
    }

    #[tokio::test]
    async fn test_bulk_parallel_preserves_order_and_captures_errors() {
        let (orchestrator, _) = orchestrator();
        let mut triggers: Vec<ContactTrigger> =
            (0..5).map(|i| trigger(&format!("c-{i}"))).collect();
        triggers[3].email = String::new(); // invalid

        let results = orchestrator.execute_bulk(&triggers, BulkMode::Parallel).await;
        assert_eq!(results.len(), 5);
        for (i, result) in results.iter().enumerate() {
            if i == 3 {
                assert!(result.is_err());
            } else {
                let execution = result.as_ref().unwrap();
                assert_eq!(execution.contact_id, format!("c-{i}"));
                assert_eq!(execution.status, ExecutionStatus::Completed);
            }
        }
        assert_eq!(orchestrator.executions().await.len(), 4);
    }

    #[tokio::test]
    async fn test_bulk_sequential_matches_parallel_results() {
        let (orchestrator, store) = orchestrator();
        let triggers: Vec<ContactTrigger> =
            (0..3).map(|i| trigger(&format!("s-{i}"))).collect();

        let results = orchestrator
            .execute_bulk(&triggers, BulkMode::Sequential)
            .await;
        assert!(results.iter().all(Result::is_ok));
        // Each trigger produced one notification and two tasks.
        assert_eq!(store.notifications().await.len(), 3);
        assert_eq!(store.tasks().await.len(), 6);
    }
}
