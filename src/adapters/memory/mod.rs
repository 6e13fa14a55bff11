//! In-memory implementations of the domain ports.
//!
//! Used for dry runs (`--dry-run` on the CLI) and throughout the test
//! suite. `set_fail_saves` simulates an unreachable external store so the
//! engine's best-effort mirroring can be exercised.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    AutomationRunSummary, ContactRecord, ReminderTask, WorkflowInstance,
};
use crate::domain::ports::{ContactSource, InstanceStore, Notifier, TaskSink};

/// A notification captured by the memory notifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotification {
    pub target: String,
    pub subject: String,
    pub body: String,
}

/// In-memory store implementing every port.
#[derive(Debug, Default)]
pub struct MemoryStore {
    instances: RwLock<HashMap<Uuid, WorkflowInstance>>,
    archived: RwLock<HashMap<Uuid, WorkflowInstance>>,
    runs: RwLock<Vec<AutomationRunSummary>>,
    tasks: RwLock<Vec<ReminderTask>>,
    notifications: RwLock<Vec<SentNotification>>,
    contacts: RwLock<Vec<ContactRecord>>,
    fail_saves: AtomicBool,
    fail_notifications: AtomicBool,
    fail_reads: AtomicBool,
    task_seq: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every store write fail, simulating an unreachable mirror.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Make notification delivery fail.
    pub fn set_fail_notifications(&self, fail: bool) {
        self.fail_notifications.store(fail, Ordering::SeqCst);
    }

    /// Make `changed_since` fail, simulating an unreachable contact source.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub async fn seed_contacts(&self, contacts: Vec<ContactRecord>) {
        self.contacts.write().await.extend(contacts);
    }

    pub async fn tasks(&self) -> Vec<ReminderTask> {
        self.tasks.read().await.clone()
    }

    pub async fn notifications(&self) -> Vec<SentNotification> {
        self.notifications.read().await.clone()
    }

    pub async fn runs(&self) -> Vec<AutomationRunSummary> {
        self.runs.read().await.clone()
    }

    pub async fn saved_instance(&self, id: Uuid) -> Option<WorkflowInstance> {
        self.instances.read().await.get(&id).cloned()
    }

    pub async fn archived_instance(&self, id: Uuid) -> Option<WorkflowInstance> {
        self.archived.read().await.get(&id).cloned()
    }

    fn check_writable(&self) -> DomainResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(DomainError::ExecutionFailed(
                "memory store set to fail writes".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl InstanceStore for MemoryStore {
    async fn save_instance(&self, instance: &WorkflowInstance) -> DomainResult<()> {
        self.check_writable()?;
        self.instances
            .write()
            .await
            .insert(instance.id, instance.clone());
        Ok(())
    }

    async fn load_instance(&self, id: Uuid) -> DomainResult<Option<WorkflowInstance>> {
        Ok(self.instances.read().await.get(&id).cloned())
    }

    async fn archive_instance(&self, id: Uuid) -> DomainResult<()> {
        self.check_writable()?;
        if let Some(instance) = self.instances.write().await.remove(&id) {
            self.archived.write().await.insert(id, instance);
        }
        Ok(())
    }

    async fn record_run(&self, summary: &AutomationRunSummary) -> DomainResult<()> {
        self.check_writable()?;
        self.runs.write().await.push(summary.clone());
        Ok(())
    }
}

#[async_trait]
impl TaskSink for MemoryStore {
    async fn create_task(&self, task: &ReminderTask) -> DomainResult<String> {
        self.check_writable()?;
        self.tasks.write().await.push(task.clone());
        let seq = self.task_seq.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("task-{seq}"))
    }
}

#[async_trait]
impl Notifier for MemoryStore {
    async fn notify(&self, target: &str, subject: &str, body: &str) -> DomainResult<()> {
        if self.fail_notifications.load(Ordering::SeqCst) {
            return Err(DomainError::ExecutionFailed(
                "memory notifier set to fail".to_string(),
            ));
        }
        self.notifications.write().await.push(SentNotification {
            target: target.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

#[async_trait]
impl ContactSource for MemoryStore {
    async fn changed_since(&self, since: DateTime<Utc>) -> DomainResult<Vec<ContactRecord>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(DomainError::ExecutionFailed(
                "memory contact source set to fail reads".to_string(),
            ));
        }
        let mut changed: Vec<ContactRecord> = self
            .contacts
            .read()
            .await
            .iter()
            .filter(|c| c.last_edited > since)
            .cloned()
            .collect();
        changed.sort_by_key(|c| c.last_edited);
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{BusinessEntity, ContactType, LeadSource, WorkflowDefinition};

    fn instance() -> WorkflowInstance {
        let def = WorkflowDefinition {
            name: "wf".to_string(),
            description: String::new(),
            states: vec!["a".to_string()],
            initial_state: "a".to_string(),
            transitions: HashMap::new(),
        };
        WorkflowInstance::new(&def, HashMap::new())
    }

    #[tokio::test]
    async fn test_save_load_archive_cycle() {
        let store = MemoryStore::new();
        let inst = instance();
        store.save_instance(&inst).await.unwrap();
        assert!(store.load_instance(inst.id).await.unwrap().is_some());

        store.archive_instance(inst.id).await.unwrap();
        assert!(store.load_instance(inst.id).await.unwrap().is_none());
        assert!(store.archived_instance(inst.id).await.is_some());
    }

    #[tokio::test]
    async fn test_fail_saves_toggle() {
        let store = MemoryStore::new();
        store.set_fail_saves(true);
        assert!(store.save_instance(&instance()).await.is_err());
        store.set_fail_saves(false);
        assert!(store.save_instance(&instance()).await.is_ok());
    }

    #[tokio::test]
    async fn test_changed_since_filters_and_sorts() {
        let store = MemoryStore::new();
        let base = Utc::now();
        let record = |id: &str, offset_mins: i64| ContactRecord {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            contact_types: vec![ContactType::General],
            lead_source: LeadSource::Website,
            business_entities: vec![BusinessEntity::HigherselfCore],
            last_edited: base + chrono::Duration::minutes(offset_mins),
        };
        store
            .seed_contacts(vec![record("new-b", 20), record("old", -20), record("new-a", 10)])
            .await;

        let changed = store.changed_since(base).await.unwrap();
        let ids: Vec<&str> = changed.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["new-a", "new-b"]);
    }

    #[tokio::test]
    async fn test_task_ids_are_sequential() {
        let store = MemoryStore::new();
        let task = ReminderTask {
            title: "t".to_string(),
            notes: String::new(),
            assignee: "a".to_string(),
            due_at: Utc::now(),
            entity: None,
            contact_id: "c".to_string(),
        };
        assert_eq!(store.create_task(&task).await.unwrap(), "task-1");
        assert_eq!(store.create_task(&task).await.unwrap(), "task-2");
        assert_eq!(store.tasks().await.len(), 2);
    }
}
