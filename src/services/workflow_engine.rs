//! Generic workflow state machine engine.
//!
//! The engine owns registered [`WorkflowDefinition`]s and an in-memory
//! instance cache, which is the authoritative state. After every successful
//! mutation the instance is mirrored to the [`InstanceStore`] best-effort:
//! a mirror failure is logged and never fails the operation, so the engine
//! keeps working through external-store outages (the mirror is then stale
//! until the next successful save).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{WorkflowDefinition, WorkflowInstance};
use crate::domain::ports::InstanceStore;

/// Hook invoked before a validated transition is applied.
///
/// Returning an error vetoes the transition; the instance is left
/// untouched and the error is surfaced to the caller as
/// [`DomainError::TransitionRejected`].
#[async_trait]
pub trait TransitionHook: Send + Sync {
    /// Hook name, used in logs.
    fn name(&self) -> &str;

    async fn before_transition(
        &self,
        instance: &WorkflowInstance,
        to_state: &str,
    ) -> Result<(), String>;
}

#[derive(Default)]
struct EngineState {
    definitions: HashMap<String, WorkflowDefinition>,
    instances: HashMap<Uuid, WorkflowInstance>,
    /// Hooks keyed by (workflow name, from state, to state).
    hooks: HashMap<(String, String, String), Vec<Arc<dyn TransitionHook>>>,
}

/// The workflow engine service.
pub struct WorkflowEngine {
    state: RwLock<EngineState>,
    store: Arc<dyn InstanceStore>,
}

impl WorkflowEngine {
    pub fn new(store: Arc<dyn InstanceStore>) -> Self {
        Self {
            state: RwLock::new(EngineState::default()),
            store,
        }
    }

    /// Register a definition after validating its structure. Re-registering
    /// a name replaces the old definition; running instances keep the
    /// states they were created under.
    pub async fn register_workflow(&self, definition: WorkflowDefinition) -> DomainResult<()> {
        definition.validate().map_err(DomainError::ValidationFailed)?;
        let name = definition.name.clone();
        let replaced = self
            .state
            .write()
            .await
            .definitions
            .insert(name.clone(), definition)
            .is_some();
        tracing::info!(workflow = %name, replaced, "Registered workflow definition");
        Ok(())
    }

    /// Attach a hook to one specific transition of a registered workflow.
    pub async fn register_hook(
        &self,
        workflow: &str,
        from_state: &str,
        to_state: &str,
        hook: Arc<dyn TransitionHook>,
    ) -> DomainResult<()> {
        let mut state = self.state.write().await;
        let definition = state
            .definitions
            .get(workflow)
            .ok_or_else(|| DomainError::WorkflowNotFound(workflow.to_string()))?;
        if !definition.allows(from_state, to_state) {
            return Err(DomainError::InvalidTransition {
                workflow: workflow.to_string(),
                from: from_state.to_string(),
                to: to_state.to_string(),
            });
        }
        state
            .hooks
            .entry((
                workflow.to_string(),
                from_state.to_string(),
                to_state.to_string(),
            ))
            .or_default()
            .push(hook);
        Ok(())
    }

    /// Create an instance of a registered workflow in its initial state.
    pub async fn create_workflow(
        &self,
        workflow: &str,
        initial_data: HashMap<String, serde_json::Value>,
    ) -> DomainResult<WorkflowInstance> {
        let instance = {
            let mut state = self.state.write().await;
            let definition = state
                .definitions
                .get(workflow)
                .ok_or_else(|| DomainError::WorkflowNotFound(workflow.to_string()))?;
            let instance = WorkflowInstance::new(definition, initial_data);
            state.instances.insert(instance.id, instance.clone());
            instance
        };

        tracing::info!(
            workflow,
            instance = %instance.id,
            state = %instance.current_state,
            "Created workflow instance"
        );
        self.mirror(&instance).await;
        Ok(instance)
    }

    /// Transition an instance to `to_state`.
    ///
    /// Validation order: instance exists, transition is legal for the
    /// owning definition, every registered hook approves. Only then is the
    /// instance mutated and mirrored.
    pub async fn transition(
        &self,
        instance_id: Uuid,
        to_state: &str,
        reason: &str,
        agent: &str,
        data: HashMap<String, serde_json::Value>,
    ) -> DomainResult<WorkflowInstance> {
        // Snapshot what the hooks need, then drop the lock before awaiting
        // them: hooks are arbitrary user code.
        let (snapshot, hooks) = {
            let state = self.state.read().await;
            let instance = state
                .instances
                .get(&instance_id)
                .ok_or(DomainError::InstanceNotFound(instance_id))?;
            let definition = state
                .definitions
                .get(&instance.definition_name)
                .ok_or_else(|| DomainError::WorkflowNotFound(instance.definition_name.clone()))?;
            if !definition.allows(&instance.current_state, to_state) {
                return Err(DomainError::InvalidTransition {
                    workflow: instance.definition_name.clone(),
                    from: instance.current_state.clone(),
                    to: to_state.to_string(),
                });
            }
            let key = (
                instance.definition_name.clone(),
                instance.current_state.clone(),
                to_state.to_string(),
            );
            let hooks = state.hooks.get(&key).cloned().unwrap_or_default();
            (instance.clone(), hooks)
        };

        for hook in &hooks {
            if let Err(reason) = hook.before_transition(&snapshot, to_state).await {
                tracing::warn!(
                    instance = %instance_id,
                    hook = hook.name(),
                    %reason,
                    "Transition vetoed by hook"
                );
                return Err(DomainError::TransitionRejected {
                    from: snapshot.current_state.clone(),
                    to: to_state.to_string(),
                    reason,
                });
            }
        }

        let updated = {
            let mut state = self.state.write().await;
            let instance = state
                .instances
                .get_mut(&instance_id)
                .ok_or(DomainError::InstanceNotFound(instance_id))?;
            // The state may have moved while hooks ran; re-check legality
            // against the current state before applying.
            if instance.current_state != snapshot.current_state {
                return Err(DomainError::InvalidTransition {
                    workflow: instance.definition_name.clone(),
                    from: instance.current_state.clone(),
                    to: to_state.to_string(),
                });
            }
            instance.apply_transition(to_state, reason, agent, data);
            instance.clone()
        };

        tracing::info!(
            instance = %instance_id,
            from = %snapshot.current_state,
            to = to_state,
            agent,
            "Workflow transition"
        );
        self.mirror(&updated).await;
        Ok(updated)
    }

    /// Fetch an instance: cache first, then the mirror. A mirror hit is
    /// re-cached.
    pub async fn get_workflow(&self, instance_id: Uuid) -> DomainResult<WorkflowInstance> {
        if let Some(instance) = self.state.read().await.instances.get(&instance_id) {
            return Ok(instance.clone());
        }

        match self.store.load_instance(instance_id).await {
            Ok(Some(instance)) => {
                self.state
                    .write()
                    .await
                    .instances
                    .insert(instance_id, instance.clone());
                Ok(instance)
            }
            Ok(None) => Err(DomainError::InstanceNotFound(instance_id)),
            Err(err) => {
                tracing::warn!(instance = %instance_id, error = %err, "Mirror lookup failed");
                Err(DomainError::InstanceNotFound(instance_id))
            }
        }
    }

    /// Drop an instance from the cache and archive its mirror record.
    /// Archival failure is best-effort like every other mirror write.
    pub async fn delete_workflow(&self, instance_id: Uuid) -> DomainResult<()> {
        let removed = self.state.write().await.instances.remove(&instance_id);
        if removed.is_none() {
            return Err(DomainError::InstanceNotFound(instance_id));
        }
        if let Err(err) = self.store.archive_instance(instance_id).await {
            tracing::warn!(instance = %instance_id, error = %err, "Mirror archive failed");
        }
        tracing::info!(instance = %instance_id, "Deleted workflow instance");
        Ok(())
    }

    /// Names of registered definitions, sorted.
    pub async fn workflow_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.read().await.definitions.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn definition(&self, name: &str) -> Option<WorkflowDefinition> {
        self.state.read().await.definitions.get(name).cloned()
    }

    /// All cached instances, newest first.
    pub async fn instances(&self) -> Vec<WorkflowInstance> {
        let mut instances: Vec<WorkflowInstance> =
            self.state.read().await.instances.values().cloned().collect();
        instances.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        instances
    }

    async fn mirror(&self, instance: &WorkflowInstance) {
        if let Err(err) = self.store.save_instance(instance).await {
            tracing::warn!(
                instance = %instance.id,
                error = %err,
                "Mirror save failed; cache remains authoritative"
            );
        }
    }
}
