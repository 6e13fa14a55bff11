//! Workflow engine lifecycle tests against the in-memory mirror.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use cadence::adapters::memory::MemoryStore;
use cadence::domain::models::{WorkflowDefinition, WorkflowInstance};
use cadence::services::workflow_engine::TransitionHook;
use cadence::services::WorkflowEngine;
use cadence::DomainError;

fn onboarding_definition() -> WorkflowDefinition {
    WorkflowDefinition {
        name: "contact_onboarding".to_string(),
        description: "New contact onboarding lifecycle".to_string(),
        states: vec![
            "new".to_string(),
            "contacted".to_string(),
            "qualified".to_string(),
            "closed".to_string(),
        ],
        initial_state: "new".to_string(),
        transitions: HashMap::from([
            ("new".to_string(), vec!["contacted".to_string()]),
            (
                "contacted".to_string(),
                vec!["qualified".to_string(), "closed".to_string()],
            ),
            ("qualified".to_string(), vec!["closed".to_string()]),
        ]),
    }
}

struct RequireDataHook {
    key: &'static str,
}

#[async_trait]
impl TransitionHook for RequireDataHook {
    fn name(&self) -> &str {
        "require_data"
    }

    async fn before_transition(
        &self,
        instance: &WorkflowInstance,
        _to_state: &str,
    ) -> Result<(), String> {
        if instance.data.contains_key(self.key) {
            Ok(())
        } else {
            Err(format!("instance is missing '{}'", self.key))
        }
    }
}

#[tokio::test]
async fn full_lifecycle_with_history_and_mirror() {
    let store = Arc::new(MemoryStore::new());
    let engine = WorkflowEngine::new(store.clone());
    engine
        .register_workflow(onboarding_definition())
        .await
        .expect("registration failed");

    let instance = engine
        .create_workflow(
            "contact_onboarding",
            HashMap::from([("email".to_string(), serde_json::json!("a@b.c"))]),
        )
        .await
        .expect("create failed");

    engine
        .transition(instance.id, "contacted", "outreach sent", "automation", HashMap::new())
        .await
        .expect("transition failed");
    let done = engine
        .transition(
            instance.id,
            "qualified",
            "replied positively",
            "account_manager",
            HashMap::from([("score".to_string(), serde_json::json!(87))]),
        )
        .await
        .expect("transition failed");

    assert_eq!(done.current_state, "qualified");
    assert_eq!(done.history.len(), 2);
    assert_eq!(done.history[0].to_state, "contacted");
    assert_eq!(done.history[1].agent, "account_manager");
    assert_eq!(done.data["score"], serde_json::json!(87));

    // Mirror holds the same state and survives an instance JSON roundtrip.
    let mirrored = store
        .saved_instance(instance.id)
        .await
        .expect("mirror missing");
    assert_eq!(mirrored.current_state, "qualified");
    assert_eq!(mirrored.history.len(), 2);

    engine
        .delete_workflow(instance.id)
        .await
        .expect("delete failed");
    assert!(store.archived_instance(instance.id).await.is_some());
    assert!(matches!(
        engine.get_workflow(instance.id).await,
        Err(DomainError::InstanceNotFound(_))
    ));
}

#[tokio::test]
async fn hook_gates_a_single_transition() {
    let store = Arc::new(MemoryStore::new());
    let engine = WorkflowEngine::new(store);
    engine
        .register_workflow(onboarding_definition())
        .await
        .expect("registration failed");
    engine
        .register_hook(
            "contact_onboarding",
            "contacted",
            "qualified",
            Arc::new(RequireDataHook { key: "score" }),
        )
        .await
        .expect("hook registration failed");

    let instance = engine
        .create_workflow("contact_onboarding", HashMap::new())
        .await
        .expect("create failed");
    engine
        .transition(instance.id, "contacted", "outreach", "automation", HashMap::new())
        .await
        .expect("ungated transition should pass");

    // Gated transition vetoed until the data the hook wants is present.
    let err = engine
        .transition(instance.id, "qualified", "try", "automation", HashMap::new())
        .await
        .expect_err("hook should veto");
    assert!(matches!(err, DomainError::TransitionRejected { .. }));

    // The unguarded path out of the same state is unaffected.
    engine
        .transition(instance.id, "closed", "gave up", "automation", HashMap::new())
        .await
        .expect("sibling transition should pass");
}

#[tokio::test]
async fn engine_survives_mirror_outage_and_resyncs() {
    let store = Arc::new(MemoryStore::new());
    let engine = WorkflowEngine::new(store.clone());
    engine
        .register_workflow(onboarding_definition())
        .await
        .expect("registration failed");

    store.set_fail_saves(true);
    let instance = engine
        .create_workflow("contact_onboarding", HashMap::new())
        .await
        .expect("create must succeed during outage");
    engine
        .transition(instance.id, "contacted", "go", "automation", HashMap::new())
        .await
        .expect("transition must succeed during outage");
    assert!(store.saved_instance(instance.id).await.is_none());

    // Store recovers; the next mutation re-mirrors the full current state.
    store.set_fail_saves(false);
    engine
        .transition(instance.id, "qualified", "go", "automation", HashMap::new())
        .await
        .expect("transition failed");
    let mirrored = store
        .saved_instance(instance.id)
        .await
        .expect("mirror should be up to date again");
    assert_eq!(mirrored.current_state, "qualified");
    assert_eq!(mirrored.history.len(), 2);
}
