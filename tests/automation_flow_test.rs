//! End-to-end automation flows through the orchestrator, using the
//! in-memory adapters.

use std::collections::HashMap;
use std::sync::Arc;

use cadence::adapters::memory::MemoryStore;
use cadence::domain::models::{
    BusinessEntity, ContactTrigger, ContactType, ExecutionStatus, LeadSource,
};
use cadence::services::{
    BulkMode, ContactWorkflowAutomation, MultiEntityWorkflowAutomation, TemplateCatalog,
    WorkflowOrchestrator,
};

fn build() -> (Arc<WorkflowOrchestrator>, Arc<MemoryStore>) {
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
    (orchestrator, store)
}

fn trigger(
    id: &str,
    entities: Vec<BusinessEntity>,
    types: Vec<ContactType>,
    source: LeadSource,
) -> ContactTrigger {
    ContactTrigger {
        contact_id: id.to_string(),
        email: format!("{id}@example.com"),
        contact_types: types,
        lead_source: source,
        trigger_event: "contact_created".to_string(),
        business_entities: entities,
        metadata: HashMap::new(),
    }
}

#[tokio::test]
async fn artist_contact_gets_full_welcome_sequence() {
    let (orchestrator, store) = build();
    let execution = orchestrator
        .execute_for_contact(&trigger(
            "artist-1",
            vec![BusinessEntity::The7Space],
            vec![ContactType::Artist],
            LeadSource::Website,
        ))
        .await
        .expect("execution failed");

    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(execution.workflows, vec!["the7space_artist_welcome"]);

    // Curator gets notified, with the email substituted into the message.
    let notifications = store.notifications().await;
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].target, "gallery_curator");
    assert!(notifications[0].body.contains("artist-1@example.com"));

    // A review task plus the deferred follow-up task, both bound to the
    // entity and the contact.
    let tasks = store.tasks().await;
    assert_eq!(tasks.len(), 2);
    for task in &tasks {
        assert_eq!(task.entity, Some(BusinessEntity::The7Space));
        assert_eq!(task.contact_id, "artist-1");
    }

    // The run summary was recorded for audit.
    let runs = store.runs().await;
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].templates_executed, vec!["the7space_artist_welcome"]);
}

#[tokio::test]
async fn multi_entity_contact_runs_one_template_per_entity() {
    let (orchestrator, store) = build();
    let execution = orchestrator
        .execute_for_contact(&trigger(
            "both-1",
            vec![BusinessEntity::The7Space, BusinessEntity::HigherselfCore],
            vec![ContactType::WellnessClient],
            LeadSource::Referral,
        ))
        .await
        .expect("execution failed");

    assert_eq!(
        execution.workflows,
        vec![
            "the7space_wellness_welcome".to_string(),
            "higherself_community_onboarding".to_string(),
        ]
    );

    // Entity metrics recorded separately for each side.
    let metrics = orchestrator.automation().metrics().await;
    assert_eq!(metrics[&BusinessEntity::The7Space].executions, 1);
    assert_eq!(metrics[&BusinessEntity::HigherselfCore].executions, 1);
    assert!(!metrics.contains_key(&BusinessEntity::AmConsulting));

    // Tasks carry their owning entity, never the sibling's.
    for task in store.tasks().await {
        assert!(task.entity.is_some());
    }
}

#[tokio::test]
async fn notification_failure_still_creates_tasks_and_marks_failed() {
    let (orchestrator, store) = build();
    store.set_fail_notifications(true);

    let execution = orchestrator
        .execute_for_contact(&trigger(
            "artist-2",
            vec![BusinessEntity::The7Space],
            vec![ContactType::Artist],
            LeadSource::Website,
        ))
        .await
        .expect("execution failed");

    assert_eq!(execution.status, ExecutionStatus::Failed);
    let outcomes = &execution.runs[0].outcomes;
    assert!(!outcomes[0].success);
    assert!(outcomes[1].success);
    assert!(outcomes[2].success);
    assert_eq!(store.tasks().await.len(), 2);
}

#[tokio::test]
async fn bulk_parallel_reports_each_slot_in_order() {
    let (orchestrator, _) = build();
    let mut triggers: Vec<ContactTrigger> = (0..5)
        .map(|i| {
            trigger(
                &format!("bulk-{i}"),
                vec![BusinessEntity::HigherselfCore],
                vec![ContactType::General],
                LeadSource::Newsletter,
            )
        })
        .collect();
    triggers[3].business_entities.clear(); // structurally invalid

    let results = orchestrator
        .execute_bulk(&triggers, BulkMode::Parallel)
        .await;

    assert_eq!(results.len(), 5);
    assert!(results[3].is_err());
    for (i, result) in results.iter().enumerate() {
        if i == 3 {
            continue;
        }
        let execution = result.as_ref().expect("slot should have succeeded");
        assert_eq!(execution.contact_id, format!("bulk-{i}"));
    }

    // Only the four good executions are retained.
    assert_eq!(orchestrator.executions().await.len(), 4);
}

#[tokio::test]
async fn unrouted_contact_falls_back_to_generic_template() {
    let store = Arc::new(MemoryStore::new());
    // A catalog with only the generic template registered.
    let mut catalog = TemplateCatalog::new();
    catalog.register(
        TemplateCatalog::builtin()
            .get("generic_contact_welcome")
            .expect("builtin generic template")
            .clone(),
    );
    let automation = Arc::new(ContactWorkflowAutomation::new(
        catalog,
        store.clone(),
        store.clone(),
        store.clone(),
    ));
    let orchestrator =
        WorkflowOrchestrator::new(Arc::new(MultiEntityWorkflowAutomation::new(automation)));

    let execution = orchestrator
        .execute_for_contact(&trigger(
            "stray-1",
            vec![BusinessEntity::The7Space],
            vec![ContactType::Media],
            LeadSource::Manual,
        ))
        .await
        .expect("execution failed");

    assert_eq!(execution.workflows, vec!["generic_contact_welcome"]);
    assert_eq!(store.notifications().await[0].target, "operations");
}
