//! Contact-driven workflow automation.
//!
//! Takes a [`ContactTrigger`], selects templates from the catalog, and
//! executes their actions strictly in order. Each action's failure is
//! captured in its [`ActionOutcome`]; sibling actions still run. Delayed
//! actions are not deferred in-process: they become due-dated reminder
//! tasks in the task sink (the platform has no durable timer).

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    ActionKind, ActionOutcome, AutomationRunSummary, BusinessEntity, ContactTrigger, ReminderTask,
    TemplateRun, WorkflowAction, WorkflowTemplate,
};
use crate::domain::ports::{InstanceStore, Notifier, TaskSink};

use super::templates::TemplateCatalog;

/// Substitute `{email}` and `{contact_id}` placeholders.
fn substitute(text: &str, trigger: &ContactTrigger) -> String {
    text.replace("{email}", &trigger.email)
        .replace("{contact_id}", &trigger.contact_id)
}

/// The contact automation service.
pub struct ContactWorkflowAutomation {
    catalog: TemplateCatalog,
    store: Arc<dyn InstanceStore>,
    tasks: Arc<dyn TaskSink>,
    notifier: Arc<dyn Notifier>,
}

impl ContactWorkflowAutomation {
    pub fn new(
        catalog: TemplateCatalog,
        store: Arc<dyn InstanceStore>,
        tasks: Arc<dyn TaskSink>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            catalog,
            store,
            tasks,
            notifier,
        }
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    /// Process one trigger end to end: validate, select, execute, record.
    ///
    /// Only structural problems (invalid trigger) return `Err`; action
    /// failures are captured per outcome and the run summary is still
    /// produced and recorded best-effort.
    pub async fn process_trigger(
        &self,
        trigger: &ContactTrigger,
    ) -> DomainResult<AutomationRunSummary> {
        trigger.validate().map_err(DomainError::ValidationFailed)?;

        let selected = self.catalog.select_for(trigger);
        tracing::info!(
            contact = %trigger.contact_id,
            event = %trigger.trigger_event,
            templates = ?selected.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            "Processing contact trigger"
        );

        let mut runs = Vec::with_capacity(selected.len());
        for template in &selected {
            runs.push(self.run_template(template, trigger).await);
        }

        let summary = AutomationRunSummary {
            trigger: trigger.clone(),
            templates_executed: selected.iter().map(|t| t.name.clone()).collect(),
            runs,
            finished_at: Utc::now(),
        };

        // Audit record is best-effort, like the engine's mirror writes.
        if let Err(err) = self.store.record_run(&summary).await {
            tracing::warn!(
                contact = %trigger.contact_id,
                error = %err,
                "Failed to record automation run"
            );
        }

        Ok(summary)
    }

    /// Execute one template's actions in declaration order.
    pub async fn run_template(
        &self,
        template: &WorkflowTemplate,
        trigger: &ContactTrigger,
    ) -> TemplateRun {
        let mut outcomes = Vec::with_capacity(template.actions.len());
        for action in &template.actions {
            let outcome = self
                .execute_action(action, template.entity, trigger)
                .await;
            if let Some(error) = &outcome.error {
                tracing::warn!(
                    template = %template.name,
                    action = %outcome.action,
                    contact = %trigger.contact_id,
                    error,
                    "Action failed; continuing with remaining actions"
                );
            }
            outcomes.push(outcome);
        }
        TemplateRun {
            template: template.name.clone(),
            entity: template.entity,
            outcomes,
        }
    }

    async fn execute_action(
        &self,
        action: &WorkflowAction,
        entity: Option<BusinessEntity>,
        trigger: &ContactTrigger,
    ) -> ActionOutcome {
        if let Some(condition) = &action.only_if {
            if !condition.matches(trigger) {
                return ActionOutcome::skipped(&action.kind);
            }
        }

        match &action.kind {
            ActionKind::SendNotification {
                target,
                channel: _,
                message,
            } => {
                if action.delay_hours > 0 {
                    // No durable timer: a delayed notification becomes a
                    // due-dated reminder task for later pickup.
                    return self
                        .defer_as_task(
                            &action.kind,
                            format!("Send notification to {target}"),
                            substitute(message, trigger),
                            target,
                            action.delay_hours,
                            entity,
                            trigger,
                        )
                        .await;
                }
                let body = substitute(message, trigger);
                match self
                    .notifier
                    .notify(target, &trigger.trigger_event, &body)
                    .await
                {
                    Ok(()) => ActionOutcome::success(&action.kind, json!({ "target": target })),
                    Err(err) => ActionOutcome::failure(&action.kind, err.to_string()),
                }
            }
            ActionKind::CreateTask {
                assignee,
                title,
                notes,
                due_in_hours,
            } => {
                let due_hours = action.delay_hours + due_in_hours;
                let task = ReminderTask {
                    title: substitute(title, trigger),
                    notes: substitute(notes, trigger),
                    assignee: assignee.clone(),
                    due_at: Utc::now() + Duration::hours(i64::from(due_hours)),
                    entity,
                    contact_id: trigger.contact_id.clone(),
                };
                match self.tasks.create_task(&task).await {
                    Ok(id) => ActionOutcome::success(&action.kind, json!({ "task_id": id })),
                    Err(err) => ActionOutcome::failure(&action.kind, err.to_string()),
                }
            }
            ActionKind::ScheduleFollowUp {
                target,
                message,
                follow_up_in_hours,
            } => {
                self.defer_as_task(
                    &action.kind,
                    format!("Follow up with {target}"),
                    substitute(message, trigger),
                    target,
                    *follow_up_in_hours,
                    entity,
                    trigger,
                )
                .await
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn defer_as_task(
        &self,
        kind: &ActionKind,
        title: String,
        notes: String,
        assignee: &str,
        due_in_hours: u32,
        entity: Option<BusinessEntity>,
        trigger: &ContactTrigger,
    ) -> ActionOutcome {
        let task = ReminderTask {
            title,
            notes,
            assignee: assignee.to_string(),
            due_at: Utc::now() + Duration::hours(i64::from(due_in_hours)),
            entity,
            contact_id: trigger.contact_id.clone(),
        };
        match self.tasks.create_task(&task).await {
            Ok(id) => ActionOutcome::success(
                kind,
                json!({ "task_id": id, "deferred": true, "due_in_hours": due_in_hours }),
            ),
            Err(err) => ActionOutcome::failure(kind, err.to_string()),
        }
    }
}
