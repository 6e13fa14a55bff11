//! Execution records and per-entity metrics.
//!
//! A `WorkflowExecution` groups everything triggered by one contact event:
//! the selected template names, their per-action outcomes, timing, and a
//! derived status. Executions are created at dispatch time and finalized
//! when all constituent workflows finish or one errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::action::ActionOutcome;
use super::contact::{BusinessEntity, ContactTrigger};

/// Derived status of a coordinated execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
}

/// Outcomes of one template run within an execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateRun {
    pub template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<BusinessEntity>,
    pub outcomes: Vec<ActionOutcome>,
}

impl TemplateRun {
    /// A template run succeeded when every action outcome did.
    pub fn succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.success)
    }
}

/// One coordinated execution record per contact-driven event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowExecution {
    pub id: Uuid,
    pub contact_id: String,
    pub contact_email: String,
    /// Names of templates triggered by this event.
    pub workflows: Vec<String>,
    pub runs: Vec<TemplateRun>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub status: ExecutionStatus,
}

impl WorkflowExecution {
    /// Open a new execution record at dispatch time.
    pub fn start(trigger: &ContactTrigger) -> Self {
        Self {
            id: Uuid::new_v4(),
            contact_id: trigger.contact_id.clone(),
            contact_email: trigger.email.clone(),
            workflows: Vec::new(),
            runs: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
            status: ExecutionStatus::Running,
        }
    }

    /// Finalize with the collected runs; status derives from per-action
    /// results. Any failed outcome marks the whole execution failed.
    pub fn finish(&mut self, runs: Vec<TemplateRun>) {
        self.workflows = runs.iter().map(|r| r.template.clone()).collect();
        let all_ok = runs.iter().all(TemplateRun::succeeded);
        self.runs = runs;
        self.completed_at = Some(Utc::now());
        self.status = if all_ok {
            ExecutionStatus::Completed
        } else {
            ExecutionStatus::Failed
        };
    }

    /// Wall-clock duration, if finished.
    pub fn duration_ms(&self) -> Option<i64> {
        self.completed_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }
}

/// Audit record persisted (best-effort) after a trigger is processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationRunSummary {
    pub trigger: ContactTrigger,
    pub templates_executed: Vec<String>,
    pub runs: Vec<TemplateRun>,
    pub finished_at: DateTime<Utc>,
}

/// Running counters for one business entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityMetrics {
    pub executions: u64,
    pub successes: u64,
    /// Sum of completed execution durations, for the running average.
    pub total_duration_ms: u64,
}

impl EntityMetrics {
    pub fn record(&mut self, succeeded: bool, duration_ms: u64) {
        self.executions += 1;
        if succeeded {
            self.successes += 1;
        }
        self.total_duration_ms += duration_ms;
    }

    pub fn success_rate(&self) -> f64 {
        if self.executions == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        {
            self.successes as f64 / self.executions as f64
        }
    }

    pub fn avg_duration_ms(&self) -> f64 {
        if self.executions == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        {
            self.total_duration_ms as f64 / self.executions as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::action::ActionKind;
    use crate::domain::models::contact::{ContactType, LeadSource};
    use std::collections::HashMap;

    fn trigger() -> ContactTrigger {
        ContactTrigger {
            contact_id: "c-1".to_string(),
            email: "a@b.c".to_string(),
            contact_types: vec![ContactType::Artist],
            lead_source: LeadSource::Event,
            trigger_event: "contact_created".to_string(),
            business_entities: vec![BusinessEntity::The7Space],
            metadata: HashMap::new(),
        }
    }

    fn outcome(success: bool) -> ActionOutcome {
        let kind = ActionKind::SendNotification {
            target: "contact".to_string(),
            channel: Default::default(),
            message: "hi".to_string(),
        };
        if success {
            ActionOutcome::success(&kind, serde_json::Value::Null)
        } else {
            ActionOutcome::failure(&kind, "nope")
        }
    }

    #[test]
    fn test_execution_completes_when_all_succeed() {
        let mut exec = WorkflowExecution::start(&trigger());
        assert_eq!(exec.status, ExecutionStatus::Running);
        exec.finish(vec![TemplateRun {
            template: "t".to_string(),
            entity: None,
            outcomes: vec![outcome(true), outcome(true)],
        }]);
        assert_eq!(exec.status, ExecutionStatus::Completed);
        assert_eq!(exec.workflows, vec!["t".to_string()]);
        assert!(exec.duration_ms().is_some());
    }

    #[test]
    fn test_execution_fails_on_any_action_failure() {
        let mut exec = WorkflowExecution::start(&trigger());
        exec.finish(vec![TemplateRun {
            template: "t".to_string(),
            entity: None,
            outcomes: vec![outcome(true), outcome(false)],
        }]);
        assert_eq!(exec.status, ExecutionStatus::Failed);
    }

    #[test]
    fn test_entity_metrics_rates() {
        let mut m = EntityMetrics::default();
        assert_eq!(m.success_rate(), 0.0);
        m.record(true, 100);
        m.record(false, 300);
        assert_eq!(m.executions, 2);
        assert!((m.success_rate() - 0.5).abs() < f64::EPSILON);
        assert!((m.avg_duration_ms() - 200.0).abs() < f64::EPSILON);
    }
}
