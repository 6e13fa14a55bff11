//! Workflow template actions and their outcomes.
//!
//! Actions are static template data, not runtime entities. The action kind
//! is a tagged enum so dispatch in the executor is exhaustive — adding a
//! variant without a handler is a compile error, not a silent
//! "unsupported" branch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::contact::{BusinessEntity, ContactTrigger, ContactType, LeadSource};

/// Delivery channel for a notification action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    #[default]
    Webhook,
    Email,
}

/// Optional per-action gate evaluated against the trigger.
///
/// Empty lists match everything; an action with no condition always runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ActionCondition {
    #[serde(default)]
    pub lead_sources: Vec<LeadSource>,
    #[serde(default)]
    pub contact_types: Vec<ContactType>,
}

impl ActionCondition {
    /// Whether the trigger satisfies this condition.
    pub fn matches(&self, trigger: &ContactTrigger) -> bool {
        let source_ok =
            self.lead_sources.is_empty() || self.lead_sources.contains(&trigger.lead_source);
        let type_ok = self.contact_types.is_empty() || trigger.has_any_type(&self.contact_types);
        source_ok && type_ok
    }
}

/// What an action does when executed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    /// Send a human-readable message to a role or to the contact.
    SendNotification {
        /// `"contact"` or a staff role (e.g. `"gallery_curator"`).
        target: String,
        #[serde(default)]
        channel: NotificationChannel,
        /// Message body; `{email}` and `{contact_id}` are substituted.
        message: String,
    },
    /// Create a task record for a human to pick up.
    CreateTask {
        assignee: String,
        title: String,
        #[serde(default)]
        notes: String,
        /// Hours from execution time until the task is due.
        #[serde(default)]
        due_in_hours: u32,
    },
    /// Schedule a follow-up touchpoint.
    ///
    /// This does NOT defer execution: it creates a reminder task due
    /// `follow_up_in_hours` from now for later pickup. See the module docs
    /// on the scheduling approximation.
    ScheduleFollowUp {
        target: String,
        message: String,
        follow_up_in_hours: u32,
    },
}

impl ActionKind {
    /// Stable label used in outcome records and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::SendNotification { .. } => "send_notification",
            Self::CreateTask { .. } => "create_task",
            Self::ScheduleFollowUp { .. } => "schedule_follow_up",
        }
    }
}

/// One step in a workflow template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowAction {
    /// Hours to wait before this action becomes relevant. Zero executes
    /// immediately; non-zero actions are converted into a due-dated
    /// reminder task rather than truly deferred.
    #[serde(default)]
    pub delay_hours: u32,
    /// Optional gate; the action is skipped when it does not match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub only_if: Option<ActionCondition>,
    #[serde(flatten)]
    pub kind: ActionKind,
}

impl WorkflowAction {
    pub fn immediate(kind: ActionKind) -> Self {
        Self {
            delay_hours: 0,
            only_if: None,
            kind,
        }
    }

    pub fn delayed(kind: ActionKind, delay_hours: u32) -> Self {
        Self {
            delay_hours,
            only_if: None,
            kind,
        }
    }

    pub fn with_condition(mut self, condition: ActionCondition) -> Self {
        self.only_if = Some(condition);
        self
    }
}

/// Result of executing (or skipping, or deferring) one action.
///
/// Failures are captured here, never propagated; one action's failure does
/// not abort sibling actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionOutcome {
    /// Label of the action kind this outcome belongs to.
    pub action: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Handler-specific detail (task id, skipped/deferred markers, ...).
    #[serde(default)]
    pub detail: serde_json::Value,
    pub executed_at: DateTime<Utc>,
}

impl ActionOutcome {
    pub fn success(action: &ActionKind, detail: serde_json::Value) -> Self {
        Self {
            action: action.label().to_string(),
            success: true,
            error: None,
            detail,
            executed_at: Utc::now(),
        }
    }

    pub fn failure(action: &ActionKind, error: impl Into<String>) -> Self {
        Self {
            action: action.label().to_string(),
            success: false,
            error: Some(error.into()),
            detail: serde_json::Value::Null,
            executed_at: Utc::now(),
        }
    }

    pub fn skipped(action: &ActionKind) -> Self {
        Self {
            action: action.label().to_string(),
            success: true,
            error: None,
            detail: serde_json::json!({ "skipped": true }),
            executed_at: Utc::now(),
        }
    }
}

/// A named, static, ordered list of actions associated with a contact
/// classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowTemplate {
    /// Unique template name (e.g. "the7space_artist_welcome").
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Entity this template belongs to; `None` for cross-entity templates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<BusinessEntity>,
    /// Executed strictly in declaration order.
    pub actions: Vec<WorkflowAction>,
}

/// A due-dated task record created in the external store for later pickup.
///
/// This is the explicit rendering of "delayed" actions: the platform has no
/// durable timer, so a delay becomes a reminder task a human or periodic
/// queue picks up at `due_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderTask {
    pub title: String,
    #[serde(default)]
    pub notes: String,
    pub assignee: String,
    pub due_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<BusinessEntity>,
    pub contact_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn trigger(source: LeadSource, types: Vec<ContactType>) -> ContactTrigger {
        ContactTrigger {
            contact_id: "c-1".to_string(),
            email: "a@b.c".to_string(),
            contact_types: types,
            lead_source: source,
            trigger_event: "contact_created".to_string(),
            business_entities: vec![BusinessEntity::The7Space],
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn test_condition_matches_empty_is_always() {
        let cond = ActionCondition::default();
        assert!(cond.matches(&trigger(LeadSource::Website, vec![ContactType::Artist])));
    }

    #[test]
    fn test_condition_filters_by_source_and_type() {
        let cond = ActionCondition {
            lead_sources: vec![LeadSource::Referral],
            contact_types: vec![ContactType::Artist],
        };
        assert!(cond.matches(&trigger(LeadSource::Referral, vec![ContactType::Artist])));
        assert!(!cond.matches(&trigger(LeadSource::Website, vec![ContactType::Artist])));
        assert!(!cond.matches(&trigger(LeadSource::Referral, vec![ContactType::Media])));
    }

    #[test]
    fn test_action_serde_tagged() {
        let action = WorkflowAction::delayed(
            ActionKind::CreateTask {
                assignee: "curator".to_string(),
                title: "Review portfolio".to_string(),
                notes: String::new(),
                due_in_hours: 48,
            },
            24,
        );
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "create_task");
        assert_eq!(json["delay_hours"], 24);
        let back: WorkflowAction = serde_json::from_value(json).unwrap();
        assert_eq!(back, action);
    }

    #[test]
    fn test_outcome_constructors() {
        let kind = ActionKind::SendNotification {
            target: "contact".to_string(),
            channel: NotificationChannel::Webhook,
            message: "hi".to_string(),
        };
        let ok = ActionOutcome::success(&kind, serde_json::json!({"sent": true}));
        assert!(ok.success);
        assert_eq!(ok.action, "send_notification");

        let err = ActionOutcome::failure(&kind, "boom");
        assert!(!err.success);
        assert_eq!(err.error.as_deref(), Some("boom"));

        let skipped = ActionOutcome::skipped(&kind);
        assert!(skipped.success);
        assert_eq!(skipped.detail["skipped"], true);
    }
}
