//! Generic workflow state machine types.
//!
//! A `WorkflowDefinition` is a static, validated description of states and
//! legal transitions. A `WorkflowInstance` is one running execution of a
//! definition; it is mutated only through validated transitions driven by
//! the engine, and every transition appends an immutable `HistoryEntry`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Static description of a named workflow type.
///
/// Immutable once registered with the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Unique name for this workflow (e.g. "lead_followup").
    pub name: String,
    /// Description of when to use this workflow.
    #[serde(default)]
    pub description: String,
    /// All state names in this workflow.
    pub states: Vec<String>,
    /// The state a new instance starts in. Must be a member of `states`.
    pub initial_state: String,
    /// Legal transitions: source state to the set of allowed target states.
    /// Every key and every target must be a member of `states`.
    #[serde(default)]
    pub transitions: HashMap<String, Vec<String>>,
}

impl WorkflowDefinition {
    /// Check the structural invariants.
    ///
    /// The initial state must be declared, and every transition endpoint
    /// must be a declared state.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("workflow name is empty".to_string());
        }
        if self.states.is_empty() {
            return Err(format!("workflow '{}' declares no states", self.name));
        }
        if !self.states.contains(&self.initial_state) {
            return Err(format!(
                "workflow '{}': initial state '{}' is not a declared state",
                self.name, self.initial_state
            ));
        }
        for (from, targets) in &self.transitions {
            if !self.states.contains(from) {
                return Err(format!(
                    "workflow '{}': transition source '{}' is not a declared state",
                    self.name, from
                ));
            }
            for to in targets {
                if !self.states.contains(to) {
                    return Err(format!(
                        "workflow '{}': transition target '{}' (from '{}') is not a declared state",
                        self.name, to, from
                    ));
                }
            }
        }
        Ok(())
    }

    /// Whether `from -> to` is a declared legal transition.
    pub fn allows(&self, from: &str, to: &str) -> bool {
        self.transitions
            .get(from)
            .is_some_and(|targets| targets.iter().any(|t| t == to))
    }
}

/// Immutable record of one transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub from_state: String,
    pub to_state: String,
    /// Human-readable reason for the transition.
    pub reason: String,
    /// Identifier of the acting agent (service name, user, or "system").
    pub agent: String,
    #[serde(default)]
    pub details: HashMap<String, serde_json::Value>,
}

/// One running execution of a workflow definition.
///
/// Never deleted in place; deletion archives the external mirror and drops
/// the instance from the engine cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowInstance {
    pub id: Uuid,
    /// Name of the owning definition.
    pub definition_name: String,
    /// Always a member of the owning definition's state set.
    pub current_state: String,
    /// Arbitrary key-value data bag, merged on each transition.
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,
    /// Ordered append-only transition log.
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowInstance {
    /// Allocate a new instance in the definition's initial state.
    pub fn new(
        definition: &WorkflowDefinition,
        initial_data: HashMap<String, serde_json::Value>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            definition_name: definition.name.clone(),
            current_state: definition.initial_state.clone(),
            data: initial_data,
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a validated transition: append history, merge the data delta,
    /// and advance `updated_at`. Callers must have already validated the
    /// target state against the definition.
    pub fn apply_transition(
        &mut self,
        to_state: &str,
        reason: &str,
        agent: &str,
        data: HashMap<String, serde_json::Value>,
    ) {
        let entry = HistoryEntry {
            timestamp: Utc::now(),
            from_state: self.current_state.clone(),
            to_state: to_state.to_string(),
            reason: reason.to_string(),
            agent: agent.to_string(),
            details: data.clone(),
        };
        self.history.push(entry);
        self.current_state = to_state.to_string();
        self.data.extend(data);
        self.updated_at = Utc::now();
    }
}
