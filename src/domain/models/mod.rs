//! Domain models: pure data types with no I/O.

pub mod action;
pub mod config;
pub mod contact;
pub mod execution;
pub mod workflow;

pub use action::{
    ActionCondition, ActionKind, ActionOutcome, NotificationChannel, ReminderTask, WorkflowAction,
    WorkflowTemplate,
};
pub use config::{
    CircuitConfig, Config, EntityDatabases, HttpConfig, LoggingConfig, MonitorConfig,
    NotificationConfig, NotionConfig,
};
pub use contact::{BusinessEntity, ContactRecord, ContactTrigger, ContactType, LeadSource};
pub use execution::{
    AutomationRunSummary, EntityMetrics, ExecutionStatus, TemplateRun, WorkflowExecution,
};
pub use workflow::{HistoryEntry, WorkflowDefinition, WorkflowInstance};
