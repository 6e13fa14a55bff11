//! Service layer: the workflow engine, contact automation, orchestration,
//! and the contact-change monitor.

pub mod contact_automation;
pub mod entity_automation;
pub mod monitor;
pub mod orchestrator;
pub mod templates;
pub mod workflow_engine;

pub use contact_automation::ContactWorkflowAutomation;
pub use entity_automation::MultiEntityWorkflowAutomation;
pub use monitor::{ContactMonitor, MonitorHandle};
pub use orchestrator::{BulkMode, WorkflowOrchestrator};
pub use templates::TemplateCatalog;
pub use workflow_engine::{TransitionHook, WorkflowEngine};
