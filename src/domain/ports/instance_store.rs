//! Port for the external workflow mirror and audit log.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{AutomationRunSummary, WorkflowInstance};

/// External persistence for workflow instances and run summaries.
///
/// The store is an eventually-consistent mirror: the engine owns the
/// authoritative in-memory state and writes here best-effort after each
/// successful mutation. Implementations must tolerate repeated saves of the
/// same instance (at-least-once, no dedup).
#[async_trait]
pub trait InstanceStore: Send + Sync {
    /// Create or update the mirror record for an instance.
    async fn save_instance(&self, instance: &WorkflowInstance) -> DomainResult<()>;

    /// Load an instance back from the mirror, if present and not archived.
    async fn load_instance(&self, id: Uuid) -> DomainResult<Option<WorkflowInstance>>;

    /// Archive the mirror record. History is preserved in the archived
    /// record; nothing is purged.
    async fn archive_instance(&self, id: Uuid) -> DomainResult<()>;

    /// Append an automation run summary to the audit log.
    async fn record_run(&self, summary: &AutomationRunSummary) -> DomainResult<()>;
}
