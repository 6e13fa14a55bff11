//! Port for creating due-dated task records.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::ReminderTask;

/// Sink for reminder tasks.
///
/// Delayed workflow actions are not deferred-executed; they become a task
/// record with a due date for later pickup. This trait is the seam where
/// that record lands (Notion tasks database in production, an in-memory
/// list in tests).
#[async_trait]
pub trait TaskSink: Send + Sync {
    /// Create the task and return its external identifier.
    async fn create_task(&self, task: &ReminderTask) -> DomainResult<String>;
}
