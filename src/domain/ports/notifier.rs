//! Port for the fire-and-forget notification sink.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;

/// Human-readable status message sink.
///
/// No response contract beyond success/failure; callers treat delivery
/// failures as per-action errors, never as fatal.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, target: &str, subject: &str, body: &str) -> DomainResult<()>;
}
