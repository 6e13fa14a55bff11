//! Port for reading contact changes, used by the monitor loop.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::errors::DomainResult;
use crate::domain::models::ContactRecord;

/// Query-side view of the contact database.
#[async_trait]
pub trait ContactSource: Send + Sync {
    /// Contacts edited after `since`, ordered oldest first.
    async fn changed_since(&self, since: DateTime<Utc>) -> DomainResult<Vec<ContactRecord>>;
}
