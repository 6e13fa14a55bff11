//! Contact-change monitor.
//!
//! Polls the [`ContactSource`] on a fixed interval and feeds changed
//! contacts into the orchestrator. Shutdown is a `watch` channel, not a
//! flag: the loop wakes immediately when [`MonitorHandle::shutdown`] fires,
//! even mid-sleep.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::domain::models::MonitorConfig;
use crate::domain::ports::ContactSource;

use super::orchestrator::{BulkMode, WorkflowOrchestrator};

const CHANGE_EVENT: &str = "contact_changed";

/// Handle to a running monitor loop.
pub struct MonitorHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Signal the loop to stop and wait for it to drain.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        let _ = self.task.await;
    }
}

/// The polling monitor.
pub struct ContactMonitor {
    source: Arc<dyn ContactSource>,
    orchestrator: Arc<WorkflowOrchestrator>,
    config: MonitorConfig,
}

impl ContactMonitor {
    pub fn new(
        source: Arc<dyn ContactSource>,
        orchestrator: Arc<WorkflowOrchestrator>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            source,
            orchestrator,
            config,
        }
    }

    /// One poll cycle: fetch changes since the watermark, dispatch them,
    /// and return the new watermark.
    ///
    /// The watermark only advances past contacts that were fetched, so a
    /// failed fetch retries the same window on the next cycle. Dispatch
    /// errors are logged per contact; the watermark still advances (the
    /// contact was seen, its trigger was just bad).
    pub async fn poll_once(&self, since: DateTime<Utc>) -> DateTime<Utc> {
        let contacts = match self.source.changed_since(since).await {
            Ok(contacts) => contacts,
            Err(err) => {
                tracing::warn!(error = %err, "Contact poll failed; will retry");
                return since;
            }
        };

        if contacts.is_empty() {
            return since;
        }

        tracing::info!(count = contacts.len(), "Contacts changed since last poll");
        let watermark = contacts
            .iter()
            .map(|c| c.last_edited)
            .max()
            .unwrap_or(since);

        let triggers: Vec<_> = contacts
            .into_iter()
            .map(|c| c.into_trigger(CHANGE_EVENT))
            .collect();
        let results = self
            .orchestrator
            .execute_bulk(&triggers, BulkMode::Sequential)
            .await;
        for (trigger, result) in triggers.iter().zip(&results) {
            if let Err(err) = result {
                tracing::warn!(
                    contact = %trigger.contact_id,
                    error = %err,
                    "Failed to process changed contact"
                );
            }
        }

        watermark
    }

    /// Spawn the polling loop on the runtime. Returns a handle that stops
    /// it; dropping the handle aborts nothing, call
    /// [`MonitorHandle::shutdown`].
    pub fn spawn(self) -> MonitorHandle {
        let (stop, mut stopped) = watch::channel(false);
        let interval = Duration::from_secs(self.config.poll_interval_secs);

        let task = tokio::spawn(async move {
            tracing::info!(
                poll_interval_secs = self.config.poll_interval_secs,
                "Contact monitor started"
            );
            let mut since = Utc::now();
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {
                        since = self.poll_once(since).await;
                    }
                    _ = stopped.changed() => {
                        if *stopped.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::info!("Contact monitor stopped");
        });

        MonitorHandle { stop, task }
    }
}
