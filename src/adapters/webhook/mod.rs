//! Webhook notification sink.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde_json::json;

use crate::domain::errors::DomainResult;
use crate::domain::models::{CircuitConfig, HttpConfig, NotificationConfig};
use crate::domain::ports::Notifier;
use crate::infrastructure::http::{ApiConnectionPool, PoolRegistry, ServiceError};

/// Posts notification messages to a configured webhook URL.
///
/// With no URL configured, delivery degrades to a log line instead of an
/// error so notification actions still succeed in dry setups.
#[derive(Debug)]
pub struct WebhookNotifier {
    pool: Option<Arc<ApiConnectionPool>>,
}

impl WebhookNotifier {
    pub async fn connect(
        registry: &PoolRegistry,
        config: &NotificationConfig,
        http: &HttpConfig,
        circuit: &CircuitConfig,
    ) -> Result<Self, ServiceError> {
        let pool = if config.webhook_url.is_empty() {
            None
        } else {
            Some(
                registry
                    .get_or_create(
                        "notifications",
                        &config.webhook_url,
                        HeaderMap::new(),
                        http,
                        circuit,
                    )
                    .await?,
            )
        };
        Ok(Self { pool })
    }

    /// A notifier that only logs. Used when no webhook is configured.
    pub fn disabled() -> Self {
        Self { pool: None }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, target: &str, subject: &str, body: &str) -> DomainResult<()> {
        match &self.pool {
            Some(pool) => {
                let payload = json!({
                    "target": target,
                    "subject": subject,
                    "message": body,
                });
                pool.request(Method::POST, "", Some(&payload)).await?;
                tracing::debug!(target, subject, "Notification delivered");
                Ok(())
            }
            None => {
                tracing::info!(target, subject, body, "Notification (no webhook configured)");
                Ok(())
            }
        }
    }
}
