//! Managed HTTP connection pools.
//!
//! One [`ApiConnectionPool`] per external service base URL: a shared
//! `reqwest::Client`, a [`CircuitBreaker`], retry with exponential backoff,
//! and per-pool metrics. [`PoolRegistry`] hands out pools keyed by base URL.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};

use crate::domain::models::{CircuitConfig, HttpConfig};

use super::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitStats};
use super::error::ServiceError;

const INITIAL_BACKOFF: Duration = Duration::from_millis(500);

/// Per-pool cumulative counters.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PoolMetrics {
    pub requests: u64,
    pub successes: u64,
    pub failures: u64,
    pub retries: u64,
    pub total_latency_ms: u64,
}

impl PoolMetrics {
    pub fn avg_latency_ms(&self) -> f64 {
        if self.successes == 0 {
            0.0
        } else {
            self.total_latency_ms as f64 / self.successes as f64
        }
    }
}

/// Stats snapshot combining pool and breaker counters.
#[derive(Debug, Clone, Serialize)]
pub struct PoolStats {
    pub service: String,
    pub base_url: String,
    pub metrics: PoolMetrics,
    pub circuit: CircuitStats,
}

/// A successful response body with its status.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    /// Parse the body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, ServiceError> {
        serde_json::from_str(&self.body).map_err(|e| ServiceError::Network {
            service: "json".to_string(),
            message: format!("response decode failed: {e}"),
        })
    }
}

/// HTTP connection pool for one external service.
///
/// Every request passes through the circuit breaker; retryable failures are
/// retried with exponential backoff (each attempt is a separate breaker call,
/// so sustained failures trip the circuit mid-retry and abort the loop).
pub struct ApiConnectionPool {
    service: String,
    base_url: String,
    client: reqwest::Client,
    breaker: CircuitBreaker,
    http_config: HttpConfig,
    metrics: Mutex<PoolMetrics>,
}

impl ApiConnectionPool {
    pub fn new(
        service: impl Into<String>,
        base_url: impl Into<String>,
        default_headers: HeaderMap,
        http_config: HttpConfig,
        circuit_config: &CircuitConfig,
    ) -> Result<Self, ServiceError> {
        let service = service.into();
        let base_url = base_url.into();
        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(Duration::from_secs(http_config.request_timeout_secs))
            .build()
            .map_err(|e| ServiceError::InvalidConfig(format!("http client: {e}")))?;

        let breaker = CircuitBreaker::new(service.clone(), CircuitBreakerConfig::from(circuit_config));

        Ok(Self {
            service,
            base_url,
            client,
            breaker,
            http_config,
            metrics: Mutex::new(PoolMetrics::default()),
        })
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a request, raising non-2xx responses as errors.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<ApiResponse, ServiceError> {
        self.request_with(method, path, body, true).await
    }

    /// Send a request. When `raise_for_status` is false, non-2xx responses
    /// are returned as [`ApiResponse`] values instead of errors (retryable
    /// statuses are still retried first).
    pub async fn request_with(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
        raise_for_status: bool,
    ) -> Result<ApiResponse, ServiceError> {
        let url = self.join(path);
        let started = Instant::now();
        {
            let mut metrics = self.metrics.lock().await;
            metrics.requests += 1;
        }

        let mut attempt: u32 = 0;
        loop {
            let result = self
                .breaker
                .execute(|| self.send_once(method.clone(), &url, body))
                .await;

            match result {
                Ok(response) => {
                    let mut metrics = self.metrics.lock().await;
                    metrics.successes += 1;
                    metrics.total_latency_ms += started.elapsed().as_millis() as u64;
                    return Ok(response);
                }
                Err(err) => {
                    // An open circuit means the service is down for everyone;
                    // retrying here would only burn the backoff budget.
                    if matches!(err, ServiceError::CircuitOpen { .. }) {
                        self.record_failure().await;
                        return Err(err);
                    }
                    if attempt < self.http_config.max_retries && self.should_retry(&err) {
                        let delay = INITIAL_BACKOFF * 2u32.pow(attempt);
                        tracing::warn!(
                            service = %self.service,
                            attempt = attempt + 1,
                            delay_ms = delay.as_millis() as u64,
                            error = %err,
                            "Request failed, retrying"
                        );
                        {
                            let mut metrics = self.metrics.lock().await;
                            metrics.retries += 1;
                        }
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    if !raise_for_status {
                        if let ServiceError::Status { status, ref body, .. } = err {
                            self.record_failure().await;
                            return Ok(ApiResponse {
                                status,
                                body: body.clone(),
                            });
                        }
                    }
                    self.record_failure().await;
                    return Err(err);
                }
            }
        }
    }

    /// One attempt: send and map the outcome to `ServiceError`.
    async fn send_once(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<ApiResponse, ServiceError> {
        let mut builder = self.client.request(method, url);
        if let Some(json) = body {
            builder = builder.json(json);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ServiceError::Timeout {
                    service: self.service.clone(),
                    timeout: Duration::from_secs(self.http_config.request_timeout_secs),
                }
            } else {
                ServiceError::Network {
                    service: self.service.clone(),
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| ServiceError::Network {
            service: self.service.clone(),
            message: format!("reading body: {e}"),
        })?;

        if status.is_success() {
            Ok(ApiResponse {
                status: status.as_u16(),
                body,
            })
        } else {
            Err(ServiceError::Status {
                service: self.service.clone(),
                status: status.as_u16(),
                body,
            })
        }
    }

    fn should_retry(&self, err: &ServiceError) -> bool {
        match err {
            ServiceError::Status { status, .. } => self.http_config.retry_statuses.contains(status),
            ServiceError::Timeout { .. } | ServiceError::Network { .. } => true,
            _ => false,
        }
    }

    async fn record_failure(&self) {
        let mut metrics = self.metrics.lock().await;
        metrics.failures += 1;
    }

    fn join(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Probe the service with a single GET; true on any response < 500.
    pub async fn check_health(&self, path: &str) -> bool {
        let url = self.join(path);
        match self.client.get(&url).send().await {
            Ok(response) => response.status() < StatusCode::INTERNAL_SERVER_ERROR,
            Err(_) => false,
        }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub async fn stats(&self) -> PoolStats {
        PoolStats {
            service: self.service.clone(),
            base_url: self.base_url.clone(),
            metrics: *self.metrics.lock().await,
            circuit: self.breaker.stats().await,
        }
    }
}

impl std::fmt::Debug for ApiConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConnectionPool")
            .field("service", &self.service)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Registry of pools keyed by base URL.
///
/// Owned by the application wiring and passed to whoever needs a pool;
/// nothing here is process-global.
#[derive(Debug, Default)]
pub struct PoolRegistry {
    pools: RwLock<HashMap<String, Arc<ApiConnectionPool>>>,
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the pool for `base_url`, creating it on first use.
    pub async fn get_or_create(
        &self,
        service: &str,
        base_url: &str,
        default_headers: HeaderMap,
        http_config: &HttpConfig,
        circuit_config: &CircuitConfig,
    ) -> Result<Arc<ApiConnectionPool>, ServiceError> {
        {
            let pools = self.pools.read().await;
            if let Some(pool) = pools.get(base_url) {
                return Ok(Arc::clone(pool));
            }
        }

        let mut pools = self.pools.write().await;
        // A concurrent caller may have won the race for the write lock.
        if let Some(pool) = pools.get(base_url) {
            return Ok(Arc::clone(pool));
        }
        let pool = Arc::new(ApiConnectionPool::new(
            service,
            base_url,
            default_headers,
            http_config.clone(),
            circuit_config,
        )?);
        pools.insert(base_url.to_string(), Arc::clone(&pool));
        tracing::debug!(service, base_url, "Created connection pool");
        Ok(pool)
    }

    /// Drop all pools. Outstanding `Arc` handles keep working until released.
    pub async fn close_all(&self) {
        let mut pools = self.pools.write().await;
        let count = pools.len();
        pools.clear();
        tracing::info!(count, "Closed all connection pools");
    }

    /// Stats for every registered pool.
    pub async fn stats(&self) -> Vec<PoolStats> {
        let pools: Vec<Arc<ApiConnectionPool>> =
            self.pools.read().await.values().cloned().collect();
        let mut stats = Vec::with_capacity(pools.len());
        for pool in pools {
            stats.push(pool.stats().await);
        }
        stats.sort_by(|a, b| a.service.cmp(&b.service));
        stats
    }
}
