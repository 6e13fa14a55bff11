//! Circuit breaker for failure detection and recovery.
//!
//! Wraps one external service's async calls, detects repeated failures, and
//! fails fast while the service is down instead of piling on requests.
//!
//! ```text
//! Closed --(failure_threshold consecutive failures)--> Open
//! Open --(recovery_timeout elapsed, next call)--> HalfOpen
//! HalfOpen --(failure_threshold consecutive successes)--> Closed
//! HalfOpen --(any failure)--> Open
//! ```

use std::collections::VecDeque;
use std::future::Future;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;

use super::error::ServiceError;

/// Configuration for a circuit breaker.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before opening the circuit. The same count of
    /// consecutive half-open successes closes it again.
    pub failure_threshold: u32,
    /// How long the circuit stays open before the next call probes.
    pub recovery_timeout: Duration,
    /// Maximum concurrent probe calls while half-open.
    pub half_open_max_calls: u32,
    /// Per-call timeout; an elapsed timeout counts as a failure.
    pub call_timeout: Duration,
    /// HTTP statuses that re-raise without counting as failures
    /// (caller mistakes, not service outages).
    pub excluded_statuses: Vec<u16>,
    /// How many state-change records to retain.
    pub history_size: usize,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            half_open_max_calls: 1,
            call_timeout: Duration::from_secs(30),
            excluded_statuses: vec![400, 401, 403, 404, 409],
            history_size: 20,
        }
    }
}

impl From<&crate::domain::models::CircuitConfig> for CircuitBreakerConfig {
    fn from(cfg: &crate::domain::models::CircuitConfig) -> Self {
        Self {
            failure_threshold: cfg.failure_threshold,
            recovery_timeout: Duration::from_secs(cfg.recovery_timeout_secs),
            half_open_max_calls: cfg.half_open_max_calls,
            call_timeout: Duration::from_secs(cfg.call_timeout_secs),
            excluded_statuses: cfg.excluded_statuses.clone(),
            history_size: 20,
        }
    }
}

/// State of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Requests flow normally.
    Closed,
    /// Requests fail fast.
    Open,
    /// Limited probe requests test recovery.
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

/// Record of one state change.
#[derive(Debug, Clone, Serialize)]
pub struct StateChange {
    pub from: CircuitState,
    pub to: CircuitState,
    pub at: DateTime<Utc>,
    pub reason: String,
}

/// Cumulative call counters.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct BreakerMetrics {
    pub total_calls: u64,
    pub successes: u64,
    pub failures: u64,
    /// Calls rejected without invoking the wrapped future.
    pub rejected: u64,
    pub timeouts: u64,
}

/// Stats snapshot for display.
#[derive(Debug, Clone, Serialize)]
pub struct CircuitStats {
    pub service: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub metrics: BreakerMetrics,
    pub recent_changes: Vec<StateChange>,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    last_failure_at: Option<Instant>,
    half_open_in_flight: u32,
    metrics: BreakerMetrics,
    changes: VecDeque<StateChange>,
}

impl BreakerInner {
    fn transition(&mut self, to: CircuitState, reason: impl Into<String>, history_size: usize) {
        let change = StateChange {
            from: self.state,
            to,
            at: Utc::now(),
            reason: reason.into(),
        };
        self.changes.push_back(change);
        while self.changes.len() > history_size {
            self.changes.pop_front();
        }
        self.state = to;
    }
}

/// Circuit breaker guarding one external service.
#[derive(Debug)]
pub struct CircuitBreaker {
    service: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(service: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            service: service.into(),
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
                last_failure_at: None,
                half_open_in_flight: 0,
                metrics: BreakerMetrics::default(),
                changes: VecDeque::new(),
            }),
        }
    }

    /// Run `f` under the breaker and the configured per-call timeout.
    ///
    /// While OPEN (before `recovery_timeout` elapses), the future is never
    /// constructed-polled: the call fails immediately with
    /// [`ServiceError::CircuitOpen`] carrying the remaining cool-down.
    pub async fn execute<T, F, Fut>(&self, f: F) -> Result<T, ServiceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        self.admit().await?;

        let outcome = tokio::time::timeout(self.config.call_timeout, f()).await;
        match outcome {
            Ok(Ok(value)) => {
                self.on_success().await;
                Ok(value)
            }
            Ok(Err(err)) => {
                if self.is_excluded(&err) {
                    // Not a service outage; re-raise without counting.
                    self.on_excluded().await;
                    return Err(err);
                }
                self.on_failure(&err.to_string()).await;
                Err(err)
            }
            Err(_elapsed) => {
                let err = ServiceError::Timeout {
                    service: self.service.clone(),
                    timeout: self.config.call_timeout,
                };
                self.on_timeout().await;
                Err(err)
            }
        }
    }

    /// Gatekeeping: decide whether this call may proceed.
    async fn admit(&self) -> Result<(), ServiceError> {
        let mut inner = self.inner.lock().await;
        inner.metrics.total_calls += 1;

        match inner.state {
            CircuitState::Closed => Ok(()),
            CircuitState::Open => {
                let elapsed = inner
                    .last_failure_at
                    .map(|t| t.elapsed())
                    .unwrap_or(Duration::ZERO);
                if elapsed >= self.config.recovery_timeout {
                    inner.transition(
                        CircuitState::HalfOpen,
                        "recovery timeout elapsed, probing",
                        self.config.history_size,
                    );
                    inner.consecutive_successes = 0;
                    inner.half_open_in_flight = 1;
                    tracing::info!(service = %self.service, "Circuit half-open, probing");
                    Ok(())
                } else {
                    inner.metrics.rejected += 1;
                    Err(ServiceError::CircuitOpen {
                        service: self.service.clone(),
                        remaining: self.config.recovery_timeout - elapsed,
                    })
                }
            }
            CircuitState::HalfOpen => {
                if inner.half_open_in_flight >= self.config.half_open_max_calls {
                    inner.metrics.rejected += 1;
                    return Err(ServiceError::CircuitOpen {
                        service: self.service.clone(),
                        remaining: Duration::ZERO,
                    });
                }
                inner.half_open_in_flight += 1;
                Ok(())
            }
        }
    }

    fn is_excluded(&self, err: &ServiceError) -> bool {
        err.status()
            .is_some_and(|s| self.config.excluded_statuses.contains(&s))
    }

    async fn on_success(&self) {
        let mut inner = self.inner.lock().await;
        inner.metrics.successes += 1;
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures = 0;
            }
            CircuitState::HalfOpen => {
                inner.half_open_in_flight = inner.half_open_in_flight.saturating_sub(1);
                inner.consecutive_successes += 1;
                if inner.consecutive_successes >= self.config.failure_threshold {
                    inner.transition(
                        CircuitState::Closed,
                        "probe successes reached threshold",
                        self.config.history_size,
                    );
                    inner.consecutive_failures = 0;
                    inner.consecutive_successes = 0;
                    inner.last_failure_at = None;
                    tracing::info!(service = %self.service, "Circuit closed after recovery");
                }
            }
            CircuitState::Open => {}
        }
    }

    async fn on_excluded(&self) {
        let mut inner = self.inner.lock().await;
        if inner.state == CircuitState::HalfOpen {
            inner.half_open_in_flight = inner.half_open_in_flight.saturating_sub(1);
        }
    }

    async fn on_timeout(&self) {
        {
            let mut inner = self.inner.lock().await;
            inner.metrics.timeouts += 1;
        }
        self.on_failure("call timeout").await;
    }

    async fn on_failure(&self, reason: &str) {
        let mut inner = self.inner.lock().await;
        inner.metrics.failures += 1;
        inner.last_failure_at = Some(Instant::now());
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold {
                    inner.transition(
                        CircuitState::Open,
                        format!("failure threshold reached: {reason}"),
                        self.config.history_size,
                    );
                    tracing::warn!(
                        service = %self.service,
                        failures = inner.consecutive_failures,
                        "Circuit opened"
                    );
                }
            }
            CircuitState::HalfOpen => {
                // Any probe failure reopens immediately.
                inner.half_open_in_flight = 0;
                inner.consecutive_successes = 0;
                inner.transition(
                    CircuitState::Open,
                    format!("probe failed: {reason}"),
                    self.config.history_size,
                );
                tracing::warn!(service = %self.service, "Circuit reopened after failed probe");
            }
            CircuitState::Open => {}
        }
    }

    /// Current state (test and display hook).
    pub async fn state(&self) -> CircuitState {
        self.inner.lock().await.state
    }

    /// Snapshot of counters and recent state changes.
    pub async fn stats(&self) -> CircuitStats {
        let inner = self.inner.lock().await;
        CircuitStats {
            service: self.service.clone(),
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            metrics: inner.metrics,
            recent_changes: inner.changes.iter().cloned().collect(),
        }
    }

    /// Manually reset to closed (operator action).
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        if inner.state != CircuitState::Closed {
            inner.transition(CircuitState::Closed, "manual reset", self.config.history_size);
        }
        inner.consecutive_failures = 0;
        inner.consecutive_successes = 0;
        inner.half_open_in_flight = 0;
        inner.last_failure_at = None;
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(threshold: u32, recovery_secs: u64) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: threshold,
            recovery_timeout: Duration::from_secs(recovery_secs),
            half_open_max_calls: 1,
            call_timeout: Duration::from_secs(5),
            excluded_statuses: vec![404],
            history_size: 10,
        }
    }

    fn status_err(status: u16) -> ServiceError {
        ServiceError::Status {
            service: "test".to_string(),
            status,
            body: String::new(),
        }
    }

    async fn fail(breaker: &CircuitBreaker, status: u16) {
        let _ = breaker
            .execute(|| async move { Err::<(), _>(status_err(status)) })
            .await;
    }

    #[tokio::test]
    async fn test_opens_after_threshold_failures() {
        let breaker = CircuitBreaker::new("test", config(3, 30));

        fail(&breaker, 500).await;
        fail(&breaker, 500).await;
        assert_eq!(breaker.state().await, CircuitState::Closed);

        fail(&breaker, 500).await;
        assert_eq!(breaker.state().await, CircuitState::Open);
    }

    #[tokio::test]
    async fn test_open_rejects_without_invoking() {
        let breaker = CircuitBreaker::new("test", config(1, 30));
        fail(&breaker, 503).await;
        assert_eq!(breaker.state().await, CircuitState::Open);

        let invoked = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = invoked.clone();
        let result = breaker
            .execute(|| async move {
                flag.store(true, std::sync::atomic::Ordering::SeqCst);
                Ok::<_, ServiceError>(())
            })
            .await;

        assert!(!invoked.load(std::sync::atomic::Ordering::SeqCst));
        let remaining = result.unwrap_err().remaining().unwrap();
        assert!(remaining.as_secs() >= 28, "remaining was {remaining:?}");
        assert!(remaining.as_secs() <= 30);
    }

    #[tokio::test]
    async fn test_success_resets_closed_failure_count() {
        let breaker = CircuitBreaker::new("test", config(3, 30));
        fail(&breaker, 500).await;
        fail(&breaker, 500).await;
        let _ = breaker.execute(|| async { Ok::<_, ServiceError>(1) }).await;
        // Two more failures should not open (count reset by success).
        fail(&breaker, 500).await;
        fail(&breaker, 500).await;
        assert_eq!(breaker.state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_half_open_recovery_cycle() {
        let breaker = CircuitBreaker::new(
            "test",
            CircuitBreakerConfig {
                recovery_timeout: Duration::from_millis(10),
                ..config(2, 0)
            },
        );
        fail(&breaker, 500).await;
        fail(&breaker, 500).await;
        assert_eq!(breaker.state().await, CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(20)).await;

        // First probe succeeds: still half-open (threshold is 2).
        breaker
            .execute(|| async { Ok::<_, ServiceError>(()) })
            .await
            .unwrap();
        assert_eq!(breaker.state().await, CircuitState::HalfOpen);

        // Second consecutive success closes the circuit and resets counters.
        breaker
            .execute(|| async { Ok::<_, ServiceError>(()) })
            .await
            .unwrap();
        assert_eq!(breaker.state().await, CircuitState::Closed);
        assert_eq!(breaker.stats().await.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn test_half_open_caps_concurrent_probes() {
        let breaker = std::sync::Arc::new(CircuitBreaker::new(
            "test",
            CircuitBreakerConfig {
                recovery_timeout: Duration::from_millis(10),
                ..config(1, 0)
            },
        ));
        fail(&breaker, 500).await;
        assert_eq!(breaker.state().await, CircuitState::Open);
        tokio::time::sleep(Duration::from_millis(20)).await;

        // First probe parks inside its future until released.
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let (started_tx, started_rx) = tokio::sync::oneshot::channel::<()>();
        let probe = tokio::spawn({
            let breaker = breaker.clone();
            async move {
                breaker
                    .execute(|| async move {
                        let _ = started_tx.send(());
                        let _ = release_rx.await;
                        Ok::<_, ServiceError>(())
                    })
                    .await
            }
        });
        started_rx.await.unwrap();
        assert_eq!(breaker.state().await, CircuitState::HalfOpen);

        // A second call while the probe budget is spent is rejected
        // without its future ever running.
        let invoked = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = invoked.clone();
        let err = breaker
            .execute(|| async move {
                flag.store(true, std::sync::atomic::Ordering::SeqCst);
                Ok::<_, ServiceError>(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::CircuitOpen { .. }));
        assert!(!invoked.load(std::sync::atomic::Ordering::SeqCst));
        assert_eq!(breaker.stats().await.metrics.rejected, 1);

        // Releasing the probe frees the slot; with threshold 1 its success
        // closes the circuit and the next call goes through.
        release_tx.send(()).unwrap();
        probe.await.unwrap().unwrap();
        assert_eq!(breaker.state().await, CircuitState::Closed);
        breaker
            .execute(|| async { Ok::<_, ServiceError>(()) })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_half_open_failure_reopens() {
        let breaker = CircuitBreaker::new(
            "test",
            CircuitBreakerConfig {
                recovery_timeout: Duration::from_millis(10),
                ..config(2, 0)
            },
        );
        fail(&breaker, 500).await;
        fail(&breaker, 500).await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        fail(&breaker, 500).await; // probe fails
        assert_eq!(breaker.state().await, CircuitState::Open);
    }

    #[tokio::test]
    async fn test_excluded_status_does_not_count() {
        let breaker = CircuitBreaker::new("test", config(2, 30));
        for _ in 0..5 {
            fail(&breaker, 404).await;
        }
        assert_eq!(breaker.state().await, CircuitState::Closed);
        // The errors are still surfaced to the caller.
        let err = breaker
            .execute(|| async { Err::<(), _>(status_err(404)) })
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_call_timeout_counts_as_failure() {
        let breaker = CircuitBreaker::new(
            "test",
            CircuitBreakerConfig {
                call_timeout: Duration::from_millis(10),
                ..config(1, 30)
            },
        );
        let result = breaker
            .execute(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, ServiceError>(())
            })
            .await;
        assert!(matches!(result, Err(ServiceError::Timeout { .. })));
        assert_eq!(breaker.state().await, CircuitState::Open);
        assert_eq!(breaker.stats().await.metrics.timeouts, 1);
    }

    #[tokio::test]
    async fn test_metrics_and_state_changes() {
        let breaker = CircuitBreaker::new("test", config(1, 30));
        let _ = breaker.execute(|| async { Ok::<_, ServiceError>(()) }).await;
        fail(&breaker, 500).await;
        fail(&breaker, 500).await; // rejected, circuit open

        let stats = breaker.stats().await;
        assert_eq!(stats.metrics.total_calls, 3);
        assert_eq!(stats.metrics.successes, 1);
        assert_eq!(stats.metrics.failures, 1);
        assert_eq!(stats.metrics.rejected, 1);
        assert_eq!(stats.recent_changes.len(), 1);
        assert_eq!(stats.recent_changes[0].to, CircuitState::Open);
    }

    #[tokio::test]
    async fn test_manual_reset() {
        let breaker = CircuitBreaker::new("test", config(1, 300));
        fail(&breaker, 500).await;
        assert_eq!(breaker.state().await, CircuitState::Open);
        breaker.reset().await;
        assert_eq!(breaker.state().await, CircuitState::Closed);
        breaker
            .execute(|| async { Ok::<_, ServiceError>(()) })
            .await
            .unwrap();
    }
}
